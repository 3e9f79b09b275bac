// src/io/poscar.rs

use crate::error::{CifMovieError, Result};
use crate::model::{get_atomic_number, AtomicStructure};
use crate::utils::linalg::{frac_to_cart, volume};
use std::fs;
use std::path::Path;

pub fn parse(path: &Path) -> Result<AtomicStructure> {
    let text = fs::read_to_string(path).map_err(|e| CifMovieError::io(path, e))?;
    parse_str(&text)
}

fn next_line<'a>(lines: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str> {
    lines
        .next()
        .ok_or_else(|| CifMovieError::malformed(format!("unexpected end of POSCAR: missing {}", what)))
}

fn floats(line: &str, n: usize, what: &str) -> Result<Vec<f64>> {
    let parts: Vec<f64> = line
        .split_whitespace()
        .take(n)
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| CifMovieError::malformed(format!("invalid {} line '{}'", what, line.trim())))?;
    if parts.len() < n {
        return Err(CifMovieError::malformed(format!("invalid {} line '{}'", what, line.trim())));
    }
    Ok(parts)
}

/// VASP POSCAR/CONTCAR. Element symbols come from line 6 (VASP 5) or, for
/// VASP 4 files, from the comment line.
pub fn parse_str(text: &str) -> Result<AtomicStructure> {
    let mut lines = text.lines();

    let comment = next_line(&mut lines, "comment")?;

    // Scale; a negative value is the target cell volume
    let scale = floats(next_line(&mut lines, "scale")?, 1, "scale")?[0];

    // Lattice
    let mut lattice = [[0.0; 3]; 3];
    for row in lattice.iter_mut() {
        let v = floats(next_line(&mut lines, "lattice")?, 3, "lattice")?;
        row.copy_from_slice(&v);
    }
    let factor = if scale < 0.0 {
        let v = volume(&lattice).abs();
        if v < 1e-12 {
            return Err(CifMovieError::malformed("degenerate POSCAR lattice"));
        }
        (-scale / v).cbrt()
    } else {
        scale
    };
    for row in lattice.iter_mut() {
        for x in row.iter_mut() {
            *x *= factor;
        }
    }

    // Elements & Counts
    let line6 = next_line(&mut lines, "element counts")?;
    let starts_alpha = line6
        .trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic());
    let (element_names, counts_line): (Vec<&str>, &str) = if starts_alpha {
        (line6.split_whitespace().collect(), next_line(&mut lines, "element counts")?)
    } else {
        (comment.split_whitespace().collect(), line6)
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| CifMovieError::malformed(format!("invalid counts line '{}'", counts_line.trim())))?;

    if element_names.len() < counts.len() {
        return Err(CifMovieError::malformed(
            "POSCAR does not name an element for every species",
        ));
    }
    let species: Vec<u8> = element_names[..counts.len()]
        .iter()
        .map(|name| {
            get_atomic_number(name)
                .ok_or_else(|| CifMovieError::malformed(format!("unknown element '{}'", name)))
        })
        .collect::<Result<_>>()?;

    // Mode, with optional Selective dynamics line first
    let mut mode_line = next_line(&mut lines, "coordinate mode")?.trim();
    if mode_line.starts_with(['s', 'S']) {
        mode_line = next_line(&mut lines, "coordinate mode")?.trim();
    }
    let is_direct = !mode_line.starts_with(['c', 'C', 'k', 'K']);

    // Atoms
    // Counts are checked against the atom lines actually present
    counts
        .iter()
        .try_fold(0usize, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| CifMovieError::malformed(format!("atom counts overflow '{}'", counts_line.trim())))?;
    let mut positions = Vec::new();
    let mut numbers = Vec::new();
    for (&number, &count) in species.iter().zip(&counts) {
        for _ in 0..count {
            let v = floats(next_line(&mut lines, "atom position")?, 3, "position")?;
            let p = [v[0], v[1], v[2]];
            positions.push(if is_direct {
                frac_to_cart(p, &lattice)
            } else {
                [p[0] * factor, p[1] * factor, p[2] * factor]
            });
            numbers.push(number);
        }
    }

    if positions.is_empty() {
        return Err(CifMovieError::malformed("POSCAR contains no atoms"));
    }
    AtomicStructure::new(positions, numbers, lattice)
}
