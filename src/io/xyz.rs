use crate::error::{CifMovieError, Result};
use crate::model::{elements, get_atomic_number, AtomicStructure, Cell};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub fn parse(path: &Path) -> Result<AtomicStructure> {
    let text = fs::read_to_string(path).map_err(|e| CifMovieError::io(path, e))?;
    parse_str(&text)
}

/// Reads the first frame of an (extended) XYZ file.
pub fn parse_str(text: &str) -> Result<AtomicStructure> {
    let mut lines = text.lines();

    // 1. Number of Atoms
    let n_atoms_str = lines
        .next()
        .ok_or_else(|| CifMovieError::malformed("empty XYZ file"))?;
    let n_atoms: usize = n_atoms_str
        .trim()
        .parse()
        .map_err(|_| CifMovieError::malformed(format!("invalid atom count '{}'", n_atoms_str.trim())))?;
    if n_atoms == 0 {
        return Err(CifMovieError::malformed("XYZ file declares zero atoms"));
    }

    // 2. Comment Line (Try to find "Lattice=...")
    let comment = lines.next().unwrap_or("");
    let cell = parse_lattice(comment)?.unwrap_or([[0.0; 3]; 3]);

    // 3. Atoms; the declared count is checked against what is actually there
    let mut positions = Vec::new();
    let mut numbers = Vec::new();
    for line in lines.take(n_atoms) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(CifMovieError::malformed(format!("short atom line '{}'", line.trim())));
        }

        // Species may be a symbol or an atomic number
        let number = match parts[0].parse::<u8>() {
            Ok(z) if elements::element(z).is_some() => z,
            _ => get_atomic_number(parts[0]).ok_or_else(|| {
                CifMovieError::malformed(format!("unknown element '{}'", parts[0]))
            })?,
        };

        let mut p = [0.0; 3];
        for (slot, raw) in p.iter_mut().zip(&parts[1..4]) {
            *slot = raw
                .parse()
                .map_err(|_| CifMovieError::malformed(format!("invalid coordinate '{}'", raw)))?;
        }
        positions.push(p);
        numbers.push(number);
    }

    if positions.len() != n_atoms {
        return Err(CifMovieError::malformed(format!(
            "expected {} atoms, found {}",
            n_atoms,
            positions.len()
        )));
    }

    AtomicStructure::new(positions, numbers, cell)
}

// Format: Lattice="ax ay az bx by bz cx cy cz"
fn parse_lattice(comment: &str) -> Result<Option<Cell>> {
    let Some(start) = comment.find("Lattice=\"") else {
        return Ok(None);
    };
    let remainder = &comment[start + 9..];
    let end = remainder
        .find('"')
        .ok_or_else(|| CifMovieError::malformed("unterminated Lattice=\"...\""))?;

    let parts: Vec<f64> = remainder[..end]
        .split_whitespace()
        .map(|s| s.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| CifMovieError::malformed("non-numeric Lattice entry"))?;

    if parts.len() != 9 {
        return Err(CifMovieError::malformed(format!(
            "Lattice needs 9 numbers, got {}",
            parts.len()
        )));
    }
    Ok(Some([
        [parts[0], parts[1], parts[2]],
        [parts[3], parts[4], parts[5]],
        [parts[6], parts[7], parts[8]],
    ]))
}

pub fn write(path: &Path, structure: &AtomicStructure) -> Result<()> {
    fs::write(path, to_string(structure)?).map_err(|e| CifMovieError::io(path, e))
}

pub fn to_string(structure: &AtomicStructure) -> Result<String> {
    let mut out = String::new();
    let c = structure.cell();
    let _ = writeln!(out, "{}", structure.len());
    let _ = writeln!(
        out,
        "Lattice=\"{} {} {} {} {} {} {} {} {}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\"",
        c[0][0], c[0][1], c[0][2], c[1][0], c[1][1], c[1][2], c[2][0], c[2][1], c[2][2]
    );
    for (p, &n) in structure.positions().iter().zip(structure.numbers()) {
        let symbol = elements::symbol(n)
            .ok_or_else(|| CifMovieError::malformed(format!("unknown atomic number {}", n)))?;
        let _ = writeln!(out, "{:<2} {:14.8} {:14.8} {:14.8}", symbol, p[0], p[1], p[2]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_extended_header() {
        let text = "2\nLattice=\"4 0 0 0 4 0 0 0 4\" Properties=species:S:1:pos:R:3\nNa 0 0 0\n17 2 2 2\n";
        let s = parse_str(text).unwrap();
        assert_eq!(s.numbers(), &[11, 17]);
        assert_eq!(s.cell()[1], [0.0, 4.0, 0.0]);
        assert_eq!(s.positions()[1], [2.0, 2.0, 2.0]);
    }

    #[test]
    fn plain_xyz_has_zero_cell_and_reads_first_frame_only() {
        let text = "1\nwater-ish\nO 0.0 0.0 0.1\n1\nsecond frame\nH 9 9 9\n";
        let s = parse_str(text).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.cell(), &[[0.0; 3]; 3]);
    }

    #[test]
    fn reports_truncated_files() {
        let err = parse_str("3\n\nO 0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("expected 3 atoms, found 1"));
        assert!(parse_str("").is_err());
        assert!(parse_str("two\n\n").is_err());
    }

    #[test]
    fn absurd_atom_count_is_malformed() {
        let err = parse_str("1000000000000000000\n\nH 0 0 0\n").unwrap_err();
        assert!(matches!(err, CifMovieError::MalformedInput(_)));
        assert!(err.to_string().contains("found 1"));
        let too_big = format!("{}0\n\nH 0 0 0\n", usize::MAX);
        assert!(matches!(parse_str(&too_big), Err(CifMovieError::MalformedInput(_))));
    }

    #[test]
    fn written_file_keeps_lattice() {
        let s = parse_str("1\nLattice=\"1 0 0 0 2 0 0 0 3\"\nFe 0.5 1 1.5\n").unwrap();
        let back = parse_str(&to_string(&s).unwrap()).unwrap();
        assert_eq!(back, s);
    }
}
