use crate::error::{CifMovieError, Result};
use crate::model::elements;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lattice vectors as rows: [a_vec, b_vec, c_vec]
pub type Cell = [[f64; 3]; 3];

/// One parsed structure: Cartesian positions (Angstrom) and the atomic number
/// of each site. `positions` and `numbers` always have the same length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomicStructure {
    positions: Vec<[f64; 3]>,
    numbers: Vec<u8>,
    cell: Cell,
}

/// Structures in playback order; index = frame number.
pub type FrameSequence = Vec<AtomicStructure>;

impl AtomicStructure {
    pub fn new(positions: Vec<[f64; 3]>, numbers: Vec<u8>, cell: Cell) -> Result<Self> {
        if positions.len() != numbers.len() {
            return Err(CifMovieError::malformed(format!(
                "{} positions but {} atomic numbers",
                positions.len(),
                numbers.len()
            )));
        }
        Ok(Self {
            positions,
            numbers,
            cell,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.positions
    }

    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn set_number(&mut self, index: usize, number: u8) -> Result<()> {
        let slot = self.numbers.get_mut(index).ok_or_else(|| {
            CifMovieError::malformed(format!("atom index {} out of range", index))
        })?;
        *slot = number;
        Ok(())
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn cell_mut(&mut self) -> &mut Cell {
        &mut self.cell
    }

    /// Axis-aligned bounding box as (min, max), `None` for an empty structure.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.positions.first()?;
        let (mut min, mut max) = (first, first);
        for p in &self.positions[1..] {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some((min, max))
    }

    /// Midpoint of the bounding box.
    pub fn center(&self) -> Option<[f64; 3]> {
        self.bounds().map(|(min, max)| {
            [
                (min[0] + max[0]) / 2.0,
                (min[1] + max[1]) / 2.0,
                (min[2] + max[2]) / 2.0,
            ]
        })
    }

    /// Translates every atom so the bounding-box midpoint sits at the origin.
    /// Returns the translation that was subtracted.
    pub fn recenter(&mut self) -> [f64; 3] {
        let Some(c) = self.center() else {
            return [0.0; 3];
        };
        for p in &mut self.positions {
            p[0] -= c[0];
            p[1] -= c[1];
            p[2] -= c[2];
        }
        c
    }

    /// Tiles the cell `nx * ny * nz` times along its lattice vectors.
    pub fn repeat(&self, nx: u32, ny: u32, nz: u32) -> Result<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(CifMovieError::malformed(format!(
                "repeat counts must be positive, got {}x{}x{}",
                nx, ny, nz
            )));
        }

        let [vec_a, vec_b, vec_c] = self.cell;
        let copies = (nx * ny * nz) as usize;
        let mut positions = Vec::with_capacity(self.len() * copies);
        let mut numbers = Vec::with_capacity(self.len() * copies);

        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let (fx, fy, fz) = (x as f64, y as f64, z as f64);
                    let translation = [
                        vec_a[0] * fx + vec_b[0] * fy + vec_c[0] * fz,
                        vec_a[1] * fx + vec_b[1] * fy + vec_c[1] * fz,
                        vec_a[2] * fx + vec_b[2] * fy + vec_c[2] * fz,
                    ];
                    for (p, &n) in self.positions.iter().zip(&self.numbers) {
                        positions.push([
                            p[0] + translation[0],
                            p[1] + translation[1],
                            p[2] + translation[2],
                        ]);
                        numbers.push(n);
                    }
                }
            }
        }

        let scale = |v: [f64; 3], n: u32| [v[0] * n as f64, v[1] * n as f64, v[2] * n as f64];
        Ok(Self {
            positions,
            numbers,
            cell: [scale(vec_a, nx), scale(vec_b, ny), scale(vec_c, nz)],
        })
    }

    /// Element counts in alphabetical order, e.g. "O3 Sr1 Ti1".
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &n in &self.numbers {
            *counts.entry(elements::symbol(n).unwrap_or("?")).or_insert(0) += 1;
        }
        counts
            .iter()
            .map(|(el, count)| format!("{}{}", el, count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(a: f64) -> Cell {
        [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]
    }

    fn sample() -> AtomicStructure {
        AtomicStructure::new(
            vec![[1.0, 2.0, 3.0], [5.0, 2.0, -1.0], [3.0, 8.0, 1.0]],
            vec![38, 22, 8],
            cubic(10.0),
        )
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = AtomicStructure::new(vec![[0.0; 3]; 2], vec![1], cubic(1.0)).unwrap_err();
        assert!(matches!(err, CifMovieError::MalformedInput(_)));
    }

    #[test]
    fn center_is_bounding_box_midpoint() {
        assert_eq!(sample().center(), Some([3.0, 5.0, 1.0]));
    }

    #[test]
    fn recenter_moves_midpoint_to_origin() {
        let mut s = sample();
        let shift = s.recenter();
        assert_eq!(shift, [3.0, 5.0, 1.0]);
        assert_eq!(s.positions()[0], [-2.0, -3.0, 2.0]);
        let c = s.center().unwrap();
        assert!(c.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn recenter_is_idempotent() {
        let mut once = sample();
        once.recenter();
        let mut twice = once.clone();
        twice.recenter();
        for (a, b) in once.positions().iter().zip(twice.positions()) {
            for k in 0..3 {
                assert!((a[k] - b[k]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn recenter_on_empty_structure_is_a_no_op() {
        let mut s = AtomicStructure::new(vec![], vec![], cubic(1.0)).unwrap();
        assert_eq!(s.recenter(), [0.0; 3]);
        assert!(s.center().is_none());
    }

    #[test]
    fn repeat_tiles_atoms_and_scales_cell() {
        let s = AtomicStructure::new(vec![[0.5, 0.5, 0.5]], vec![26], cubic(2.0)).unwrap();
        let big = s.repeat(2, 3, 1).unwrap();
        assert_eq!(big.len(), 6);
        assert_eq!(big.cell()[0], [4.0, 0.0, 0.0]);
        assert_eq!(big.cell()[1], [0.0, 6.0, 0.0]);
        assert!(big.positions().contains(&[2.5, 4.5, 0.5]));
        assert!(s.repeat(0, 1, 1).is_err());
    }

    #[test]
    fn formula_counts_elements() {
        let s = sample().repeat(1, 1, 2).unwrap();
        assert_eq!(s.formula(), "O2 Sr2 Ti2");
    }

    #[test]
    fn set_number_checks_bounds() {
        let mut s = sample();
        s.set_number(1, 26).unwrap();
        assert_eq!(s.numbers()[1], 26);
        assert!(s.set_number(3, 1).is_err());
    }
}
