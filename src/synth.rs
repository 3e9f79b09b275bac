// src/synth.rs
//
// A synthetic time series built from one cell: handy for trying the whole
// pipeline without real simulation output.

use crate::error::{CifMovieError, Result};
use crate::io::cif;
use crate::model::elements::MAX_ATOMIC_NUMBER;
use crate::model::{AtomicStructure, FrameSequence};
use log::info;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

const MORPHING_ATOM: usize = 74;
const SPINNING_ATOM: usize = 2;
const SPIN_RADIUS: f64 = 0.5;
const SPIN_PERIOD: f64 = 200.0;
const STRAIN: f64 = 0.3;

/// Cubic SrTiO3, a = 3.905 A.
pub fn perovskite() -> Result<AtomicStructure> {
    let a = 3.905;
    let h = a / 2.0;
    let positions = vec![
        [0.0, 0.0, 0.0], // Sr
        [h, h, h],       // Ti
        [h, h, 0.0],     // O
        [h, 0.0, h],
        [0.0, h, h],
    ];
    let cell = [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]];
    AtomicStructure::new(positions, vec![38, 22, 8, 8, 8], cell)
}

/// `frames` copies of `base` repeated 3x3x3, deformed a little more each frame.
pub fn generate(base: &AtomicStructure, frames: usize) -> Result<FrameSequence> {
    let template = base.repeat(3, 3, 3)?;
    let a_length = template.cell()[0][0];
    let x_positions: Vec<f64> = template.positions().iter().map(|p| p[0]).collect();

    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        let mut atoms = template.clone();
        let phase = i as f64 / frames as f64 * 2.0 * PI;
        let stretch = 1.0 + STRAIN * phase.sin();

        // One atom walks through the periodic table
        if MORPHING_ATOM < atoms.len() {
            let z = (1 + i / 4).min(MAX_ATOMIC_NUMBER as usize) as u8;
            atoms.set_number(MORPHING_ATOM, z)?;
        }

        atoms.cell_mut()[0][0] = a_length * stretch;
        for (p, x0) in atoms.positions_mut().iter_mut().zip(&x_positions) {
            p[0] = x0 * stretch;
        }

        // And one spins around its home site
        if let Some(p) = atoms.positions_mut().get_mut(SPINNING_ATOM) {
            let (dy, dx) = (i as f64 / SPIN_PERIOD * 2.0 * PI).sin_cos();
            p[0] += SPIN_RADIUS * dx;
            p[1] += SPIN_RADIUS * dy;
        }

        out.push(atoms);
    }
    Ok(out)
}

/// Writes `{prefix}{i:03}.cif` for every frame into `dir`.
pub fn write_dataset(dir: &Path, prefix: &str, frames: &[AtomicStructure]) -> Result<Vec<PathBuf>> {
    if frames.is_empty() {
        return Err(CifMovieError::malformed("no frames to write"));
    }
    fs::create_dir_all(dir).map_err(|e| CifMovieError::io(dir, e))?;

    let mut paths = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("{}{:03}.cif", prefix, i));
        cif::write(&path, frame)?;
        paths.push(path);
    }
    info!("wrote {} structures to {}", paths.len(), dir.display());
    Ok(paths)
}
