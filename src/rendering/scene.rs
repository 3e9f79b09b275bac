// src/rendering/scene.rs

use crate::config::{Framing, RenderConfig};
use crate::error::{CifMovieError, Result};
use crate::model::{get_atom_properties, AtomicStructure, Rgb};
use crate::rotation::Orientation;

// Share of the shorter image side a fitted scene may cover
const FIT_MARGIN: f64 = 0.9;

// One drawable sphere, already in pixel space
#[derive(Debug, Clone, PartialEq)]
pub struct RenderAtom {
  pub screen_pos: [f64; 3], // x, y (pixels), z (depth, larger is nearer)
  pub radius: f64,          // pixels
  pub color: Rgb,
  pub alpha: f64,
  pub original_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBounds {
  pub scale: f64, // pixels per Angstrom
  pub width: f64,
  pub height: f64,
}

impl SceneBounds {
  /// `extent` is the largest recentred radius of the sequence, needed for
  /// `Framing::FitSequence` only.
  pub fn new(config: &RenderConfig, extent: Option<f64>) -> Self {
    let width = config.resolution.0 as f64;
    let height = config.resolution.1 as f64;

    let scale = match config.framing {
      Framing::Fixed { width: span } => width / span,
      Framing::FitSequence => {
        let extent = extent.unwrap_or(1.0).max(1e-6);
        width.min(height) * FIT_MARGIN / (2.0 * extent)
      }
    } * config.zoom;

    Self {
      scale,
      width,
      height,
    }
  }

  // World (Angstrom, y up) -> pixel (y down), origin at the image centre
  pub fn project(&self, p: [f64; 3]) -> [f64; 3] {
    [
      self.width / 2.0 + p[0] * self.scale,
      self.height / 2.0 - p[1] * self.scale,
      p[2],
    ]
  }
}

/// Largest distance from the bounding-box centre to a sphere surface over all
/// frames. Atoms with unknown atomic numbers are ignored here; they fail later
/// in [`check_frame`].
pub fn sequence_extent(frames: &[AtomicStructure], radius_scale: f64) -> f64 {
  let mut extent: f64 = 0.0;
  for frame in frames {
    let Some(c) = frame.center() else {
      continue;
    };
    for (p, &n) in frame.positions().iter().zip(frame.numbers()) {
      let Some((radius, _)) = get_atom_properties(n) else {
        continue;
      };
      let d = ((p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2) + (p[2] - c[2]).powi(2)).sqrt();
      extent = extent.max(d + radius * radius_scale);
    }
  }
  extent
}

/// Rejects structures that cannot be drawn, then recentres the rest in place.
/// A rejected structure is left untouched.
pub fn check_frame(structure: &mut AtomicStructure) -> Result<()> {
  if structure.is_empty() {
    return Err(CifMovieError::malformed("structure has no atoms"));
  }
  if let Some((i, n)) = structure
    .numbers()
    .iter()
    .enumerate()
    .find(|&(_, &n)| get_atom_properties(n).is_none())
  {
    return Err(CifMovieError::malformed(format!(
      "atom {} has unknown atomic number {}",
      i, n
    )));
  }
  structure.recenter();
  Ok(())
}

/// Atoms of an already checked structure, rotated, projected and sorted far
/// to near.
pub fn project_scene(
  structure: &AtomicStructure,
  orientation: &Orientation,
  bounds: &SceneBounds,
  radius_scale: f64,
) -> Result<Vec<RenderAtom>> {
  let mut render_atoms = Vec::with_capacity(structure.len());
  for (i, (&p, &n)) in structure
    .positions()
    .iter()
    .zip(structure.numbers())
    .enumerate()
  {
    let (radius, color) = get_atom_properties(n).ok_or_else(|| {
      CifMovieError::malformed(format!("atom {} has unknown atomic number {}", i, n))
    })?;

    render_atoms.push(RenderAtom {
      screen_pos: bounds.project(orientation.rotate(p)),
      radius: radius * radius_scale * bounds.scale,
      color,
      alpha: 1.0,
      original_index: i,
    });
  }

  // Painter's algorithm: farthest first
  render_atoms.sort_by(|a, b| a.screen_pos[2].total_cmp(&b.screen_pos[2]));
  Ok(render_atoms)
}

/// [`check_frame`] followed by [`project_scene`].
pub fn prepare_scene(
  structure: &mut AtomicStructure,
  orientation: &Orientation,
  bounds: &SceneBounds,
  radius_scale: f64,
) -> Result<Vec<RenderAtom>> {
  check_frame(structure)?;
  project_scene(structure, orientation, bounds, radius_scale)
}
