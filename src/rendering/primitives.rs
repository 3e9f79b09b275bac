// src/rendering/primitives.rs

use super::scene::RenderAtom;
use crate::error::Result;
use cairo::{Context, RadialGradient};
use std::f64::consts::PI;

/// Shaded disc standing in for a sphere lit from the top left.
pub fn draw_sphere(cr: &Context, atom: &RenderAtom) -> Result<()> {
  let [x, y, _] = atom.screen_pos;
  let radius = atom.radius;
  if radius <= 0.0 {
    return Ok(());
  }
  let (r, g, b) = atom.color;
  let a = atom.alpha;

  // Inner circle (highlight) offset to the top left, outer circle is the body
  let gradient = RadialGradient::new(
    x - radius * 0.3,
    y - radius * 0.3,
    radius * 0.1,
    x,
    y,
    radius,
  );

  // Highlight -> lighter base -> shadow
  gradient.add_color_stop_rgba(0.0, 1.0, 1.0, 1.0, a);
  gradient.add_color_stop_rgba(
    0.2,
    (r + 0.2).min(1.0),
    (g + 0.2).min(1.0),
    (b + 0.2).min(1.0),
    a,
  );
  gradient.add_color_stop_rgba(1.0, r * 0.6, g * 0.6, b * 0.6, a);

  cr.set_source(&gradient)?;
  cr.new_path();
  cr.arc(x, y, radius, 0.0, 2.0 * PI);
  cr.fill()?;

  // Thin outline keeps touching spheres apart
  cr.set_source_rgba(0.0, 0.0, 0.0, 0.3 * a);
  cr.set_line_width(radius * 0.05);
  cr.arc(x, y, radius, 0.0, 2.0 * PI);
  cr.stroke()?;
  Ok(())
}

pub fn draw_atoms(cr: &Context, atoms: &[RenderAtom]) -> Result<()> {
  for atom in atoms {
    draw_sphere(cr, atom)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use cairo::{Format, ImageSurface};

  fn pixel(surface: &mut ImageSurface, x: usize, y: usize) -> [u8; 4] {
    let stride = surface.stride() as usize;
    let data = surface.data().unwrap();
    let i = y * stride + x * 4;
    [data[i], data[i + 1], data[i + 2], data[i + 3]]
  }

  #[test]
  fn sphere_covers_its_centre_only() {
    let mut surface = ImageSurface::create(Format::ARgb32, 40, 40).unwrap();
    {
      let cr = Context::new(&surface).unwrap();
      let atom = RenderAtom {
        screen_pos: [20.0, 20.0, 0.0],
        radius: 8.0,
        color: (1.0, 0.0, 0.0),
        alpha: 1.0,
        original_index: 0,
      };
      draw_sphere(&cr, &atom).unwrap();
    }
    surface.flush();

    // Opaque and reddish at the lower right of the centre, untouched in the corner
    let inside = pixel(&mut surface, 23, 23);
    assert_eq!(inside[3], 255);
    assert!(inside[2] > inside[1]); // BGRA: red channel above green
    assert_eq!(pixel(&mut surface, 1, 1)[3], 0);
  }

  #[test]
  fn zero_radius_draws_nothing() {
    let mut surface = ImageSurface::create(Format::ARgb32, 8, 8).unwrap();
    {
      let cr = Context::new(&surface).unwrap();
      let atom = RenderAtom {
        screen_pos: [4.0, 4.0, 0.0],
        radius: 0.0,
        color: (0.0, 0.0, 1.0),
        alpha: 1.0,
        original_index: 0,
      };
      draw_sphere(&cr, &atom).unwrap();
    }
    surface.flush();
    assert_eq!(pixel(&mut surface, 4, 4)[3], 0);
  }
}
