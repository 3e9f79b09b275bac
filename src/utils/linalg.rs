// src/utils/linalg.rs

use crate::model::Cell;
use nalgebra::{Matrix3, Vector3};

fn row_matrix(lattice: &Cell) -> Matrix3<f64> {
  Matrix3::from_row_slice(&[
    lattice[0][0],
    lattice[0][1],
    lattice[0][2],
    lattice[1][0],
    lattice[1][1],
    lattice[1][2],
    lattice[2][0],
    lattice[2][1],
    lattice[2][2],
  ])
}

/// Convert fractional coordinates to Cartesian using lattice matrix
///
/// # Arguments
/// * `frac` - Fractional coordinates [x, y, z]
/// * `lattice` - Lattice vectors as row matrix [[ax, ay, az], [bx, by, bz], [cx, cy, cz]]
///
/// # Formula
/// ```text
/// Cartesian = Lattice^T × Fractional
/// ```
pub fn frac_to_cart(frac: [f64; 3], lattice: &Cell) -> [f64; 3] {
  let cart_vec = row_matrix(lattice).transpose() * Vector3::from(frac);
  [cart_vec.x, cart_vec.y, cart_vec.z]
}

/// Convert Cartesian coordinates to fractional using lattice matrix
///
/// Returns `None` if the lattice is singular (e.g. the zero cell of a
/// plain XYZ file).
///
/// # Formula
/// ```text
/// Fractional = (Lattice^T)^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: [f64; 3], lattice: &Cell) -> Option<[f64; 3]> {
  if is_degenerate(lattice) {
    return None;
  }
  let inv_lat = row_matrix(lattice).transpose().try_inverse()?;
  let frac_vec = inv_lat * Vector3::from(cart);
  Some([frac_vec.x, frac_vec.y, frac_vec.z])
}

/// Cell volume (signed), in cubic Angstroms.
pub fn volume(lattice: &Cell) -> f64 {
  row_matrix(lattice).determinant()
}

pub fn is_degenerate(lattice: &Cell) -> bool {
  volume(lattice).abs() < 1e-8
}

/// Builds lattice vectors from (a, b, c, alpha, beta, gamma), angles in degrees.
/// `a` lies along x and `b` in the xy plane.
pub fn lattice_from_parameters(lengths: [f64; 3], angles_deg: [f64; 3]) -> Cell {
  let [a, b, c] = lengths;
  let [alpha, beta, gamma] = angles_deg.map(f64::to_radians);
  let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
  let sg = gamma.sin();
  let v = (1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg).max(0.0).sqrt();

  [
    [a, 0.0, 0.0],
    [b * cg, b * sg, 0.0],
    [c * cb, c * (ca - cb * cg) / sg, c * v / sg],
  ]
}

/// Inverse of [`lattice_from_parameters`]: ([a, b, c], [alpha, beta, gamma]).
pub fn lattice_parameters(lattice: &Cell) -> ([f64; 3], [f64; 3]) {
  let [va, vb, vc] = lattice.map(Vector3::from);
  let (a, b, c) = (va.norm(), vb.norm(), vc.norm());
  let angle = |u: &Vector3<f64>, w: &Vector3<f64>, nu: f64, nw: f64| {
    (u.dot(w) / (nu * nw)).clamp(-1.0, 1.0).acos().to_degrees()
  };
  (
    [a, b, c],
    [angle(&vb, &vc, b, c), angle(&va, &vc, a, c), angle(&va, &vb, a, b)],
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cubic_lattice() {
    // Simple cubic lattice 5.0 Å
    let lattice = [[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]];

    let cart = frac_to_cart([0.5, 0.5, 0.5], &lattice);

    assert!((cart[0] - 2.5).abs() < 1e-10);
    assert!((cart[1] - 2.5).abs() < 1e-10);
    assert!((cart[2] - 2.5).abs() < 1e-10);
  }

  #[test]
  fn test_roundtrip() {
    // Non-orthogonal lattice
    let lattice = [[4.0, 0.0, 0.0], [2.0, 3.46, 0.0], [0.0, 0.0, 5.0]];

    let frac_orig = [0.333, 0.667, 0.25];
    let cart = frac_to_cart(frac_orig, &lattice);
    let frac_back = cart_to_frac(cart, &lattice).unwrap();

    assert!((frac_back[0] - frac_orig[0]).abs() < 1e-10);
    assert!((frac_back[1] - frac_orig[1]).abs() < 1e-10);
    assert!((frac_back[2] - frac_orig[2]).abs() < 1e-10);
  }

  #[test]
  fn test_singular_cell() {
    assert!(cart_to_frac([1.0, 2.0, 3.0], &[[0.0; 3]; 3]).is_none());
  }

  #[test]
  fn test_hexagonal_parameters() {
    let lattice = lattice_from_parameters([3.0, 3.0, 5.0], [90.0, 90.0, 120.0]);

    assert!((lattice[1][0] + 1.5).abs() < 1e-10);
    assert!((lattice[2][2] - 5.0).abs() < 1e-10);

    let (lengths, angles) = lattice_parameters(&lattice);
    assert!((lengths[1] - 3.0).abs() < 1e-10);
    assert!((angles[0] - 90.0).abs() < 1e-8);
    assert!((angles[2] - 120.0).abs() < 1e-8);
  }

  #[test]
  fn test_volume() {
    let lattice = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]];
    assert!((volume(&lattice) - 24.0).abs() < 1e-10);
  }
}
