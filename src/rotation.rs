// src/rotation.rs

use crate::error::{CifMovieError, Result};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Orientation of one frame, a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation(UnitQuaternion<f64>);

impl Orientation {
    pub fn identity() -> Self {
        Self(UnitQuaternion::identity())
    }

    /// Scalar-last components (x, y, z, w); identity is (0, 0, 0, 1).
    pub fn as_xyzw(&self) -> [f64; 4] {
        let q = self.0.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    pub fn rotate(&self, p: [f64; 3]) -> [f64; 3] {
        let v = self.0 * Vector3::from(p);
        [v.x, v.y, v.z]
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<UnitQuaternion<f64>> for Orientation {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Self(q)
    }
}

/// One orientation for every frame, or one per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Orientations {
    Broadcast(Orientation),
    PerFrame(Vec<Orientation>),
}

impl Default for Orientations {
    fn default() -> Self {
        Self::Broadcast(Orientation::identity())
    }
}

impl Orientations {
    /// Expands to exactly `frames` orientations.
    pub fn for_frames(&self, frames: usize) -> Result<Vec<Orientation>> {
        match self {
            Self::Broadcast(o) => Ok(vec![*o; frames]),
            Self::PerFrame(list) if list.len() == frames => Ok(list.clone()),
            Self::PerFrame(list) => Err(CifMovieError::malformed(format!(
                "{} orientations for {} frames",
                list.len(),
                frames
            ))),
        }
    }

    pub fn frame_count(&self) -> Option<usize> {
        match self {
            Self::Broadcast(_) => None,
            Self::PerFrame(list) => Some(list.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> nalgebra::Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

/// Ordered principal axes. Lower case (`"zyx"`) rotates about the fixed
/// axes; upper case (`"ZYX"`) about the body axes as they move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSequence {
    pub axes: Vec<Axis>,
    pub intrinsic: bool,
}

impl FromStr for AxisSequence {
    type Err = CifMovieError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() > 3 {
            return Err(CifMovieError::malformed(format!(
                "axis sequence must have 1 to 3 axes, got '{}'",
                s
            )));
        }
        let intrinsic = s.chars().all(|c| c.is_ascii_uppercase());
        if !intrinsic && !s.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(CifMovieError::malformed(format!(
                "axis sequence '{}' mixes intrinsic and extrinsic axes",
                s
            )));
        }
        let axes = s
            .chars()
            .map(|c| match c.to_ascii_lowercase() {
                'x' => Ok(Axis::X),
                'y' => Ok(Axis::Y),
                'z' => Ok(Axis::Z),
                other => Err(CifMovieError::malformed(format!("unknown axis '{}'", other))),
            })
            .collect::<Result<_>>()?;
        Ok(Self { axes, intrinsic })
    }
}

/// Angles in degrees, either one value per axis or one series per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Angles {
    Uniform(Vec<f64>),
    PerFrame(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSpec {
    pub axes: String,
    pub angles: Angles,
}

impl Default for RotationSpec {
    fn default() -> Self {
        Self {
            axes: "z".to_string(),
            angles: Angles::Uniform(vec![0.0]),
        }
    }
}

/// Composes one orientation from per-axis angles.
pub trait RotationComposer {
    fn compose(&self, sequence: &AxisSequence, angles_deg: &[f64]) -> Orientation;
}

/// Right-handed Euler composition on nalgebra quaternions.
#[derive(Debug, Default, Clone, Copy)]
pub struct EulerComposer;

impl RotationComposer for EulerComposer {
    fn compose(&self, sequence: &AxisSequence, angles_deg: &[f64]) -> Orientation {
        let mut q = UnitQuaternion::identity();
        for (axis, angle) in sequence.axes.iter().zip(angles_deg) {
            let step = UnitQuaternion::from_axis_angle(&axis.unit(), angle.to_radians());
            // Body-axis rotations compose on the right, fixed-axis ones on the left
            q = if sequence.intrinsic { q * step } else { step * q };
        }
        q.renormalize_fast();
        Orientation(q)
    }
}

pub fn rotation_calc(spec: &RotationSpec) -> Result<Orientations> {
    rotation_calc_with(&EulerComposer, spec)
}

/// Accepts exactly three shapes: one axis with one angle (broadcast), one
/// axis with N angles, or k axes with k series of N angles each. k axes with
/// k scalar angles also broadcast.
pub fn rotation_calc_with<C: RotationComposer + ?Sized>(composer: &C, spec: &RotationSpec) -> Result<Orientations> {
    let sequence: AxisSequence = spec.axes.parse()?;
    let k = sequence.axes.len();

    match &spec.angles {
        Angles::Uniform(values) if k == 1 && values.len() > 1 => Ok(Orientations::PerFrame(
            values
                .iter()
                .map(|a| composer.compose(&sequence, std::slice::from_ref(a)))
                .collect(),
        )),
        Angles::Uniform(values) => {
            if values.len() != k {
                return Err(CifMovieError::malformed(format!(
                    "{} angles for {} axes '{}'",
                    values.len(),
                    k,
                    spec.axes
                )));
            }
            Ok(Orientations::Broadcast(composer.compose(&sequence, values)))
        }
        Angles::PerFrame(series) => {
            if series.len() != k {
                return Err(CifMovieError::malformed(format!(
                    "{} angle series for {} axes '{}'",
                    series.len(),
                    k,
                    spec.axes
                )));
            }
            let n = series[0].len();
            if n == 0 || series.iter().any(|s| s.len() != n) {
                return Err(CifMovieError::malformed(
                    "angle series must be non-empty and of equal length",
                ));
            }
            let mut out = Vec::with_capacity(n);
            let mut angles = vec![0.0; k];
            for frame in 0..n {
                for (slot, s) in angles.iter_mut().zip(series) {
                    *slot = s[frame];
                }
                out.push(composer.compose(&sequence, &angles));
            }
            if n == 1 {
                return Ok(Orientations::Broadcast(out[0]));
            }
            Ok(Orientations::PerFrame(out))
        }
    }
}

/// `n` evenly spaced angles from `start` towards `end`, end excluded, so a
/// full turn loops without a repeated frame.
pub fn sweep(start: f64, end: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + (end - start) * i as f64 / n as f64)
        .collect()
}

/// Parses a comma separated list with one entry per axis, either an angle
/// (`30`) or a sweep over the whole sequence (`0:360`). Scalars next to a
/// sweep are held constant for all `frames`.
pub fn parse_angles(text: &str, frames: usize) -> Result<Angles> {
    enum Entry {
        Fixed(f64),
        Sweep(f64, f64),
    }

    let number = |raw: &str| -> Result<f64> {
        raw.trim()
            .parse()
            .map_err(|_| CifMovieError::malformed(format!("invalid angle '{}'", raw.trim())))
    };
    let entries = text
        .split(',')
        .map(|item| match item.split_once(':') {
            Some((start, end)) => Ok(Entry::Sweep(number(start)?, number(end)?)),
            None => Ok(Entry::Fixed(number(item)?)),
        })
        .collect::<Result<Vec<_>>>()?;

    if !entries.iter().any(|e| matches!(e, Entry::Sweep(..))) {
        return Ok(Angles::Uniform(
            entries
                .iter()
                .filter_map(|e| match e {
                    Entry::Fixed(a) => Some(*a),
                    Entry::Sweep(..) => None,
                })
                .collect(),
        ));
    }
    if frames == 0 {
        return Err(CifMovieError::malformed("an angle sweep needs at least one frame"));
    }
    Ok(Angles::PerFrame(
        entries
            .iter()
            .map(|e| match *e {
                Entry::Fixed(a) => vec![a; frames],
                Entry::Sweep(start, end) => sweep(start, end, frames),
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn spec(axes: &str, angles: Angles) -> RotationSpec {
        RotationSpec {
            axes: axes.to_string(),
            angles,
        }
    }

    #[test]
    fn zero_about_z_is_broadcast_identity() {
        let o = rotation_calc(&spec("z", Angles::Uniform(vec![0.0]))).unwrap();
        let frames = o.for_frames(4).unwrap();
        assert_eq!(frames.len(), 4);
        for f in frames {
            assert_eq!(f.as_xyzw(), [0.0, 0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn single_axis_series_gives_one_per_angle() {
        let o = rotation_calc(&spec("y", Angles::Uniform(sweep(0.0, 360.0, 12)))).unwrap();
        assert_eq!(o.frame_count(), Some(12));
        for q in o.for_frames(12).unwrap() {
            let norm: f64 = q.as_xyzw().iter().map(|c| c * c).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        assert!(o.for_frames(11).is_err());
    }

    #[test]
    fn quarter_turn_about_z_maps_x_to_y() {
        let o = rotation_calc(&spec("z", Angles::Uniform(vec![90.0]))).unwrap();
        let Orientations::Broadcast(q) = o else {
            panic!("expected a broadcast orientation");
        };
        assert!(close(q.rotate([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn extrinsic_and_intrinsic_orders_differ() {
        let angles = Angles::Uniform(vec![90.0, 90.0]);
        let Orientations::Broadcast(ext) = rotation_calc(&spec("zx", angles.clone())).unwrap() else {
            panic!("expected broadcast");
        };
        let Orientations::Broadcast(int) = rotation_calc(&spec("ZX", angles)).unwrap() else {
            panic!("expected broadcast");
        };
        // fixed axes: z first, then x: x -> y -> z
        assert!(close(ext.rotate([1.0, 0.0, 0.0]), [0.0, 0.0, 1.0]));
        // body axes: x is carried onto y first, so x stays on y
        assert!(close(int.rotate([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn multi_axis_series_compose_per_frame() {
        let s = spec(
            "zyx",
            Angles::PerFrame(vec![vec![0.0, 90.0, 180.0], vec![0.0, 0.0, 10.0], vec![0.0, 0.0, 20.0]]),
        );
        let frames = rotation_calc(&s).unwrap().for_frames(3).unwrap();
        assert_eq!(frames[0].as_xyzw(), [0.0, 0.0, 0.0, 1.0]);
        assert!(close(frames[1].rotate([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        for bad in [
            spec("zy", Angles::Uniform(vec![1.0])),
            spec("zy", Angles::Uniform(vec![1.0, 2.0, 3.0])),
            spec("zy", Angles::PerFrame(vec![vec![1.0, 2.0]])),
            spec("zy", Angles::PerFrame(vec![vec![1.0, 2.0], vec![1.0]])),
            spec("z", Angles::PerFrame(vec![vec![]])),
            spec("", Angles::Uniform(vec![])),
            spec("zq", Angles::Uniform(vec![1.0, 2.0])),
            spec("zY", Angles::Uniform(vec![1.0, 2.0])),
            spec("xyzx", Angles::Uniform(vec![1.0; 4])),
        ] {
            let err = rotation_calc(&bad).unwrap_err();
            assert!(matches!(err, CifMovieError::MalformedInput(_)), "{:?}", bad);
        }
    }

    #[test]
    fn angles_deserialize_by_shape() {
        let uniform: Angles = serde_json::from_str("[30, 45]").unwrap();
        assert_eq!(uniform, Angles::Uniform(vec![30.0, 45.0]));
        let series: Angles = serde_json::from_str("[[0, 1], [2, 3]]").unwrap();
        assert_eq!(series, Angles::PerFrame(vec![vec![0.0, 1.0], vec![2.0, 3.0]]));
    }

    #[test]
    fn sweep_excludes_end() {
        assert_eq!(sweep(0.0, 360.0, 4), vec![0.0, 90.0, 180.0, 270.0]);
        assert!(sweep(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn half_turn_is_scalar_last() {
        let o = Orientation::from(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI));
        let q = o.as_xyzw();
        for (got, want) in q.iter().zip([0.0, 0.0, 1.0, 0.0]) {
            assert!((got - want).abs() < 1e-12, "{:?}", q);
        }
    }

    #[test]
    fn angle_lists_from_the_command_line() {
        assert_eq!(parse_angles("30, -45", 10).unwrap(), Angles::Uniform(vec![30.0, -45.0]));
        assert_eq!(
            parse_angles("-90:90,10", 2).unwrap(),
            Angles::PerFrame(vec![vec![-90.0, 0.0], vec![10.0, 10.0]])
        );
        assert!(parse_angles("0:360", 0).is_err());
        assert!(parse_angles("a", 3).is_err());
        assert!(parse_angles("1:2:3", 3).is_err());
    }
}
