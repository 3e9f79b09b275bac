// src/config.rs

use crate::error::{CifMovieError, Result};
use crate::io::MissingPolicy;
use crate::model::Rgb;
use crate::rotation::RotationSpec;
use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
  #[default]
  Png,
  Svg,
  Pdf,
}

impl ImageFormat {
  pub fn extension(self) -> &'static str {
    match self {
      ImageFormat::Png => "png",
      ImageFormat::Svg => "svg",
      ImageFormat::Pdf => "pdf",
    }
  }
}

impl FromStr for ImageFormat {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "png" => Ok(ImageFormat::Png),
      "svg" => Ok(ImageFormat::Svg),
      "pdf" => Ok(ImageFormat::Pdf),
      other => Err(format!("unsupported image format '{}' (png, svg, pdf)", other)),
    }
  }
}

/// How world units map to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Framing {
  /// `width` Angstroms span the image width at zoom 1, for every frame.
  Fixed { width: f64 },
  /// One scale that fits the largest frame of the sequence.
  FitSequence,
}

impl Default for Framing {
  fn default() -> Self {
    Framing::Fixed { width: 40.0 }
  }
}

/// What the renderer does with a frame it cannot prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
  #[default]
  FailFast,
  SkipAndReport,
}

// --- Stage configs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSettings {
  pub directory: PathBuf,
  pub prefix: String,
  pub extension: String,
  pub missing: MissingPolicy,
}

impl Default for LoadSettings {
  fn default() -> Self {
    Self {
      directory: PathBuf::from("."),
      prefix: String::new(),
      extension: "cif".to_string(),
      missing: MissingPolicy::Fail,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
  pub name: String,
  pub out_dir: PathBuf,
  /// Sets the page size of SVG and PDF frames, `resolution / dpi` inches.
  /// PNG frames are always `resolution` pixels and carry no DPI metadata.
  pub dpi: f64,
  /// (width, height) in pixels
  pub resolution: (u32, u32),
  /// `None` leaves the background transparent
  pub background: Option<Rgb>,
  pub format: ImageFormat,
  pub zoom: f64,
  pub framing: Framing,
  /// Multiplies the covalent radius of every atom
  pub radius_scale: f64,
  pub error_policy: ErrorPolicy,
  pub parallel: bool,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      name: "img".to_string(),
      out_dir: PathBuf::from("cif_images"),
      dpi: 72.0,
      resolution: (1024, 1024),
      background: Some((1.0, 1.0, 1.0)),
      format: ImageFormat::Png,
      zoom: 1.0,
      framing: Framing::default(),
      radius_scale: 0.5,
      error_policy: ErrorPolicy::FailFast,
      parallel: false,
    }
  }
}

impl RenderConfig {
  pub fn validate(&self) -> Result<()> {
    if self.name.is_empty() {
      return Err(CifMovieError::malformed("render name must not be empty"));
    }
    if self.resolution.0 == 0 || self.resolution.1 == 0 {
      return Err(CifMovieError::malformed("resolution must be non-zero"));
    }
    if !(self.dpi > 0.0) {
      return Err(CifMovieError::malformed("dpi must be positive"));
    }
    if !(self.zoom > 0.0) {
      return Err(CifMovieError::malformed("zoom must be positive"));
    }
    if !(self.radius_scale > 0.0) {
      return Err(CifMovieError::malformed("radius scale must be positive"));
    }
    if let Framing::Fixed { width } = self.framing {
      if !(width > 0.0) {
        return Err(CifMovieError::malformed("scene width must be positive"));
      }
    }
    Ok(())
  }

  /// Figure size in inches, `resolution / dpi`.
  pub fn figsize(&self) -> (f64, f64) {
    (
      self.resolution.0 as f64 / self.dpi,
      self.resolution.1 as f64 / self.dpi,
    )
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
  pub frames_dir: PathBuf,
  pub name: String,
  pub format: ImageFormat,
  /// Target length in seconds, used when `fps` is not set
  pub duration: f64,
  pub fps: Option<f64>,
  pub out_dir: PathBuf,
  /// `copy` muxes the frames as they are; any other ffmpeg encoder re-encodes
  pub codec: String,
}

impl Default for MovieConfig {
  fn default() -> Self {
    Self {
      frames_dir: PathBuf::from("cif_images"),
      name: "img".to_string(),
      format: ImageFormat::Png,
      duration: 3.0,
      fps: None,
      out_dir: PathBuf::from("."),
      codec: "copy".to_string(),
    }
  }
}

// --- Main Settings Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Settings {
  #[serde(default)]
  pub load: LoadSettings,
  #[serde(default)]
  pub rotation: RotationSpec,
  #[serde(default)]
  pub render: RenderConfig,
  #[serde(default)]
  pub movie: MovieConfig,
}

impl Settings {
  /// Loads settings from the standard OS location (e.g. ~/.config/cifmovie/settings.json),
  /// falling back to defaults when there is no file.
  pub fn load() -> Result<Self> {
    let path = Self::get_path();
    if path.exists() {
      Self::load_from(&path)
    } else {
      debug!("no settings at {}, using defaults", path.display());
      Ok(Self::default())
    }
  }

  pub fn load_from(path: &Path) -> Result<Self> {
    let file = File::open(path).map_err(|e| CifMovieError::io(path, e))?;
    let settings = serde_json::from_reader(BufReader::new(file))
      .map_err(|e| CifMovieError::config(format!("error parsing {}: {}", path.display(), e)))?;
    info!("settings loaded from {}", path.display());
    Ok(settings)
  }

  /// Saves to `path`, or to the standard OS location when `None`.
  pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Self::get_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|e| CifMovieError::io(parent, e))?;
    }

    let file = File::create(&path).map_err(|e| CifMovieError::io(&path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), self)
      .map_err(|e| CifMovieError::config(format!("failed to save settings: {}", e)))?;
    info!("settings saved to {}", path.display());
    Ok(path)
  }

  pub fn get_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "mavensgroup", "cifmovie") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }
}

/// Parses `#rrggbb`, `#rgb` or one of a few colour names.
pub fn parse_color(s: &str) -> Result<Rgb> {
  let s = s.trim().to_ascii_lowercase();
  let named = match s.as_str() {
    "white" => Some((1.0, 1.0, 1.0)),
    "black" => Some((0.0, 0.0, 0.0)),
    "gray" | "grey" => Some((0.5, 0.5, 0.5)),
    "lightgray" | "lightgrey" => Some((0.827, 0.827, 0.827)),
    "red" => Some((1.0, 0.0, 0.0)),
    "green" => Some((0.0, 0.5, 0.0)),
    "blue" => Some((0.0, 0.0, 1.0)),
    "navy" => Some((0.0, 0.0, 0.5)),
    _ => None,
  };
  if let Some(rgb) = named {
    return Ok(rgb);
  }

  let hex = s
    .strip_prefix('#')
    .ok_or_else(|| CifMovieError::malformed(format!("unknown colour '{}'", s)))?;
  let digits: Vec<u8> = match hex.len() {
    3 => hex.chars().flat_map(|c| [c, c]).map(|c| c as u8).collect(),
    6 => hex.bytes().collect(),
    _ => return Err(CifMovieError::malformed(format!("bad hex colour '{}'", s))),
  };
  let channel = |i: usize| -> Result<f64> {
    let pair = std::str::from_utf8(&digits[i..i + 2]).unwrap_or("");
    u8::from_str_radix(pair, 16)
      .map(|v| v as f64 / 255.0)
      .map_err(|_| CifMovieError::malformed(format!("bad hex colour '{}'", s)))
  };
  Ok((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_values() {
    let r = RenderConfig::default();
    assert_eq!(r.out_dir, PathBuf::from("cif_images"));
    assert_eq!(r.resolution, (1024, 1024));
    assert_eq!(r.figsize(), (1024.0 / 72.0, 1024.0 / 72.0));
    assert!(r.validate().is_ok());

    let m = MovieConfig::default();
    assert_eq!(m.duration, 3.0);
    assert_eq!(m.codec, "copy");
  }

  #[test]
  fn partial_json_fills_defaults() {
    let s: Settings = serde_json::from_str(
      r#"{ "render": { "name": "sto", "background": null, "framing": { "mode": "fit_sequence" } },
           "rotation": { "axes": "z", "angles": [[0, 10, 20]] } }"#,
    )
    .unwrap();
    assert_eq!(s.render.name, "sto");
    assert_eq!(s.render.background, None);
    assert_eq!(s.render.framing, Framing::FitSequence);
    assert_eq!(s.render.dpi, 72.0);
    assert_eq!(s.load.extension, "cif");
    assert_eq!(s.movie, MovieConfig::default());
  }

  #[test]
  fn save_and_load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/settings.json");
    let mut s = Settings::default();
    s.render.error_policy = ErrorPolicy::SkipAndReport;
    s.movie.fps = Some(24.0);

    assert_eq!(s.save(Some(&path)).unwrap(), path);
    assert_eq!(Settings::load_from(&path).unwrap(), s);
  }

  #[test]
  fn broken_settings_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Settings::load_from(&path), Err(CifMovieError::Config(_))));
  }

  #[test]
  fn validation_rejects_bad_values() {
    let mut r = RenderConfig::default();
    r.dpi = 0.0;
    assert!(r.validate().is_err());

    let mut r = RenderConfig::default();
    r.resolution = (0, 10);
    assert!(r.validate().is_err());

    let mut r = RenderConfig::default();
    r.framing = Framing::Fixed { width: -1.0 };
    assert!(r.validate().is_err());
  }

  #[test]
  fn colours() {
    assert_eq!(parse_color("White").unwrap(), (1.0, 1.0, 1.0));
    assert_eq!(parse_color("#ff0000").unwrap(), (1.0, 0.0, 0.0));
    assert_eq!(parse_color("#0f0").unwrap(), (0.0, 1.0, 0.0));
    assert!(parse_color("#12345").is_err());
    assert!(parse_color("#gggggg").is_err());
    assert!(parse_color("mauve").is_err());
  }

  #[test]
  fn image_format_names() {
    assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
    assert_eq!(ImageFormat::Svg.extension(), "svg");
    assert!("gif".parse::<ImageFormat>().is_err());
  }
}
