// src/io/mod.rs
pub mod cif;
pub mod poscar;
pub mod xyz;

use crate::config::ErrorPolicy;
use crate::error::{CifMovieError, Result};
use crate::model::{AtomicStructure, FrameSequence};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureFormat {
    Cif,
    Xyz,
    Poscar,
}

impl StructureFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();

        if name.ends_with(".cif") {
            Some(Self::Cif)
        } else if name.ends_with(".xyz") || name.ends_with(".extxyz") {
            Some(Self::Xyz)
        } else if name.ends_with(".vasp")
            || name.ends_with(".poscar")
            || name.starts_with("poscar")
            || name.starts_with("contcar")
        {
            Some(Self::Poscar)
        } else {
            None
        }
    }
}

/// Turns one file on disk into an [`AtomicStructure`].
pub trait StructureParser {
    fn parse(&self, path: &Path) -> Result<AtomicStructure>;
}

/// Picks the reader from the file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileParser;

impl StructureParser for FileParser {
    fn parse(&self, path: &Path) -> Result<AtomicStructure> {
        let format = StructureFormat::from_path(path).ok_or_else(|| {
            CifMovieError::malformed(format!("unsupported structure format '{}'", path.display()))
        })?;
        let parsed = match format {
            StructureFormat::Cif => cif::parse(path),
            StructureFormat::Xyz => xyz::parse(path),
            StructureFormat::Poscar => poscar::parse(path),
        };
        parsed.map_err(|e| e.in_file(path))
    }
}

pub fn load_structure(path: &Path) -> Result<AtomicStructure> {
    FileParser.parse(path)
}

pub fn save_structure(path: &Path, structure: &AtomicStructure) -> Result<()> {
    match StructureFormat::from_path(path) {
        Some(StructureFormat::Cif) => cif::write(path, structure),
        Some(StructureFormat::Xyz) => xyz::write(path, structure),
        _ => Err(CifMovieError::malformed(format!(
            "cannot write structures as '{}'",
            path.display()
        ))),
    }
}

/// What [`load`] does when nothing matches the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    #[default]
    Fail,
    AllowEmpty,
}

/// Files in `directory` named `{prefix}*{extension}`, sorted by name.
pub fn discover(directory: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(CifMovieError::not_found(format!(
            "input directory '{}' does not exist",
            directory.display()
        )));
    }

    let entries = fs::read_dir(directory).map_err(|e| CifMovieError::io(directory, e))?;
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CifMovieError::io(directory, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.len() >= prefix.len() + extension.len()
            && name.starts_with(prefix)
            && name.ends_with(extension)
        {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

/// Frames that loaded, and the files that did not.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    pub frames: FrameSequence,
    pub skipped: Vec<(PathBuf, String)>,
}

pub fn load(directory: &Path, prefix: &str, extension: &str, policy: MissingPolicy) -> Result<FrameSequence> {
    load_with(&FileParser, directory, prefix, extension, policy)
}

pub fn load_with<P: StructureParser + ?Sized>(
    parser: &P,
    directory: &Path,
    prefix: &str,
    extension: &str,
    policy: MissingPolicy,
) -> Result<FrameSequence> {
    load_report_with(parser, directory, prefix, extension, policy, ErrorPolicy::FailFast).map(|r| r.frames)
}

/// Like [`load`], but `on_error` decides whether one unreadable file
/// aborts the load or is left out of the sequence.
pub fn load_report(
    directory: &Path,
    prefix: &str,
    extension: &str,
    policy: MissingPolicy,
    on_error: ErrorPolicy,
) -> Result<LoadReport> {
    load_report_with(&FileParser, directory, prefix, extension, policy, on_error)
}

pub fn load_report_with<P: StructureParser + ?Sized>(
    parser: &P,
    directory: &Path,
    prefix: &str,
    extension: &str,
    policy: MissingPolicy,
    on_error: ErrorPolicy,
) -> Result<LoadReport> {
    let paths = discover(directory, prefix, extension)?;
    let mut report = LoadReport::default();

    if paths.is_empty() {
        let pattern = format!("{}/{}*{}", directory.display(), prefix, extension);
        return match policy {
            MissingPolicy::Fail => Err(CifMovieError::not_found(format!(
                "no structure files match '{}'",
                pattern
            ))),
            MissingPolicy::AllowEmpty => {
                warn!("no structure files match '{}'", pattern);
                Ok(report)
            }
        };
    }

    report.frames.reserve(paths.len());
    for path in paths {
        let structure = match parser.parse(&path) {
            Ok(structure) => structure,
            Err(e) => match on_error {
                ErrorPolicy::FailFast => return Err(e),
                ErrorPolicy::SkipAndReport => {
                    warn!("skipping {}: {}", path.display(), e);
                    report.skipped.push((path, e.to_string()));
                    continue;
                }
            },
        };
        debug!(
            "loaded {} ({} atoms: {})",
            path.display(),
            structure.len(),
            structure.formula()
        );
        report.frames.push(structure);
    }

    if report.frames.is_empty() {
        warn!("none of the {} matching files could be read", report.skipped.len());
    }
    info!(
        "loaded {} structures from {} ({} skipped)",
        report.frames.len(),
        directory.display(),
        report.skipped.len()
    );
    Ok(report)
}
