// src/movie.rs

use crate::config::MovieConfig;
use crate::error::{CifMovieError, Result};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Everything an encoder needs to turn numbered frames into one video.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxJob {
    /// printf-style pattern, e.g. `cif_images/img_%03d.png`
    pub input_pattern: PathBuf,
    pub fps: f64,
    pub codec: String,
    pub output: PathBuf,
}

pub trait VideoMuxer {
    fn mux(&self, job: &MuxJob) -> Result<()>;
}

/// Runs the system `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    pub binary: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegMuxer {
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Fails with [`CifMovieError::Encoding`], naming the binary, when it cannot be run.
    pub fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(self.not_found())
        }
    }

    fn not_found(&self) -> CifMovieError {
        CifMovieError::encoding(format!(
            "ffmpeg binary '{}' not found (is it installed and on PATH?)",
            self.binary.display()
        ))
    }

    pub fn args(job: &MuxJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-framerate"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(job.fps.to_string().into());
        args.push("-i".into());
        args.push(job.input_pattern.clone().into_os_string());
        args.push("-c:v".into());
        args.push(job.codec.clone().into());
        if job.codec != "copy" {
            // Re-encoded output is for players, which want 4:2:0
            args.push("-pix_fmt".into());
            args.push("yuv420p".into());
        }
        args.push(job.output.clone().into_os_string());
        args
    }
}

impl VideoMuxer for FfmpegMuxer {
    fn mux(&self, job: &MuxJob) -> Result<()> {
        let args = Self::args(job);
        debug!("{} {:?}", self.binary.display(), args);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.not_found()
                } else {
                    CifMovieError::encoding(format!("failed to run ffmpeg: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CifMovieError::encoding(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim_end()
            )));
        }
        Ok(())
    }
}

/// Counts `{name}_*.{ext}` in `dir`. Warns when the numbered indices have a
/// gap, since the encoder stops at the first missing frame.
pub fn count_frames(dir: &Path, name: &str, ext: &str) -> Result<usize> {
    if !dir.is_dir() {
        return Err(CifMovieError::not_found(format!(
            "frames directory '{}' does not exist",
            dir.display()
        )));
    }

    let prefix = format!("{}_", name);
    let suffix = format!(".{}", ext);
    let mut count = 0;
    let mut indices = BTreeSet::new();

    let entries = fs::read_dir(dir).map_err(|e| CifMovieError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CifMovieError::io(dir, e))?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(middle) = file_name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        count += 1;
        if let Ok(i) = middle.parse::<usize>() {
            indices.insert(i);
        }
    }

    if count == 0 {
        return Err(CifMovieError::not_found(format!(
            "no frames match '{}/{}*{}'",
            dir.display(),
            prefix,
            suffix
        )));
    }

    if let Some(missing) = (0..count).find(|i| !indices.contains(i)) {
        warn!(
            "frame {}{:03}{} is missing; the movie will stop before it",
            prefix, missing, suffix
        );
    }
    Ok(count)
}

/// `fps` if given, else `frames / duration`.
pub fn resolve_fps(frames: usize, duration: f64, fps: Option<f64>) -> Result<f64> {
    match fps {
        Some(fps) if fps > 0.0 && fps.is_finite() => Ok(fps),
        Some(fps) => Err(CifMovieError::malformed(format!("fps must be positive, got {}", fps))),
        None if duration > 0.0 && duration.is_finite() => Ok(frames as f64 / duration),
        None => Err(CifMovieError::malformed(format!(
            "duration must be positive, got {}",
            duration
        ))),
    }
}

pub fn movie(config: &MovieConfig) -> Result<PathBuf> {
    let muxer = FfmpegMuxer::default();
    muxer.ensure_available()?;
    movie_with(&muxer, config)
}

pub fn movie_with<M: VideoMuxer + ?Sized>(muxer: &M, config: &MovieConfig) -> Result<PathBuf> {
    if config.name.is_empty() {
        return Err(CifMovieError::malformed("movie name must not be empty"));
    }
    if config.codec.is_empty() {
        return Err(CifMovieError::malformed("codec must not be empty"));
    }

    let ext = config.format.extension();
    let frames = count_frames(&config.frames_dir, &config.name, ext)?;
    let fps = resolve_fps(frames, config.duration, config.fps)?;

    if !config.out_dir.as_os_str().is_empty() {
        fs::create_dir_all(&config.out_dir).map_err(|e| CifMovieError::io(&config.out_dir, e))?;
    }
    let job = MuxJob {
        input_pattern: config
            .frames_dir
            .join(format!("{}_%03d.{}", config.name, ext)),
        fps,
        codec: config.codec.clone(),
        output: config.out_dir.join(format!("{}.mp4", config.name)),
    };

    info!(
        "encoding {} frames at {:.3} fps into {}",
        frames,
        fps,
        job.output.display()
    );
    muxer.mux(&job)?;
    Ok(job.output)
}
