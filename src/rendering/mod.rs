// src/rendering/mod.rs
pub mod export;
pub mod primitives;
pub mod scene;

pub use export::{CairoRenderer, SceneRenderer};
pub use scene::{check_frame, prepare_scene, project_scene, RenderAtom, SceneBounds};

use crate::config::{ErrorPolicy, Framing, RenderConfig};
use crate::error::{CifMovieError, Result};
use crate::model::AtomicStructure;
use crate::rotation::{Orientation, Orientations};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Files written, in frame order, and the inputs that were skipped.
/// `skipped` indexes the frames handed to the renderer; `skipped_files`
/// names files the loader could not read.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
  pub written: Vec<PathBuf>,
  pub skipped: Vec<(usize, String)>,
  pub skipped_files: Vec<(PathBuf, String)>,
  pub removed: Vec<PathBuf>,
}

/// `{out_dir}/{name}_{index:03}.{format}`
pub fn frame_path(config: &RenderConfig, index: usize) -> PathBuf {
  config.out_dir.join(format!(
    "{}_{:03}.{}",
    config.name,
    index,
    config.format.extension()
  ))
}

/// Deletes `{name}_{index}.{format}` files in `out_dir` numbered `keep` or
/// higher, left over from an earlier and longer render.
pub fn remove_stale_frames(config: &RenderConfig, keep: usize) -> Result<Vec<PathBuf>> {
  let dir = &config.out_dir;
  if !dir.is_dir() {
    return Ok(Vec::new());
  }
  let prefix = format!("{}_", config.name);
  let suffix = format!(".{}", config.format.extension());

  let mut removed = Vec::new();
  for entry in fs::read_dir(dir).map_err(|e| CifMovieError::io(dir, e))? {
    let entry = entry.map_err(|e| CifMovieError::io(dir, e))?;
    let file_name = entry.file_name();
    let Some(index) = file_name
      .to_str()
      .and_then(|n| n.strip_prefix(&prefix))
      .and_then(|n| n.strip_suffix(&suffix))
      .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
      .and_then(|digits| digits.parse::<usize>().ok())
    else {
      continue;
    };
    if index < keep {
      continue;
    }
    let path = entry.path();
    fs::remove_file(&path).map_err(|e| CifMovieError::io(&path, e))?;
    debug!("removed stale frame {}", path.display());
    removed.push(path);
  }

  if !removed.is_empty() {
    removed.sort();
    info!("removed {} stale frames from {}", removed.len(), dir.display());
  }
  Ok(removed)
}

pub fn render(
  frames: &mut [AtomicStructure],
  orientations: &Orientations,
  config: &RenderConfig,
) -> Result<RenderReport> {
  render_with(frames, orientations, config, || CairoRenderer::new(config))
}

// What every worker reads; one frame is projected at a time
struct Scenes<'a> {
  frames: &'a [AtomicStructure],
  orientations: &'a [Orientation],
  bounds: SceneBounds,
  radius_scale: f64,
}

/// Renders with renderers from `make_renderer`, one per worker.
pub fn render_with<R, F>(
  frames: &mut [AtomicStructure],
  orientations: &Orientations,
  config: &RenderConfig,
  make_renderer: F,
) -> Result<RenderReport>
where
  R: SceneRenderer,
  F: Fn() -> Result<R> + Sync,
{
  config.validate()?;
  let orientations = orientations.for_frames(frames.len())?;
  let mut report = RenderReport::default();

  if frames.is_empty() {
    warn!("no frames to render");
    report.removed = remove_stale_frames(config, 0)?;
    return Ok(report);
  }

  let extent = match config.framing {
    Framing::FitSequence => Some(scene::sequence_extent(frames, config.radius_scale)),
    Framing::Fixed { .. } => None,
  };
  let bounds = SceneBounds::new(config, extent);
  let (w_in, h_in) = config.figsize();
  debug!(
    "scene scale {:.3} px/A, {:.2}x{:.2} in at {} dpi",
    bounds.scale, w_in, h_in, config.dpi
  );

  // 1. Check and recentre every frame; output indices stay contiguous over survivors
  let mut jobs: Vec<(PathBuf, usize)> = Vec::with_capacity(frames.len());
  for (i, frame) in frames.iter_mut().enumerate() {
    match check_frame(frame) {
      Ok(()) => jobs.push((frame_path(config, jobs.len()), i)),
      Err(e) => match config.error_policy {
        ErrorPolicy::FailFast => return Err(e),
        ErrorPolicy::SkipAndReport => {
          warn!("skipping frame {}: {}", i, e);
          report.skipped.push((i, e.to_string()));
        }
      },
    }
  }

  if jobs.is_empty() {
    warn!("every frame was skipped, nothing written");
    report.removed = remove_stale_frames(config, 0)?;
    return Ok(report);
  }

  fs::create_dir_all(&config.out_dir).map_err(|e| CifMovieError::io(&config.out_dir, e))?;
  info!(
    "rendering {} frames into {}",
    jobs.len(),
    config.out_dir.display()
  );

  // 2. Project and rasterize
  let scenes = Scenes {
    frames: &*frames,
    orientations: &orientations,
    bounds,
    radius_scale: config.radius_scale,
  };
  report.written = if config.parallel && jobs.len() > 1 {
    let workers = rayon::current_num_threads().max(1);
    let chunk = jobs.len().div_ceil(workers);
    jobs
      .par_chunks(chunk)
      .map(|batch| rasterize_batch(&make_renderer, &scenes, batch))
      .collect::<Result<Vec<_>>>()?
      .into_iter()
      .flatten()
      .collect()
  } else {
    rasterize_batch(&make_renderer, &scenes, &jobs)?
  };
  report.removed = remove_stale_frames(config, report.written.len())?;

  info!(
    "wrote {} frames ({} skipped)",
    report.written.len(),
    report.skipped.len()
  );
  Ok(report)
}

fn rasterize_batch<R, F>(make_renderer: &F, scenes: &Scenes, batch: &[(PathBuf, usize)]) -> Result<Vec<PathBuf>>
where
  R: SceneRenderer,
  F: Fn() -> Result<R>,
{
  let mut renderer = make_renderer()?;
  let mut written = Vec::with_capacity(batch.len());
  for (path, i) in batch {
    let atoms = project_scene(
      &scenes.frames[*i],
      &scenes.orientations[*i],
      &scenes.bounds,
      scenes.radius_scale,
    )?;
    rasterize(&mut renderer, &atoms, path)?;
    written.push(path.clone());
  }
  renderer.finish()?;
  Ok(written)
}

fn rasterize<R: SceneRenderer>(renderer: &mut R, atoms: &[RenderAtom], path: &Path) -> Result<()> {
  renderer.reset()?;
  renderer.draw(atoms)?;
  renderer.save(path)?;
  debug!("wrote {} ({} atoms)", path.display(), atoms.len());
  Ok(())
}
