// src/pipeline.rs

use crate::config::{MovieConfig, Settings};
use crate::error::Result;
use crate::io;
use crate::movie::{self, FfmpegMuxer, VideoMuxer};
use crate::rendering::{self, RenderReport};
use crate::rotation::rotation_calc;
use log::info;
use std::path::PathBuf;

/// Load -> rotate -> render.
pub fn render_frames(settings: &Settings) -> Result<RenderReport> {
    let load = &settings.load;
    let loaded = io::load_report(
        &load.directory,
        &load.prefix,
        &load.extension,
        load.missing,
        settings.render.error_policy,
    )?;
    let mut frames = loaded.frames;
    let orientations = rotation_calc(&settings.rotation)?;
    let mut report = rendering::render(&mut frames, &orientations, &settings.render)?;
    report.skipped_files = loaded.skipped;
    Ok(report)
}

/// The movie stage reads what the render stage wrote.
pub fn movie_config_for(settings: &Settings) -> MovieConfig {
    MovieConfig {
        frames_dir: settings.render.out_dir.clone(),
        name: settings.render.name.clone(),
        format: settings.render.format,
        ..settings.movie.clone()
    }
}

/// Checks for `ffmpeg` before spending time on the frames.
pub fn run(settings: &Settings) -> Result<(RenderReport, PathBuf)> {
    let muxer = FfmpegMuxer::default();
    muxer.ensure_available()?;
    run_with(&muxer, settings)
}

pub fn run_with<M: VideoMuxer + ?Sized>(muxer: &M, settings: &Settings) -> Result<(RenderReport, PathBuf)> {
    let report = render_frames(settings)?;
    let video = movie::movie_with(muxer, &movie_config_for(settings))?;
    info!("movie written to {}", video.display());
    Ok((report, video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorPolicy;
    use crate::error::CifMovieError;
    use crate::movie::MuxJob;
    use crate::rotation::{sweep, Angles, RotationSpec};
    use crate::synth;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingMuxer {
        jobs: RefCell<Vec<MuxJob>>,
    }

    impl VideoMuxer for RecordingMuxer {
        fn mux(&self, job: &MuxJob) -> Result<()> {
            self.jobs.borrow_mut().push(job.clone());
            Ok(())
        }
    }

    fn settings(root: &std::path::Path, frames: usize) -> Settings {
        let data = root.join("data");
        let series = synth::generate(&synth::perovskite().unwrap(), frames).unwrap();
        synth::write_dataset(&data, "sto_", &series).unwrap();

        let mut s = Settings::default();
        s.load.directory = data;
        s.load.prefix = "sto_".to_string();
        s.rotation = RotationSpec {
            axes: "z".to_string(),
            angles: Angles::Uniform(sweep(0.0, 360.0, frames)),
        };
        s.render.out_dir = root.join("cif_images");
        s.render.name = "sto".to_string();
        s.render.resolution = (64, 64);
        s.movie.out_dir = root.to_path_buf();
        s.movie.duration = 2.0;
        s
    }

    #[test]
    fn whole_pipeline_hands_frames_to_the_muxer() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 6);
        let muxer = RecordingMuxer::default();

        let (report, video) = run_with(&muxer, &s).unwrap();

        assert_eq!(report.written.len(), 6);
        assert!(dir.path().join("cif_images/sto_005.png").is_file());
        assert_eq!(video, dir.path().join("sto.mp4"));

        let jobs = muxer.jobs.borrow();
        assert_eq!(jobs[0].fps, 3.0);
        assert_eq!(jobs[0].input_pattern, dir.path().join("cif_images/sto_%03d.png"));
    }

    #[test]
    fn rotation_series_must_match_the_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path(), 3);
        s.rotation.angles = Angles::Uniform(sweep(0.0, 360.0, 4));
        assert!(matches!(render_frames(&s), Err(CifMovieError::MalformedInput(_))));
    }

    #[test]
    fn unreadable_input_is_skipped_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path(), 4);
        s.rotation.angles = Angles::Uniform(sweep(0.0, 360.0, 3));
        std::fs::write(s.load.directory.join("sto_002.cif"), "data_broken\n").unwrap();

        let err = render_frames(&s).unwrap_err();
        assert!(err.to_string().contains("sto_002.cif"));

        s.render.error_policy = ErrorPolicy::SkipAndReport;
        let muxer = RecordingMuxer::default();
        let (report, _) = run_with(&muxer, &s).unwrap();
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].0.ends_with("sto_002.cif"));
        assert_eq!(muxer.jobs.borrow()[0].fps, 1.5);
    }

    #[test]
    fn rerun_with_fewer_frames_muxes_only_the_new_ones() {
        let dir = tempfile::tempdir().unwrap();
        let muxer = RecordingMuxer::default();
        run_with(&muxer, &settings(dir.path(), 6)).unwrap();

        let shorter = tempfile::tempdir().unwrap();
        let mut s = settings(shorter.path(), 2);
        s.render.out_dir = dir.path().join("cif_images");
        let (report, _) = run_with(&muxer, &s).unwrap();

        assert_eq!(report.removed.len(), 4);
        assert!(!dir.path().join("cif_images/sto_002.png").exists());
        // 2 frames over 2 seconds
        assert_eq!(muxer.jobs.borrow()[1].fps, 1.0);
    }

    #[test]
    fn movie_follows_render_naming() {
        let mut s = Settings::default();
        s.render.name = "run1".to_string();
        s.render.out_dir = PathBuf::from("frames");
        s.movie.codec = "libx264".to_string();
        let m = movie_config_for(&s);
        assert_eq!(m.name, "run1");
        assert_eq!(m.frames_dir, PathBuf::from("frames"));
        assert_eq!(m.codec, "libx264");
    }
}
