// src/main.rs

use cifmovie::config::{parse_color, ErrorPolicy, Framing, ImageFormat, Settings};
use cifmovie::error::{CifMovieError, Result};
use cifmovie::io::{self, MissingPolicy};
use cifmovie::rendering::RenderReport;
use cifmovie::utils::logger;
use cifmovie::{movie, pipeline, rotation, synth};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info};
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cifmovie", version, about = "Render crystal structure series into a movie")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file to use instead of the one in the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load structures and render one image per structure.
    Render(RenderArgs),
    /// Assemble rendered frames into an MP4 (requires `ffmpeg` on PATH).
    Movie(MovieArgs),
    /// Render, then assemble the movie.
    Run(RunArgs),
    /// Write a synthetic SrTiO3 series to play with.
    Synth(SynthArgs),
    /// Print the effective settings as JSON.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Directory holding the structure files.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// File name prefix to match.
    #[arg(long)]
    prefix: Option<String>,

    /// File name suffix to match, e.g. `cif` or `.xyz`.
    #[arg(long)]
    ext: Option<String>,

    /// Succeed with zero frames when nothing matches.
    #[arg(long)]
    allow_empty: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    load: LoadArgs,

    /// Image name; frames are written as `{name}_{index:03}.{format}`.
    #[arg(long)]
    name: Option<String>,

    /// Directory for the rendered frames.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Page density for svg and pdf frames; png size is set by --width/--height.
    #[arg(long)]
    dpi: Option<f64>,

    /// Image width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Colour name, `#rrggbb`, or `none` for transparent.
    #[arg(long)]
    background: Option<String>,

    /// png, svg or pdf.
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Rotation axes, e.g. `z` or `zyx` (upper case for body axes).
    #[arg(long)]
    axes: Option<String>,

    /// One entry per axis: an angle in degrees or a `start:end` sweep.
    #[arg(long, allow_hyphen_values = true)]
    angles: Option<String>,

    #[arg(long)]
    zoom: Option<f64>,

    /// Fit the largest structure of the series into the image.
    #[arg(long)]
    fit: bool,

    /// Skip files that cannot be read and frames that cannot be drawn instead of stopping.
    #[arg(long)]
    skip_bad: bool,

    /// Rasterize frames on all cores.
    #[arg(long)]
    parallel: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Movie length in seconds, used when --fps is not given.
    #[arg(long)]
    duration: Option<f64>,

    #[arg(long)]
    fps: Option<f64>,

    /// ffmpeg video codec; `copy` muxes the frames untouched.
    #[arg(long)]
    codec: Option<String>,
}

#[derive(Args, Debug)]
struct MovieArgs {
    /// Directory holding the rendered frames.
    #[arg(long)]
    dir: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    format: Option<ImageFormat>,

    /// Directory for `{name}.mp4`.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    encode: EncodeArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    render: RenderArgs,

    #[command(flatten)]
    encode: EncodeArgs,

    /// Directory for `{name}.mp4`.
    #[arg(long)]
    movie_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SynthArgs {
    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value = "sto_")]
    prefix: String,

    #[arg(long, default_value_t = 200)]
    frames: usize,

    /// Structure file to deform instead of the built-in SrTiO3 cell.
    #[arg(long)]
    base: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Also write the settings back (to --config or the user config directory).
    #[arg(long)]
    save: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logger::init(logger::level_from_verbosity(cli.verbose, cli.quiet)) {
        eprintln!("failed to initialise logging: {}", e);
    }

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.cmd {
        Command::Render(args) => {
            apply_render(&mut settings, &args)?;
            let report = pipeline::render_frames(&settings)?;
            println!("{} frames written to {}", report.written.len(), settings.render.out_dir.display());
            report_skipped(&report);
        }
        Command::Movie(args) => {
            let mut cfg = settings.movie.clone();
            if let Some(dir) = args.dir {
                cfg.frames_dir = dir;
            }
            if let Some(name) = args.name {
                cfg.name = name;
            }
            if let Some(format) = args.format {
                cfg.format = format;
            }
            if let Some(out_dir) = args.out_dir {
                cfg.out_dir = out_dir;
            }
            settings.movie = cfg;
            apply_encode(&mut settings, &args.encode);
            let video = movie::movie(&settings.movie)?;
            println!("{}", video.display());
        }
        Command::Run(args) => {
            apply_render(&mut settings, &args.render)?;
            apply_encode(&mut settings, &args.encode);
            if let Some(dir) = args.movie_dir {
                settings.movie.out_dir = dir;
            }
            let (report, video) = pipeline::run(&settings)?;
            report_skipped(&report);
            println!("{}", video.display());
        }
        Command::Synth(args) => {
            let base = match &args.base {
                Some(path) => io::load_structure(path)?,
                None => synth::perovskite()?,
            };
            let frames = synth::generate(&base, args.frames)?;
            let paths = synth::write_dataset(&args.out_dir, &args.prefix, &frames)?;
            println!("{} structures written to {}", paths.len(), args.out_dir.display());
        }
        Command::Config(args) => {
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| CifMovieError::config(format!("cannot serialise settings: {}", e)))?;
            println!("{}", json);
            if args.save {
                let path = settings.save(cli.config.as_deref())?;
                info!("saved {}", path.display());
            }
        }
    }
    Ok(())
}

fn apply_render(settings: &mut Settings, args: &RenderArgs) -> Result<()> {
    let load = &mut settings.load;
    if let Some(dir) = &args.load.dir {
        load.directory = dir.clone();
    }
    if let Some(prefix) = &args.load.prefix {
        load.prefix = prefix.clone();
    }
    if let Some(ext) = &args.load.ext {
        load.extension = ext.clone();
    }
    if args.load.allow_empty {
        load.missing = MissingPolicy::AllowEmpty;
    }

    let render = &mut settings.render;
    if let Some(name) = &args.name {
        render.name = name.clone();
    }
    if let Some(out_dir) = &args.out_dir {
        render.out_dir = out_dir.clone();
    }
    if let Some(dpi) = args.dpi {
        render.dpi = dpi;
    }
    if let Some(width) = args.width {
        render.resolution.0 = width;
    }
    if let Some(height) = args.height {
        render.resolution.1 = height;
    }
    if let Some(bg) = &args.background {
        render.background = if bg.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_color(bg)?)
        };
    }
    if let Some(format) = args.format {
        render.format = format;
    }
    if let Some(zoom) = args.zoom {
        render.zoom = zoom;
    }
    if args.fit {
        render.framing = Framing::FitSequence;
    }
    if args.skip_bad {
        render.error_policy = ErrorPolicy::SkipAndReport;
    }
    if args.parallel {
        render.parallel = true;
    }

    if let Some(axes) = &args.axes {
        settings.rotation.axes = axes.clone();
    }
    if let Some(angles) = &args.angles {
        // Sweeps are spread over however many files the loader will find
        let load = &settings.load;
        let frames = io::discover(&load.directory, &load.prefix, &load.extension)?.len();
        settings.rotation.angles = rotation::parse_angles(angles, frames)?;
    }
    Ok(())
}

fn apply_encode(settings: &mut Settings, args: &EncodeArgs) {
    let movie = &mut settings.movie;
    if let Some(duration) = args.duration {
        movie.duration = duration;
    }
    if args.fps.is_some() {
        movie.fps = args.fps;
    }
    if let Some(codec) = &args.codec {
        movie.codec = codec.clone();
    }
}

fn report_skipped(report: &RenderReport) {
    for (path, reason) in &report.skipped_files {
        println!("skipped file {}: {}", path.display(), reason);
    }
    for (index, reason) in &report.skipped {
        println!("skipped input {}: {}", index, reason);
    }
}
