use aruco_watch::markers::{render_marker, ArucoDetector};
use aruco_watch::run::{run_image, run_stream, write_report, StreamOptions};
use aruco_watch::{
    FfmpegSource, FfplayPreview, FrameSource, Mode, NoPreview, Preview, RunConfig, SequenceSource,
    SightingLog, SourceError, StillImageSource, VideoInput,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[derive(Parser, Debug)]
#[command(name = "aruco-watch", version, about = "Detect ArUco markers in images, video, webcams and screen captures")]
struct Cli {
    /// JSON run configuration; command-line flags take precedence.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct CommonArgs {
    /// Run without the preview window.
    #[arg(long)]
    no_preview: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Marker dictionary name.
    #[arg(long)]
    dictionary: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect markers in a still image and save an annotated JPEG.
    Image {
        path: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the detections as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Detect markers in every frame of a video file.
    Video {
        path: Option<PathBuf>,
        #[arg(long)]
        log: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Watch a webcam and log first sightings.
    Webcam {
        index: Option<u32>,
        #[arg(long)]
        log: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Watch a screen capture and log first sightings.
    Screen {
        display: Option<String>,
        #[arg(long)]
        log: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run over a directory of frames in file-name order.
    Sequence {
        dir: PathBuf,
        #[arg(long)]
        log: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Render a marker image.
    Render {
        id: u32,
        #[arg(long)]
        output: PathBuf,
        /// Pixels per marker cell.
        #[arg(long, default_value_t = 20)]
        cell_px: usize,
        /// White margin around the marker, in cells.
        #[arg(long, default_value_t = 1)]
        quiet_zone: usize,
        #[arg(long)]
        dictionary: Option<String>,
    },
    /// Write a config file with every field spelled out.
    InitConfig { path: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut cfg = match &cli.config {
        Some(path) => RunConfig::load_json(path)?,
        None => RunConfig::default(),
    };

    let outcome = match cli.command {
        Command::Image {
            path,
            output,
            report,
            common,
        } => {
            apply_common(&mut cfg, &common);
            if output.is_some() {
                cfg.output_image = output;
            }
            let path = path.unwrap_or_else(|| PathBuf::from(aruco_watch::config::DEFAULT_IMAGE_PATH));
            image_mode(&cfg, path, report)
        }
        Command::Video { path, log, common } => {
            apply_common(&mut cfg, &common);
            set_log(&mut cfg, log);
            let path = path.unwrap_or_else(|| PathBuf::from(aruco_watch::config::DEFAULT_VIDEO_PATH));
            stream_mode(&cfg, Mode::Video, || {
                FfmpegSource::open(VideoInput::File(path)).map(boxed)
            })
        }
        Command::Webcam { index, log, common } => {
            apply_common(&mut cfg, &common);
            set_log(&mut cfg, log);
            let index = index.unwrap_or(aruco_watch::config::DEFAULT_WEBCAM_INDEX);
            stream_mode(&cfg, Mode::Webcam, || {
                FfmpegSource::open(VideoInput::Webcam(index)).map(boxed)
            })
        }
        Command::Screen {
            display,
            log,
            common,
        } => {
            apply_common(&mut cfg, &common);
            set_log(&mut cfg, log);
            stream_mode(&cfg, Mode::Screen, || {
                FfmpegSource::open(VideoInput::Screen { display }).map(boxed)
            })
        }
        Command::Sequence { dir, log, common } => {
            apply_common(&mut cfg, &common);
            set_log(&mut cfg, log);
            stream_mode(&cfg, Mode::Sequence, || SequenceSource::open(&dir).map(boxed))
        }
        Command::Render {
            id,
            output,
            cell_px,
            quiet_zone,
            dictionary,
        } => {
            if dictionary.is_some() {
                cfg.dictionary = dictionary;
            }
            let img = render_marker(cfg.dictionary()?, id, cell_px, quiet_zone)?;
            let img = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data)
                .ok_or("rendered marker has an inconsistent buffer")?;
            img.save(&output)?;
            println!("Saved marker {id} to {}", output.display());
            Ok(())
        }
        Command::InitConfig { path } => {
            cfg.with_resolved_detectors()?.write_json(&path)?;
            println!("Wrote config to {}", path.display());
            Ok(())
        }
    };

    if let Err(e) = outcome {
        match e.downcast_ref::<SourceError>() {
            Some(SourceError::Open { what, reason }) => {
                info!("open failed: {reason}");
                eprintln!("Error: Could not open {what}.");
            }
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<(), Box<dyn Error>> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| format!("invalid log level {level:?}"))?;
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        aruco_watch::core::init_tracing(&level.to_string().to_lowercase(), false);
    }
    #[cfg(not(feature = "tracing"))]
    aruco_watch::core::init_with_level(level).map_err(|e| e.to_string())?;
    Ok(())
}

fn boxed<S: FrameSource + 'static>(source: S) -> Box<dyn FrameSource> {
    Box::new(source)
}

fn apply_common(cfg: &mut RunConfig, common: &CommonArgs) {
    if common.no_preview {
        cfg.preview = Some(false);
    }
    if common.max_frames.is_some() {
        cfg.max_frames = common.max_frames;
    }
    if common.dictionary.is_some() {
        cfg.dictionary = common.dictionary.clone();
    }
}

fn set_log(cfg: &mut RunConfig, log: Option<PathBuf>) {
    if log.is_some() {
        cfg.log_path = log;
    }
}

fn open_preview(cfg: &RunConfig) -> Box<dyn Preview> {
    if !cfg.preview() {
        return Box::new(NoPreview);
    }
    match FfplayPreview::spawn(aruco_watch::preview::WINDOW_TITLE) {
        Ok(p) => Box::new(p),
        Err(e) => {
            warn!("preview unavailable, running headless: {e}");
            Box::new(NoPreview)
        }
    }
}

fn image_mode(cfg: &RunConfig, path: PathBuf, report: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let detector = ArucoDetector::new(cfg.dictionary()?, cfg.detector_params(Mode::Image)?);
    let mut source = StillImageSource::open(&path)?;
    let Some(frame) = source.next_frame()? else {
        return Err(SourceError::open("image", "no frame").into());
    };

    let mut preview = open_preview(cfg);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = run_image(
        &detector,
        frame,
        &cfg.output_image(),
        preview.as_mut(),
        &mut out,
    )?;
    out.flush()?;

    if let Some(report) = report {
        write_report(&report, &result)?;
        info!("wrote detection report to {}", report.display());
    }
    Ok(())
}

fn stream_mode(
    cfg: &RunConfig,
    mode: Mode,
    open: impl FnOnce() -> Result<Box<dyn FrameSource>, SourceError>,
) -> Result<(), Box<dyn Error>> {
    let detector = ArucoDetector::new(cfg.dictionary()?, cfg.detector_params(mode)?);
    let mut source = open()?;
    let mut preview = open_preview(cfg);
    let options = StreamOptions {
        print_frame_counts: cfg.print_frame_counts(mode),
        max_frames: cfg.max_frames,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match cfg.log_path(mode) {
        Some(path) => {
            let mut log = SightingLog::create(&path)?;
            run_stream(
                source.as_mut(),
                &detector,
                &mut log,
                preview.as_mut(),
                options,
                &mut out,
            )?
        }
        None => {
            let mut log = SightingLog::new(io::sink());
            run_stream(
                source.as_mut(),
                &detector,
                &mut log,
                preview.as_mut(),
                options,
                &mut out,
            )?
        }
    };
    out.flush()?;
    info!(
        "processed {} frames, {} distinct markers",
        summary.frames,
        summary.first_sightings.len()
    );
    Ok(())
}
