use super::{FrameSource, SourceError};
use image::codecs::pnm::PnmDecoder;
use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Last lines of ffmpeg's stderr kept for open errors.
const STDERR_TAIL_LINES: usize = 8;

/// What `ffmpeg` should read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoInput {
    File(PathBuf),
    /// Capture device index (`/dev/videoN` on Linux).
    Webcam(u32),
    /// Screen grab. `None` picks the primary display.
    Screen { display: Option<String> },
}

impl VideoInput {
    /// Noun used in open errors.
    pub fn kind(&self) -> &'static str {
        match self {
            VideoInput::File(_) => "video",
            VideoInput::Webcam(_) => "webcam",
            VideoInput::Screen { .. } => "screen",
        }
    }

    fn describe(&self) -> String {
        match self {
            VideoInput::File(p) => format!("video {}", p.display()),
            VideoInput::Webcam(i) => format!("webcam {i}"),
            VideoInput::Screen { display: Some(d) } => format!("screen {d}"),
            VideoInput::Screen { display: None } => "screen".to_string(),
        }
    }

    /// Demuxer and input arguments for the current platform.
    fn input_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            VideoInput::File(path) => {
                args.push("-i".into());
                args.push(path.clone().into_os_string());
            }
            VideoInput::Webcam(index) => {
                let (format, device) = webcam_device(*index);
                args.extend(demuxer_args(format, device));
            }
            VideoInput::Screen { display } => {
                let (format, device) = screen_device(display.as_deref());
                args.extend(demuxer_args(format, device));
            }
        }
        args
    }
}

fn demuxer_args(format: &str, device: String) -> [OsString; 4] {
    [
        OsString::from("-f"),
        OsString::from(format),
        OsString::from("-i"),
        OsString::from(device),
    ]
}

#[cfg(target_os = "linux")]
fn webcam_device(index: u32) -> (&'static str, String) {
    ("v4l2", format!("/dev/video{index}"))
}

#[cfg(target_os = "macos")]
fn webcam_device(index: u32) -> (&'static str, String) {
    ("avfoundation", format!("{index}:none"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn webcam_device(index: u32) -> (&'static str, String) {
    ("vfwcap", index.to_string())
}

#[cfg(target_os = "linux")]
fn screen_device(display: Option<&str>) -> (&'static str, String) {
    let display = display
        .map(str::to_string)
        .or_else(|| std::env::var("DISPLAY").ok())
        .unwrap_or_else(|| ":0.0".to_string());
    ("x11grab", display)
}

#[cfg(target_os = "macos")]
fn screen_device(display: Option<&str>) -> (&'static str, String) {
    let display = display.unwrap_or("Capture screen 0");
    ("avfoundation", format!("{display}:none"))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn screen_device(display: Option<&str>) -> (&'static str, String) {
    ("gdigrab", display.unwrap_or("desktop").to_string())
}

/// Frames decoded by an `ffmpeg` child process writing a PPM image2pipe
/// stream to its stdout.
pub struct FfmpegSource {
    input: VideoInput,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<Vec<String>>>,
    first: Option<RgbImage>,
}

impl FfmpegSource {
    /// Start `ffmpeg` from `PATH` on `input`.
    pub fn open(input: VideoInput) -> Result<Self, SourceError> {
        Self::open_with("ffmpeg", input)
    }

    /// Start the given ffmpeg binary on `input` and wait for the first frame.
    ///
    /// Missing video files fail before anything is spawned. A child that
    /// exits without producing a frame is reported with the tail of its
    /// stderr.
    pub fn open_with(program: impl Into<OsString>, input: VideoInput) -> Result<Self, SourceError> {
        let what = input.kind();
        if let VideoInput::File(path) = &input {
            if !path.is_file() {
                return Err(SourceError::open(
                    what,
                    format!("{} does not exist", path.display()),
                ));
            }
        }

        let program = program.into();
        let mut cmd = Command::new(&program);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"])
            .args(input.input_args())
            .args(["-f", "image2pipe", "-vcodec", "ppm", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("spawning {cmd:?}");

        let mut child = cmd.spawn().map_err(|e| {
            SourceError::open(what, format!("failed to start {}: {e}", program.to_string_lossy()))
        })?;

        let Some(stdout) = child.stdout.take() else {
            kill(&mut child);
            return Err(SourceError::open(what, "ffmpeg stdout unavailable"));
        };
        let stderr = child.stderr.take().map(spawn_stderr_drain);

        let mut source = Self {
            input,
            child,
            stdout: BufReader::new(stdout),
            stderr,
            first: None,
        };

        match read_ppm_frame(&mut source.stdout) {
            Ok(Some(frame)) => {
                info!(
                    "{} opened ({}x{})",
                    source.input.describe(),
                    frame.width(),
                    frame.height()
                );
                source.first = Some(frame);
                Ok(source)
            }
            Ok(None) => Err(source.failed_open("no frames")),
            Err(e) => Err(source.failed_open(e)),
        }
    }

    fn failed_open(mut self, fallback: impl ToString) -> SourceError {
        kill(&mut self.child);
        let tail = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let reason = if tail.is_empty() {
            fallback.to_string()
        } else {
            tail.join("; ")
        };
        SourceError::open(self.input.kind(), reason)
    }
}

fn kill(child: &mut Child) {
    // The child may already be gone; both calls fail harmlessly then.
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_stderr_drain<R: Read + Send + 'static>(stderr: R) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut tail = Vec::new();
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            warn!("ffmpeg: {line}");
            if tail.len() == STDERR_TAIL_LINES {
                tail.remove(0);
            }
            tail.push(line);
        }
        tail
    })
}

impl FrameSource for FfmpegSource {
    fn describe(&self) -> String {
        self.input.describe()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        if let Some(frame) = self.first.take() {
            return Ok(Some(frame));
        }
        read_ppm_frame(&mut self.stdout)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        kill(&mut self.child);
    }
}

/// Read the next image of a concatenated PNM stream (ffmpeg's `ppm`
/// image2pipe output) as RGB.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new header.
pub fn read_ppm_frame<R: BufRead>(reader: &mut R) -> Result<Option<RgbImage>, SourceError> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }
    let decoder = PnmDecoder::new(&mut *reader)?;
    Ok(Some(DynamicImage::from_decoder(decoder)?.to_rgb8()))
}
