//! ImageMagick backend. Delegates scaling to the `convert` executable.
//!
//! Useful where ImageMagick is already deployed and its resampling is
//! preferred. Invocation shape:
//!
//! ```text
//! convert -thumbnail 150x  -quality 90 'source.gif[0]' jpg:/thumbs/.tmpXXXX.jpg   # width fixed
//! convert -thumbnail x150  -quality 90 'source.gif[0]' jpg:/thumbs/.tmpXXXX.jpg   # height fixed
//! ```
//!
//! The `[0]` suffix reads only the first frame. Without it an animated GIF
//! is written as one numbered JPEG per frame and the temp file stays empty.
//! The `jpg:` prefix forces JPEG output regardless of the temp file name.
//! The temp file is renamed onto the requested output only after `convert`
//! exits zero and has written something, so a failed or killed run never
//! leaves a partial thumbnail.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ScaleParams, Side};
use super::rust_backend::probe_dimensions;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Subprocess backend around ImageMagick's `convert`.
pub struct ImageMagickBackend {
    binary: String,
    timeout: Duration,
}

impl ImageMagickBackend {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

/// Geometry argument for `-thumbnail`: `WxH`, `Wx` or `xH`.
fn geometry(width: Side, height: Side) -> Result<String, BackendError> {
    match (width, height) {
        (Side::Px(w), Side::Px(h)) => Ok(format!("{w}x{h}")),
        (Side::Px(w), Side::Auto) => Ok(format!("{w}x")),
        (Side::Auto, Side::Px(h)) => Ok(format!("x{h}")),
        (Side::Auto, Side::Auto) => Err(BackendError::ProcessingFailed(
            "At least one side must be fixed".into(),
        )),
    }
}

/// Build the full argument list for one `convert` run.
fn convert_args(params: &ScaleParams, tmp_output: &Path) -> Result<Vec<String>, BackendError> {
    Ok(vec![
        "-thumbnail".to_string(),
        geometry(params.width, params.height)?,
        "-quality".to_string(),
        params.quality.value().to_string(),
        format!("{}[0]", params.source.display()),
        format!("jpg:{}", tmp_output.display()),
    ])
}

impl ImageMagickBackend {
    /// Spawn `convert` and wait for it, killing it once the timeout elapses.
    ///
    /// Stderr is drained on its own thread while the child runs; a child that
    /// fills the pipe would otherwise block until the timeout.
    fn run(&self, args: &[String]) -> Result<(), BackendError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to run {}: {}", self.binary, e))
            })?;

        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let started = Instant::now();
        let status: ExitStatus = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                // Already-exited races surface as an error from kill; ignore it.
                // The reader thread is left to finish on its own.
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        Err(BackendError::ProcessingFailed(format!(
            "{} exited with {}: {}",
            self.binary,
            status,
            String::from_utf8_lossy(&stderr).trim()
        )))
    }
}

impl ImageBackend for ImageMagickBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        probe_dimensions(path)
    }

    fn scale(&self, params: &ScaleParams) -> Result<(), BackendError> {
        let dir = params
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let tmp = tempfile::Builder::new().suffix(".jpg").tempfile_in(dir)?;
        let args = convert_args(params, tmp.path())?;

        self.run(&args)?;

        if tmp.as_file().metadata()?.len() == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "{} wrote no output for {}",
                self.binary,
                params.source.display()
            )));
        }

        tmp.persist(&params.output)
            .map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}
