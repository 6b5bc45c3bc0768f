//! yt-dlp wrapper used to resolve remote sources.
//!
//! Both the frame source (direct media URL, frame rate, dimensions) and the
//! audio fetcher (format listing, audio download) go through this wrapper.

mod info;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use thiserror::Error;

pub use info::{FormatInfo, MediaInfo};

use crate::logging::RunLogger;
use crate::process::{isolate_from_terminal, last_line, render_command};

/// Errors from running yt-dlp.
#[derive(Error, Debug)]
pub enum YtDlpError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp exited with code {exit_code}: {message}")]
    Failed { exit_code: i32, message: String },

    #[error("failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("yt-dlp output has no {0}")]
    MissingField(&'static str),
}

/// Result type for yt-dlp operations.
pub type YtDlpResult<T> = Result<T, YtDlpError>;

/// Partial file yt-dlp leaves next to `destination` when run without `--no-part`.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Translate a stream quality selector into a yt-dlp format expression.
///
/// `best`/`worst` pick the best/worst video-bearing format, `<N>p` caps the
/// height at N, anything else is passed through as a raw format expression.
pub fn video_format_selector(quality: &str) -> String {
    let quality = quality.trim();
    match quality.to_ascii_lowercase().as_str() {
        "best" => "bestvideo/best".to_string(),
        "worst" => "worstvideo/worst".to_string(),
        q => match q.strip_suffix('p').and_then(|h| h.parse::<u32>().ok()) {
            Some(height) => format!("bestvideo[height<={h}]/best[height<={h}]", h = height),
            None => quality.to_string(),
        },
    }
}

/// Runs the yt-dlp executable.
pub struct YtDlp {
    binary: PathBuf,
    logger: Arc<RunLogger>,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, logger: Arc<RunLogger>) -> Self {
        Self {
            binary: binary.into(),
            logger,
        }
    }

    /// Arguments for a metadata dump without downloading.
    pub fn info_args(locator: &str, format: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(format) = format {
            args.push("-f".to_string());
            args.push(format.to_string());
        }
        args.push(locator.to_string());
        args
    }

    /// Arguments for downloading one format to a literal destination path.
    pub fn download_args(locator: &str, format: &str, destination: &Path, verbose: bool) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format.to_string(),
            "-o".to_string(),
            destination.display().to_string(),
            "--no-playlist".to_string(),
            "--force-overwrites".to_string(),
            "--no-part".to_string(),
        ];
        if !verbose {
            args.push("--quiet".to_string());
            args.push("--no-warnings".to_string());
        }
        args.push(locator.to_string());
        args
    }

    /// Dump the metadata of a source, optionally resolved against a format.
    pub fn dump_info(&self, locator: &str, format: Option<&str>) -> YtDlpResult<MediaInfo> {
        let args = Self::info_args(locator, format);
        let output = self.run(&args)?;
        MediaInfo::from_json(&output)
    }

    /// Download one format of a source to `destination`.
    pub fn download(
        &self,
        locator: &str,
        format: &str,
        destination: &Path,
        verbose: bool,
    ) -> YtDlpResult<()> {
        let args = Self::download_args(locator, format, destination, verbose);
        self.run(&args).map(|_| ())
    }

    fn run(&self, args: &[String]) -> YtDlpResult<Vec<u8>> {
        self.logger.command(&render_command(&self.binary, args));

        let mut command = Command::new(&self.binary);
        command.args(args).stdin(Stdio::null());
        isolate_from_terminal(&mut command);

        let output = command.output().map_err(|source| YtDlpError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            self.logger.output_line(line, true);
        }

        if !output.status.success() {
            return Err(YtDlpError::Failed {
                exit_code: output.status.code().unwrap_or(-1),
                message: last_line(&output.stderr),
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RunLoggerBuilder;

    #[test]
    fn maps_quality_selectors() {
        assert_eq!(video_format_selector("best"), "bestvideo/best");
        assert_eq!(video_format_selector("WORST"), "worstvideo/worst");
        assert_eq!(
            video_format_selector("720p"),
            "bestvideo[height<=720]/best[height<=720]"
        );
        assert_eq!(video_format_selector("137+140"), "137+140");
        assert_eq!(video_format_selector("hdp"), "hdp");
    }

    #[test]
    fn info_args_shape() {
        let args = YtDlp::info_args("https://youtu.be/x", Some("bestvideo/best"));
        assert_eq!(
            args,
            [
                "-J",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "-f",
                "bestvideo/best",
                "https://youtu.be/x"
            ]
        );
    }

    #[test]
    fn download_args_are_quiet_unless_verbose() {
        let dest = Path::new("/tmp/audio.aac");
        let quiet = YtDlp::download_args("u", "bestaudio", dest, false);
        assert!(quiet.contains(&"--quiet".to_string()));
        assert_eq!(&quiet[..4], ["-f", "bestaudio", "-o", "/tmp/audio.aac"]);
        assert_eq!(quiet.last().map(String::as_str), Some("u"));

        let verbose = YtDlp::download_args("u", "bestaudio", dest, true);
        assert!(!verbose.contains(&"--quiet".to_string()));
    }

    #[test]
    fn downloads_write_the_destination_directly() {
        let args = YtDlp::download_args("u", "bestaudio", Path::new("/tmp/audio.aac"), false);
        assert!(args.contains(&"--no-part".to_string()));
        assert_eq!(
            partial_path(Path::new("/tmp/audio.aac")),
            PathBuf::from("/tmp/audio.aac.part")
        );
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let ytdlp = YtDlp::new(
            "/nonexistent/yt-dlp",
            RunLoggerBuilder::new("ytdlp").build(),
        );
        let err = ytdlp.dump_info("https://example.com", None).unwrap_err();
        assert!(matches!(err, YtDlpError::Spawn { .. }));
    }
}
