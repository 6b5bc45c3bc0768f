//! Stream job configuration sourced from environment variables.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Environment keys recognised by [`StreamConfig::from_env`].
pub mod keys {
    pub const VIDEO_URL: &str = "VIDEO_URL";
    pub const OUTPUT_FILE: &str = "OUTPUT_FILE";
    pub const VIDEO_STREAM_QUALITY: &str = "VIDEO_STREAM_QUALITY";
    pub const AUDIO_STREAM_QUALITY: &str = "AUDIO_STREAM_QUALITY";
    pub const OUTPUT_CODEC: &str = "OUTPUT_CODEC";
    pub const AUDIO_CODEC: &str = "AUDIO_CODEC";
    pub const FRAME_LIMIT: &str = "FRAME_LIMIT";
    pub const OUTPUT_VIDEO: &str = "OUTPUT_VIDEO";
    pub const OUTPUT_AUDIO: &str = "OUTPUT_AUDIO";
    pub const VERBOSE: &str = "VERBOSE";
    pub const FFMPEG_BINARY: &str = "FFMPEG_BINARY";
    pub const YTDLP_BINARY: &str = "YTDLP_BINARY";
}

pub const DEFAULT_VIDEO_URL: &str = "https://youtu.be/xvFZjo5PgG0";
pub const DEFAULT_OUTPUT_FILE: &str = "/app/output/vidgear_output.mp4";
pub const DEFAULT_VIDEO_QUALITY: &str = "best";
pub const DEFAULT_AUDIO_QUALITY: &str = "bestaudio";
pub const DEFAULT_OUTPUT_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_OUTPUT_VIDEO: &str = "/app/output/vidgear_video.mp4";
pub const DEFAULT_OUTPUT_AUDIO: &str = "/app/output/vidgear_audio.aac";
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";
pub const DEFAULT_YTDLP_BINARY: &str = "yt-dlp";

/// Errors raised while building a [`StreamConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidFrameLimit { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{first} and {second} point to the same path: {path}")]
    DuplicatePath {
        first: &'static str,
        second: &'static str,
        path: PathBuf,
    },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Immutable description of one capture job.
///
/// Built once before the pipeline starts; the controller only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamConfig {
    /// Remote source locator.
    pub source_url: String,
    /// Requested video quality selector (`best`, `worst`, `720p`, or a raw format).
    pub video_quality: String,
    /// Requested audio quality selector passed to the audio fetcher.
    pub audio_quality: String,
    /// Video encoder identifier.
    pub output_codec: String,
    /// Audio encoder identifier. Informational only; the merge copies audio.
    pub audio_codec: String,
    /// Stop after this many frames; 0 means unbounded.
    pub frame_limit: u64,
    /// Enable verbose output from the underlying tools.
    pub verbose: bool,
    /// Temporary encoded video path.
    pub temp_video: PathBuf,
    /// Temporary fetched audio path.
    pub temp_audio: PathBuf,
    /// Final muxed or copied output path.
    pub output_file: PathBuf,
    /// ffmpeg executable used for decoding, encoding and merging.
    pub ffmpeg_binary: PathBuf,
    /// yt-dlp executable used for stream resolution and audio download.
    pub ytdlp_binary: PathBuf,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_VIDEO_URL.to_string(),
            video_quality: DEFAULT_VIDEO_QUALITY.to_string(),
            audio_quality: DEFAULT_AUDIO_QUALITY.to_string(),
            output_codec: DEFAULT_OUTPUT_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            frame_limit: 0,
            verbose: false,
            temp_video: PathBuf::from(DEFAULT_OUTPUT_VIDEO),
            temp_audio: PathBuf::from(DEFAULT_OUTPUT_AUDIO),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            ffmpeg_binary: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            ytdlp_binary: PathBuf::from(DEFAULT_YTDLP_BINARY),
        }
    }
}

impl StreamConfig {
    /// Load the configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let path = |key: &str, default: &str| PathBuf::from(text(key, default));

        let frame_limit = match lookup(keys::FRAME_LIMIT) {
            Some(raw) => parse_frame_limit(&raw)?,
            None => 0,
        };

        let config = Self {
            source_url: text(keys::VIDEO_URL, DEFAULT_VIDEO_URL),
            video_quality: text(keys::VIDEO_STREAM_QUALITY, DEFAULT_VIDEO_QUALITY),
            audio_quality: text(keys::AUDIO_STREAM_QUALITY, DEFAULT_AUDIO_QUALITY),
            output_codec: text(keys::OUTPUT_CODEC, DEFAULT_OUTPUT_CODEC),
            audio_codec: text(keys::AUDIO_CODEC, DEFAULT_AUDIO_CODEC),
            frame_limit,
            verbose: lookup(keys::VERBOSE)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            temp_video: path(keys::OUTPUT_VIDEO, DEFAULT_OUTPUT_VIDEO),
            temp_audio: path(keys::OUTPUT_AUDIO, DEFAULT_OUTPUT_AUDIO),
            output_file: path(keys::OUTPUT_FILE, DEFAULT_OUTPUT_FILE),
            ffmpeg_binary: path(keys::FFMPEG_BINARY, DEFAULT_FFMPEG_BINARY),
            ytdlp_binary: path(keys::YTDLP_BINARY, DEFAULT_YTDLP_BINARY),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every run relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            (keys::VIDEO_URL, self.source_url.as_str()),
            (keys::VIDEO_STREAM_QUALITY, self.video_quality.as_str()),
            (keys::AUDIO_STREAM_QUALITY, self.audio_quality.as_str()),
            (keys::OUTPUT_CODEC, self.output_codec.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { key });
            }
        }

        let paths = [
            (keys::OUTPUT_VIDEO, self.temp_video.as_path()),
            (keys::OUTPUT_AUDIO, self.temp_audio.as_path()),
            (keys::OUTPUT_FILE, self.output_file.as_path()),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Empty { key });
            }
        }
        for (i, (first, a)) in paths.iter().enumerate() {
            for (second, b) in &paths[i + 1..] {
                if a == b {
                    return Err(ConfigError::DuplicatePath {
                        first: *first,
                        second: *second,
                        path: a.to_path_buf(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether a frame limit is configured.
    pub fn is_frame_limited(&self) -> bool {
        self.frame_limit > 0
    }

    /// Human-readable frame limit for logging.
    pub fn frame_limit_label(&self) -> String {
        if self.is_frame_limited() {
            self.frame_limit.to_string()
        } else {
            "Unlimited".to_string()
        }
    }

    /// Directory of the temporary video file, if it has one.
    pub fn temp_video_dir(&self) -> Option<&Path> {
        non_empty_parent(&self.temp_video)
    }

    /// Directory of the final output file, if it has one.
    pub fn output_dir(&self) -> Option<&Path> {
        non_empty_parent(&self.output_file)
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
        self
    }

    pub fn with_temp_paths(mut self, video: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        self.temp_video = video.into();
        self.temp_audio = audio.into();
        self
    }

    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = limit;
        self
    }

    pub fn with_video_quality(mut self, quality: impl Into<String>) -> Self {
        self.video_quality = quality.into();
        self
    }

    pub fn with_output_codec(mut self, codec: impl Into<String>) -> Self {
        self.output_codec = codec.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn parse_frame_limit(raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidFrameLimit {
            key: keys::FRAME_LIMIT,
            value: raw.to_string(),
        })
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
