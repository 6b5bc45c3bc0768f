//! Typed view of the `yt-dlp -J` metadata document.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{YtDlpError, YtDlpResult};

/// One entry in the `formats` / `requested_formats` lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl FormatInfo {
    /// Whether this format carries a decodable video stream.
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    /// Whether this format carries a decodable audio stream.
    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }
}

/// Metadata of a source, as resolved by yt-dlp.
///
/// When a format is selected, the top-level fields describe that format.
/// Merged selections (`video+audio`) list their parts in `requested_formats`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub selected: FormatInfo,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
    #[serde(default)]
    pub requested_formats: Vec<FormatInfo>,
}

impl MediaInfo {
    /// Parse a `yt-dlp -J` document.
    pub fn from_json(bytes: &[u8]) -> YtDlpResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Whether any available format carries audio.
    pub fn has_audio_track(&self) -> bool {
        self.selected.has_audio() || self.formats.iter().any(FormatInfo::has_audio)
    }

    /// The format that provides the video stream of the selection.
    pub fn video_format(&self) -> YtDlpResult<&FormatInfo> {
        if let Some(part) = self.requested_formats.iter().find(|f| f.has_video()) {
            return Ok(part);
        }
        if self.selected.url.is_some() {
            return Ok(&self.selected);
        }
        Err(YtDlpError::MissingField("video stream url"))
    }

    /// Display label for logs.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("untitled")
    }
}

/// yt-dlp reports missing codecs as `"none"`; unknown codecs are omitted.
fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}
