//! Audio fetcher: discovers and downloads the separate audio track.

mod ytdlp;

pub use ytdlp::YtDlpAudioFetcher;

use std::path::Path;

use crate::orchestrator::StageResult;

/// Probes a source for audio and retrieves it to a local file.
pub trait AudioFetcher {
    /// Whether the source offers any decodable audio track. Never downloads.
    fn probe(&self, locator: &str) -> StageResult<bool>;

    /// Download only the audio track at `quality` to `destination`.
    fn fetch(&self, locator: &str, quality: &str, destination: &Path) -> StageResult<()>;
}
