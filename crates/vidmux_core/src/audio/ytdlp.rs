//! yt-dlp backed audio fetcher.

use std::path::Path;

use super::AudioFetcher;
use crate::orchestrator::{StageError, StageResult};
use crate::ytdlp::YtDlp;

/// Audio discovery and download through yt-dlp.
pub struct YtDlpAudioFetcher {
    ytdlp: YtDlp,
    verbose: bool,
}

impl YtDlpAudioFetcher {
    pub fn new(ytdlp: YtDlp, verbose: bool) -> Self {
        Self { ytdlp, verbose }
    }
}

impl AudioFetcher for YtDlpAudioFetcher {
    fn probe(&self, locator: &str) -> StageResult<bool> {
        let info = self
            .ytdlp
            .dump_info(locator, None)
            .map_err(|e| StageError::audio_fetch(format!("probing {}: {}", locator, e)))?;
        Ok(info.has_audio_track())
    }

    fn fetch(&self, locator: &str, quality: &str, destination: &Path) -> StageResult<()> {
        self.ytdlp
            .download(locator, quality, destination, self.verbose)
            .map_err(|e| StageError::audio_fetch(format!("downloading {}: {}", locator, e)))?;

        if !destination.is_file() {
            return Err(StageError::audio_fetch(format!(
                "download finished but {} was not created",
                destination.display()
            )));
        }
        Ok(())
    }
}
