//! Run stages and the transition rules between them.

use std::fmt;

use serde::Serialize;

/// Stage of a capture run.
///
/// Stages only move forward. `Failed` is reachable from every stage that is
/// not terminal, and both `Finalized` and `Failed` lead to `CleanedUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    AudioProbed,
    AudioFetched,
    StreamOpen,
    WriterOpen,
    Writing,
    Stopped,
    Finalized,
    CleanedUp,
    Failed,
}

impl Stage {
    /// Canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Init => "INIT",
            Stage::AudioProbed => "AUDIO_PROBED",
            Stage::AudioFetched => "AUDIO_FETCHED",
            Stage::StreamOpen => "STREAM_OPEN",
            Stage::WriterOpen => "WRITER_OPEN",
            Stage::Writing => "WRITING",
            Stage::Stopped => "STOPPED",
            Stage::Finalized => "FINALIZED",
            Stage::CleanedUp => "CLEANED_UP",
            Stage::Failed => "FAILED",
        }
    }

    /// Phase title used in log output when entering the stage.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Init => "Init",
            Stage::AudioProbed => "Audio discovery",
            Stage::AudioFetched => "Audio download",
            Stage::StreamOpen => "Stream setup",
            Stage::WriterOpen => "Writer setup",
            Stage::Writing => "Frame processing",
            Stage::Stopped => "Shutdown",
            Stage::Finalized => "Mux",
            Stage::CleanedUp => "Cleanup",
            Stage::Failed => "Failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::CleanedUp)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        use Stage::*;

        match (*self, next) {
            (Failed, CleanedUp) => true,
            (Failed, _) | (CleanedUp, _) => false,
            (_, Failed) => true,
            (Init, AudioProbed)
            | (AudioProbed, AudioFetched)
            | (AudioProbed, StreamOpen)
            | (AudioFetched, StreamOpen)
            | (StreamOpen, WriterOpen)
            | (WriterOpen, Writing)
            | (Writing, Stopped)
            | (Stopped, Finalized)
            | (Finalized, CleanedUp) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
