//! Core types for the capture run.

use serde::Serialize;

use super::cleanup::CleanupReport;
use super::errors::{PipelineError, StageError, StageResult};
use super::stage::Stage;
use crate::mux::MuxOutcome;
use crate::source::DEFAULT_FRAME_RATE;

/// Outcome of a stage that may degrade instead of failing.
///
/// `Degraded` carries a usable fallback value plus the reason it was used;
/// `Fatal` aborts the run.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Ok(T),
    Degraded { value: T, reason: String },
    Fatal(StageError),
}

impl<T> StageOutcome<T> {
    /// Treat an error as degraded, substituting `fallback`.
    pub fn degrade_on_error(result: StageResult<T>, fallback: T) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Degraded {
                value: fallback,
                reason: e.to_string(),
            },
        }
    }

    /// Treat an error as fatal.
    pub fn fatal_on_error(result: StageResult<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Fatal(e),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Collapse into a result; degraded values count as success.
    pub fn into_result(self) -> StageResult<T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Ok(value),
            Self::Fatal(e) => Err(e),
        }
    }
}

/// Mutable state of one run, owned by the controller.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    stage: Stage,
    /// Every stage reached, in order.
    history: Vec<Stage>,
    /// Frame rate used for encoding.
    pub frame_rate: f64,
    /// Frames written so far.
    pub frame_count: u64,
    /// Whether the source has an audio track.
    pub has_audio: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Init,
            history: vec![Stage::Init],
            frame_rate: DEFAULT_FRAME_RATE,
            frame_count: 0,
            has_audio: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Move to `next` if the transition is allowed.
    ///
    /// Returns false and leaves the state unchanged otherwise.
    pub fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_advance_to(next) {
            return false;
        }
        self.stage = next;
        self.history.push(next);
        true
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the frame loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopEnd {
    EndOfStream,
    FrameLimit,
    Cancelled,
    /// Unrecoverable read error, treated as the end of the stream.
    ReadError(String),
}

/// Result of a whole run.
#[derive(Debug)]
pub struct RunReport {
    /// How the final artifact was produced, or why the run stopped.
    pub outcome: Result<MuxOutcome, PipelineError>,
    /// Why the frame loop ended, if it ran.
    pub loop_end: Option<LoopEnd>,
    pub frame_count: u64,
    pub frame_rate: f64,
    pub has_audio: bool,
    /// Stages reached, in order.
    pub stages: Vec<Stage>,
    pub cleanup: CleanupReport,
}

impl RunReport {
    /// Process exit code: 0 on success or interrupt, 1 on a fatal error.
    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            Ok(_) => 0,
            Err(e) if e.is_cancelled() => 0,
            Err(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrade_keeps_fallback_and_reason() {
        let outcome = StageOutcome::degrade_on_error(
            Err(StageError::audio_fetch("network unreachable")),
            false,
        );
        assert!(outcome.is_degraded());
        match outcome {
            StageOutcome::Degraded { value, reason } => {
                assert!(!value);
                assert!(reason.contains("network unreachable"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn fatal_surfaces_the_error() {
        let outcome: StageOutcome<()> =
            StageOutcome::fatal_on_error(Err(StageError::audio_fetch("403")));
        assert!(matches!(outcome.into_result(), Err(StageError::AudioFetch(_))));

        let ok = StageOutcome::fatal_on_error(Ok(5));
        assert_eq!(ok.into_result().unwrap(), 5);
    }

    #[test]
    fn session_rejects_invalid_transitions() {
        let mut state = SessionState::new();
        assert_eq!(state.frame_rate, 30.0);

        assert!(!state.advance(Stage::Writing));
        assert_eq!(state.stage(), Stage::Init);

        assert!(state.advance(Stage::AudioProbed));
        assert!(state.advance(Stage::StreamOpen));
        assert!(state.advance(Stage::Failed));
        assert!(!state.advance(Stage::WriterOpen));
        assert!(state.advance(Stage::CleanedUp));

        assert_eq!(
            state.history(),
            [
                Stage::Init,
                Stage::AudioProbed,
                Stage::StreamOpen,
                Stage::Failed,
                Stage::CleanedUp
            ]
        );
    }

    #[test]
    fn exit_codes() {
        let report = |outcome| RunReport {
            outcome,
            loop_end: None,
            frame_count: 0,
            frame_rate: 30.0,
            has_audio: false,
            stages: Vec::new(),
            cleanup: CleanupReport::default(),
        };

        assert_eq!(report(Ok(MuxOutcome::Copied)).exit_code(), 0);
        assert_eq!(
            report(Err(PipelineError::cancelled(Stage::StreamOpen))).exit_code(),
            0
        );
        assert_eq!(
            report(Err(PipelineError::stage_failed(
                Stage::Finalized,
                StageError::merge("exit 1")
            )))
            .exit_code(),
            1
        );
    }
}
