//! Error types for the capture pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Stage → Operation → Detail

use std::io;

use thiserror::Error;

use super::stage::Stage;

/// Top-level pipeline error with stage context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage failed; the run is aborted and only cleanup remains.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// An interrupt arrived before the frame loop started.
    #[error("Run was cancelled before stage '{stage}'")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    /// Create a stage failed error.
    pub fn stage_failed(stage: Stage, source: StageError) -> Self {
        Self::StageFailed { stage, source }
    }

    /// Create a cancelled error.
    pub fn cancelled(stage: Stage) -> Self {
        Self::Cancelled { stage }
    }

    /// The stage the error is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::StageFailed { stage, .. } | Self::Cancelled { stage } => *stage,
        }
    }

    /// The underlying stage error, if any.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            Self::StageFailed { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }

    /// Whether this is an orderly interrupt rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Error raised by a pipeline component.
#[derive(Error, Debug)]
pub enum StageError {
    /// Invalid or missing required input.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The stream could not be opened or read.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// An audio track was detected but could not be retrieved.
    #[error("Audio fetch failed: {0}")]
    AudioFetch(String),

    /// Writer setup or frame write failed.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The merge tool failed or an expected input was missing.
    #[error("Merge failed: {0}")]
    Merge(String),

    /// An external command failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a source unavailable error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create an audio fetch error.
    pub fn audio_fetch(message: impl Into<String>) -> Self {
        Self::AudioFetch(message.into())
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    /// Create a merge error.
    pub fn merge(message: impl Into<String>) -> Self {
        Self::Merge(message.into())
    }

    /// Create a command failed error.
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
