//! Lifecycle orchestration of a capture run.
//!
//! A run is a strictly linear sequence of stages driven by the
//! `LifecycleController`. Collaborators are injected as trait objects
//! together with a shared `RunLogger` and a `CancelHandle`.
//!
//! # Architecture
//!
//! ```text
//! LifecycleController
//!     ├── AudioFetcher: probe, then fetch if audio exists
//!     ├── FrameSource: open, then read until end / limit / interrupt
//!     ├── FrameSink: open, write each frame, close
//!     ├── Mux: merge with audio, or copy the video as-is
//!     └── Cleanup: remove temporaries, report the final artifact
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vidmux_core::orchestrator::{CancelHandle, Components, LifecycleController};
//!
//! let components = Components { source, sink, audio };
//! let report = LifecycleController::new(config, components, logger, CancelHandle::new()).run();
//! std::process::exit(report.exit_code().into());
//! ```

mod cancel;
mod cleanup;
mod controller;
mod errors;
mod frame_loop;
mod stage;
mod types;

pub use cancel::{install_signal_handlers, CancelHandle};
pub use cleanup::{clean_up, CleanupReport, CleanupWarning, FinalArtifact};
pub use controller::{Components, LifecycleController};
pub use errors::{PipelineError, PipelineResult, StageError, StageResult};
pub use frame_loop::pump_frames;
pub use stage::Stage;
pub use types::{LoopEnd, RunReport, SessionState, StageOutcome};
