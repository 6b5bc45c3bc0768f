//! Configuration for a capture run.
//!
//! All options come from environment variables with documented defaults;
//! see [`keys`] for the recognised names.
//!
//! # Example
//!
//! ```no_run
//! use vidmux_core::config::StreamConfig;
//!
//! let config = StreamConfig::from_env().unwrap().with_frame_limit(300);
//! println!("Output: {}", config.output_file.display());
//! ```

mod stream;

pub use stream::{keys, ConfigError, ConfigResult, StreamConfig};
