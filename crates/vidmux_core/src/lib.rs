//! vidmux core - stream capture, re-encode and audio mux pipeline
//!
//! This crate contains the pipeline logic with zero CLI concerns.
//! The `vidmux` binary wires the subprocess-backed collaborators into the
//! lifecycle controller.

pub mod audio;
pub mod config;
pub mod logging;
pub mod mux;
pub mod orchestrator;
pub mod process;
pub mod sink;
pub mod source;
pub mod ytdlp;

#[cfg(test)]
mod test_support;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
