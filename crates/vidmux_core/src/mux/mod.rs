//! Muxing of the captured video with the fetched audio track.
//!
//! # Architecture
//!
//! - **options_builder**: Builds the literal ffmpeg merge argument vector
//! - **finalize**: Decides between merging and copying the video as-is

mod finalize;
mod options_builder;

pub use finalize::{finalize, MuxOutcome, MuxPlan};
pub use options_builder::MergeOptionsBuilder;
