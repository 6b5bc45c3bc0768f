//! Frame sink: local encoder for the captured frames.

mod ffmpeg;

pub use ffmpeg::FfmpegFrameSink;

use std::path::Path;

use crate::orchestrator::StageResult;
use crate::source::Frame;

/// Ordered writer of frames into a locally encoded video file.
pub trait FrameSink {
    /// Prepare an encoder writing to `destination`.
    fn open(&mut self, destination: &Path, frame_rate: f64, codec: &str) -> StageResult<()>;

    /// Append one frame. Frames are encoded in call order.
    fn write(&mut self, frame: &Frame) -> StageResult<()>;

    /// Flush and finalize the output file. Idempotent.
    fn close(&mut self) -> StageResult<()>;

    /// Run the external merge tool with a literal argument list.
    fn run_merge_command(&mut self, args: &[String]) -> StageResult<()>;
}
