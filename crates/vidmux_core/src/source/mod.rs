//! Frame source: frame-by-frame read access to a remote video stream.

mod ffmpeg;

pub use ffmpeg::FfmpegFrameSource;

use crate::orchestrator::StageResult;

/// Frame rate used when the source does not report one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// One decoded video frame, packed BGR24.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel of the packed BGR24 layout.
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// Size in bytes of a frame with the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }
}

/// Metadata learned when the stream is opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetadata {
    /// Reported frame rate, if any.
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StreamMetadata {
    /// Frame rate to encode at: the reported one when usable, else the default.
    pub fn effective_frame_rate(&self) -> f64 {
        match self.frame_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            _ => DEFAULT_FRAME_RATE,
        }
    }
}

/// Result of a blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    Frame(Frame),
    /// Clean end of stream.
    End,
}

/// A remote stream that yields decoded frames in display order.
pub trait FrameSource {
    /// Connect to `locator` at the requested quality.
    fn open(&mut self, locator: &str, quality: &str) -> StageResult<StreamMetadata>;

    /// Block until the next frame or the end of the stream.
    ///
    /// Errors only on unrecoverable connection failure.
    fn read(&mut self) -> StageResult<FrameRead>;

    /// Release the connection. Safe to call repeatedly or before `open`.
    fn stop(&mut self);
}
