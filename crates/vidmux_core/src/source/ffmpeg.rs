//! Frame source backed by yt-dlp (URL resolution) and ffmpeg (decoding).
//!
//! yt-dlp resolves the locator into a direct media URL plus the stream's
//! frame rate and dimensions. ffmpeg then decodes that URL to packed BGR24
//! on stdout, which is read one frame at a time.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{Frame, FrameRead, FrameSource, StreamMetadata};
use crate::logging::RunLogger;
use crate::orchestrator::{StageError, StageResult};
use crate::process::{drain_stderr, isolate_from_terminal, join_stderr, render_command};
use crate::ytdlp::{video_format_selector, YtDlp};

/// Largest accepted frame edge, in pixels.
const MAX_DIMENSION: u32 = 16_384;

/// Running ffmpeg decoder.
struct Decoder {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<Option<String>>>,
    width: u32,
    height: u32,
    frames_read: u64,
}

/// Remote stream decoded by an ffmpeg child process.
pub struct FfmpegFrameSource {
    ffmpeg: PathBuf,
    ytdlp: YtDlp,
    logger: Arc<RunLogger>,
    decoder: Option<Decoder>,
}

impl FfmpegFrameSource {
    pub fn new(ffmpeg: impl Into<PathBuf>, ytdlp: YtDlp, logger: Arc<RunLogger>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ytdlp,
            logger,
            decoder: None,
        }
    }

    /// Build the ffmpeg arguments that decode `url` to raw BGR24 on stdout.
    pub fn decode_args(url: &str, headers: &BTreeMap<String, String>) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if !headers.is_empty() {
            let joined: String = headers
                .iter()
                .map(|(name, value)| format!("{}: {}\r\n", name, value))
                .collect();
            args.push("-headers".to_string());
            args.push(joined);
        }

        args.extend(
            ["-i", url, "-an", "-f", "rawvideo", "-pix_fmt", "bgr24", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    /// Reap the decoder after its stdout hit EOF.
    fn finish(&mut self, partial: usize) -> StageResult<FrameRead> {
        let Some(mut decoder) = self.decoder.take() else {
            return Ok(FrameRead::End);
        };

        let status = decoder.child.wait();
        let last = join_stderr(decoder.stderr.take());

        if partial > 0 {
            self.logger
                .debug(&format!("Discarded {} bytes of a truncated frame", partial));
        }

        match status {
            Ok(status) if !status.success() && decoder.frames_read == 0 => {
                self.logger.show_tail("ffmpeg");
                Err(StageError::source_unavailable(format!(
                    "decoder exited with {} before the first frame: {}",
                    status,
                    last.unwrap_or_else(|| "no output".to_string())
                )))
            }
            Ok(status) => {
                if !status.success() {
                    self.logger
                        .warn(&format!("Decoder exited with {} after end of stream", status));
                }
                self.logger
                    .debug(&format!("End of stream after {} frames", decoder.frames_read));
                Ok(FrameRead::End)
            }
            Err(e) => Err(StageError::io("waiting for decoder", e)),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self, locator: &str, quality: &str) -> StageResult<StreamMetadata> {
        self.stop();

        let format = video_format_selector(quality);
        let info = self
            .ytdlp
            .dump_info(locator, Some(&format))
            .map_err(|e| StageError::source_unavailable(format!("{}: {}", locator, e)))?;
        let video = info
            .video_format()
            .map_err(|e| StageError::source_unavailable(e.to_string()))?;

        let url = video
            .url
            .as_deref()
            .ok_or_else(|| StageError::source_unavailable("resolved format has no URL"))?;
        let (width, height) = checked_dimensions(
            video.width.or(info.selected.width),
            video.height.or(info.selected.height),
        )?;
        let frame_rate = video.fps.or(info.selected.fps);

        self.logger.info(&format!(
            "Resolved '{}' to {}x{} @ {}",
            info.label(),
            width,
            height,
            frame_rate.map_or_else(|| "unknown fps".to_string(), |r| format!("{:.3} fps", r))
        ));

        let args = Self::decode_args(url, &video.http_headers);
        self.logger.command(&render_command(&self.ffmpeg, &args));

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_from_terminal(&mut command);

        let mut child = command.spawn().map_err(|e| {
            StageError::source_unavailable(format!(
                "failed to start {}: {}",
                self.ffmpeg.display(),
                e
            ))
        })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StageError::source_unavailable("decoder stdout was not captured"));
        };
        let stderr = child
            .stderr
            .take()
            .map(|s| drain_stderr(s, Arc::clone(&self.logger)));

        self.decoder = Some(Decoder {
            child,
            stdout,
            stderr,
            width,
            height,
            frames_read: 0,
        });

        Ok(StreamMetadata {
            frame_rate,
            width: Some(width),
            height: Some(height),
        })
    }

    fn read(&mut self) -> StageResult<FrameRead> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(StageError::source_unavailable("stream is not open"));
        };

        let mut data = vec![0u8; Frame::byte_len(decoder.width, decoder.height)];
        let filled = fill_frame(&mut decoder.stdout, &mut data)
            .map_err(|e| StageError::source_unavailable(format!("frame read failed: {}", e)))?;

        if filled < data.len() {
            return self.finish(filled);
        }

        decoder.frames_read += 1;
        Ok(FrameRead::Frame(Frame::new(decoder.width, decoder.height, data)))
    }

    fn stop(&mut self) {
        let Some(mut decoder) = self.decoder.take() else {
            return;
        };

        if let Err(e) = decoder.child.kill() {
            // Already exited
            self.logger.debug(&format!("Decoder kill: {}", e));
        }
        let _ = decoder.child.wait();
        join_stderr(decoder.stderr.take());
        self.logger
            .debug(&format!("Decoder stopped after {} frames", decoder.frames_read));
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read until `buf` is full or the reader hits EOF.
///
/// Returns the number of bytes read; less than `buf.len()` means EOF.
fn fill_frame<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Frame size the decoder buffers are sized from.
fn checked_dimensions(width: Option<u32>, height: Option<u32>) -> StageResult<(u32, u32)> {
    match (width, height) {
        (Some(w), Some(h)) if w == 0 || h == 0 => Err(StageError::source_unavailable(format!(
            "stream dimensions {}x{} are empty",
            w, h
        ))),
        (Some(w), Some(h)) if w > MAX_DIMENSION || h > MAX_DIMENSION => {
            Err(StageError::source_unavailable(format!(
                "stream dimensions {}x{} exceed {} pixels",
                w, h, MAX_DIMENSION
            )))
        }
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(StageError::source_unavailable("stream dimensions are unknown")),
    }
}
