//! Frame sink that pipes raw frames into an ffmpeg encoder.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::FrameSink;
use crate::logging::RunLogger;
use crate::orchestrator::{StageError, StageResult};
use crate::process::{
    drain_stderr, isolate_from_terminal, join_stderr, last_line, render_command, tool_available,
};
use crate::source::Frame;

/// Settings recorded by `open`.
struct Target {
    destination: PathBuf,
    frame_rate: f64,
    codec: String,
}

/// Running ffmpeg encoder.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Option<String>>>,
    width: u32,
    height: u32,
}

/// Encodes frames with an ffmpeg child reading raw BGR24 on stdin.
///
/// The encoder is started on the first frame, since raw input needs the
/// frame dimensions up front.
pub struct FfmpegFrameSink {
    ffmpeg: PathBuf,
    logger: Arc<RunLogger>,
    target: Option<Target>,
    encoder: Option<Encoder>,
    frames_written: u64,
}

impl FfmpegFrameSink {
    pub fn new(ffmpeg: impl Into<PathBuf>, logger: Arc<RunLogger>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            logger,
            target: None,
            encoder: None,
            frames_written: 0,
        }
    }

    /// Number of frames handed to the encoder since `open`.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Build the ffmpeg arguments for encoding raw frames read from stdin.
    pub fn encode_args(
        width: u32,
        height: u32,
        frame_rate: f64,
        codec: &str,
        destination: &Path,
    ) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "bgr24".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-framerate".to_string(),
            frame_rate.to_string(),
            "-i".to_string(),
            "-".to_string(),
            "-c:v".to_string(),
            codec.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            destination.display().to_string(),
        ]
    }

    fn start_encoder(&mut self, width: u32, height: u32) -> StageResult<()> {
        let Some(target) = self.target.as_ref() else {
            return Err(StageError::encoding("writer is not open"));
        };

        let args = Self::encode_args(
            width,
            height,
            target.frame_rate,
            &target.codec,
            &target.destination,
        );
        self.logger.command(&render_command(&self.ffmpeg, &args));

        let mut command = Command::new(&self.ffmpeg);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        isolate_from_terminal(&mut command);

        let mut child = command.spawn().map_err(|e| {
            StageError::encoding(format!("failed to start {}: {}", self.ffmpeg.display(), e))
        })?;
        let stdin = child.stdin.take();
        let stderr = child
            .stderr
            .take()
            .map(|s| drain_stderr(s, Arc::clone(&self.logger)));

        self.encoder = Some(Encoder {
            child,
            stdin,
            stderr,
            width,
            height,
        });
        Ok(())
    }
}

impl FrameSink for FfmpegFrameSink {
    fn open(&mut self, destination: &Path, frame_rate: f64, codec: &str) -> StageResult<()> {
        if !tool_available(&self.ffmpeg, "-version") {
            return Err(StageError::encoding(format!(
                "encoder '{}' is not available",
                self.ffmpeg.display()
            )));
        }
        if codec.trim().is_empty() {
            return Err(StageError::encoding("no video codec configured"));
        }

        self.logger.info(&format!(
            "Writing {} at {} fps to {}",
            codec,
            frame_rate,
            destination.display()
        ));
        self.target = Some(Target {
            destination: destination.to_path_buf(),
            frame_rate,
            codec: codec.to_string(),
        });
        self.frames_written = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> StageResult<()> {
        if frame.data.len() != Frame::byte_len(frame.width, frame.height) {
            return Err(StageError::encoding(format!(
                "frame has {} bytes, expected {} for {}x{}",
                frame.data.len(),
                Frame::byte_len(frame.width, frame.height),
                frame.width,
                frame.height
            )));
        }

        if self.encoder.is_none() {
            self.start_encoder(frame.width, frame.height)?;
        }
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(StageError::encoding("encoder is not running"));
        };

        if (frame.width, frame.height) != (encoder.width, encoder.height) {
            return Err(StageError::encoding(format!(
                "frame size changed from {}x{} to {}x{}",
                encoder.width, encoder.height, frame.width, frame.height
            )));
        }

        let Some(stdin) = encoder.stdin.as_mut() else {
            return Err(StageError::encoding("encoder input is closed"));
        };
        stdin
            .write_all(&frame.data)
            .map_err(|e| StageError::encoding(format!("writing frame: {}", e)))?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> StageResult<()> {
        self.target = None;
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };

        // EOF on stdin lets the encoder flush and write the trailer
        drop(encoder.stdin.take());
        let status = encoder
            .child
            .wait()
            .map_err(|e| StageError::io("waiting for encoder", e))?;
        let last = join_stderr(encoder.stderr.take());

        if !status.success() {
            self.logger.show_tail("ffmpeg");
            return Err(StageError::encoding(format!(
                "encoder exited with {}: {}",
                status,
                last.unwrap_or_else(|| "no output".to_string())
            )));
        }

        self.logger
            .debug(&format!("Encoder finished after {} frames", self.frames_written));
        Ok(())
    }

    fn run_merge_command(&mut self, args: &[String]) -> StageResult<()> {
        self.logger.command(&render_command(&self.ffmpeg, args));

        let mut command = Command::new(&self.ffmpeg);
        command.args(args).stdin(Stdio::null());
        isolate_from_terminal(&mut command);

        let output = command
            .output()
            .map_err(|e| StageError::io("running merge command", e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            self.logger.output_line(line, false);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            self.logger.output_line(line, true);
        }

        if !output.status.success() {
            self.logger.show_tail("ffmpeg merge");
            return Err(StageError::command_failed(
                "ffmpeg",
                output.status.code().unwrap_or(-1),
                last_line(&output.stderr),
            ));
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            self.logger.warn(&format!("Encoder shutdown on drop: {}", e));
        }
    }
}
