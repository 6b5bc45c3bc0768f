//! Scripted collaborators for tests.
//!
//! All mocks record into one shared `Journal`, so tests can assert on the
//! order in which the controller called them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::AudioFetcher;
use crate::logging::{LogConfig, RunLogger, RunLoggerBuilder};
use crate::orchestrator::{CancelHandle, StageError, StageResult};
use crate::sink::FrameSink;
use crate::source::{Frame, FrameRead, FrameSource, StreamMetadata};
use crate::ytdlp::partial_path;

/// A collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Probe,
    Fetch,
    SourceOpen,
    Read,
    SourceStop,
    SinkOpen { frame_rate: f64 },
    /// Tag byte of the written frame.
    Write(u8),
    SinkClose,
    Merge(Vec<String>),
}

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn merges(&self) -> Vec<Vec<String>> {
        self.0
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Merge(args) => Some(args.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Logger whose lines are collected, without timestamps.
pub(crate) fn test_logger() -> (Arc<RunLogger>, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let logger = RunLoggerBuilder::new("test")
        .config(LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        })
        .callback(Box::new(move |line| sink.lock().push(line.to_string())))
        .build();
    (logger, lines)
}

/// Source yielding `available` tiny frames tagged 1, 2, 3, ...
pub(crate) struct ScriptedSource {
    journal: Journal,
    available: u64,
    produced: u64,
    frame_rate: Option<f64>,
    fail_open: bool,
    fail_read_at: Option<u64>,
    cancel_after: Option<(u64, CancelHandle)>,
}

impl ScriptedSource {
    pub fn new(journal: &Journal, available: u64) -> Self {
        Self {
            journal: journal.clone(),
            available,
            produced: 0,
            frame_rate: Some(25.0),
            fail_open: false,
            fail_read_at: None,
            cancel_after: None,
        }
    }

    pub fn with_frame_rate(mut self, rate: Option<f64>) -> Self {
        self.frame_rate = rate;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail the read that would yield frame `produced + 1`.
    pub fn failing_read_at(mut self, produced: u64) -> Self {
        self.fail_read_at = Some(produced);
        self
    }

    /// Trigger `cancel` right after yielding the `frames`-th frame.
    pub fn cancel_after(mut self, frames: u64, cancel: &CancelHandle) -> Self {
        self.cancel_after = Some((frames, cancel.clone()));
        self
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self, _locator: &str, _quality: &str) -> StageResult<StreamMetadata> {
        self.journal.record(Call::SourceOpen);
        if self.fail_open {
            return Err(StageError::source_unavailable("HTTP Error 404"));
        }
        Ok(StreamMetadata {
            frame_rate: self.frame_rate,
            width: Some(2),
            height: Some(2),
        })
    }

    fn read(&mut self) -> StageResult<FrameRead> {
        self.journal.record(Call::Read);
        if self.fail_read_at == Some(self.produced) {
            return Err(StageError::source_unavailable("connection reset"));
        }
        if self.produced >= self.available {
            return Ok(FrameRead::End);
        }

        self.produced += 1;
        if let Some((after, cancel)) = &self.cancel_after {
            if *after == self.produced {
                cancel.cancel();
            }
        }
        let tag = self.produced as u8;
        Ok(FrameRead::Frame(Frame::new(2, 2, vec![tag; Frame::byte_len(2, 2)])))
    }

    fn stop(&mut self) {
        self.journal.record(Call::SourceStop);
    }
}

/// How the scripted sink answers a merge command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeScript {
    /// Write the video bytes followed by the audio bytes to the output.
    Concatenate,
    /// Exit non-zero.
    Fail,
    /// Exit zero without writing anything.
    NoOutput,
}

/// Sink that "encodes" by concatenating frame bytes, written on close.
pub(crate) struct RecordingSink {
    journal: Journal,
    destination: Option<PathBuf>,
    encoded: Arc<Mutex<Vec<u8>>>,
    written: u64,
    fail_write_at: Option<u64>,
    merge: MergeScript,
}

impl RecordingSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            destination: None,
            encoded: Arc::new(Mutex::new(Vec::new())),
            written: 0,
            fail_write_at: None,
            merge: MergeScript::Concatenate,
        }
    }

    /// Fail the write after `written` frames succeeded.
    pub fn failing_write_at(mut self, written: u64) -> Self {
        self.fail_write_at = Some(written);
        self
    }

    pub fn with_merge(mut self, merge: MergeScript) -> Self {
        self.merge = merge;
        self
    }

    /// Bytes the sink writes to its destination on close.
    pub fn encoded_bytes(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.encoded)
    }
}

impl FrameSink for RecordingSink {
    fn open(&mut self, destination: &Path, frame_rate: f64, _codec: &str) -> StageResult<()> {
        self.journal.record(Call::SinkOpen { frame_rate });
        self.destination = Some(destination.to_path_buf());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> StageResult<()> {
        self.journal.record(Call::Write(frame.data[0]));
        if self.fail_write_at == Some(self.written) {
            return Err(StageError::encoding("Broken pipe"));
        }
        self.encoded.lock().extend_from_slice(&frame.data);
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> StageResult<()> {
        self.journal.record(Call::SinkClose);
        let Some(destination) = self.destination.take() else {
            return Ok(());
        };
        if self.written > 0 {
            fs::write(&destination, &*self.encoded.lock())
                .map_err(|e| StageError::io("writing encoded video", e))?;
        }
        Ok(())
    }

    fn run_merge_command(&mut self, args: &[String]) -> StageResult<()> {
        self.journal.record(Call::Merge(args.to_vec()));
        match self.merge {
            MergeScript::Fail => Err(StageError::command_failed("ffmpeg", 1, "Invalid data")),
            MergeScript::NoOutput => Ok(()),
            MergeScript::Concatenate => {
                let read = |i: usize| {
                    fs::read(&args[i]).map_err(|e| StageError::io("reading merge input", e))
                };
                let mut merged = read(2)?;
                merged.extend(read(4)?);
                let output = args.last().map(String::as_str).unwrap_or_default();
                fs::write(output, merged).map_err(|e| StageError::io("writing merge output", e))
            }
        }
    }
}

/// Probe behaviour of the scripted audio fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeScript {
    Present,
    Absent,
    /// Probe itself fails.
    Unreachable,
}

/// Audio fetcher that writes a small file on success and a partial one on failure.
pub(crate) struct ScriptedAudio {
    journal: Journal,
    probe: ProbeScript,
    fetch_ok: bool,
}

impl ScriptedAudio {
    pub fn new(journal: &Journal, probe: ProbeScript) -> Self {
        Self {
            journal: journal.clone(),
            probe,
            fetch_ok: true,
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fetch_ok = false;
        self
    }
}

impl AudioFetcher for ScriptedAudio {
    fn probe(&self, _locator: &str) -> StageResult<bool> {
        self.journal.record(Call::Probe);
        match self.probe {
            ProbeScript::Present => Ok(true),
            ProbeScript::Absent => Ok(false),
            ProbeScript::Unreachable => Err(StageError::audio_fetch("network unreachable")),
        }
    }

    fn fetch(&self, _locator: &str, _quality: &str, destination: &Path) -> StageResult<()> {
        self.journal.record(Call::Fetch);
        // yt-dlp creates missing output directories itself
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| StageError::io("creating audio dir", e))?;
        }
        if !self.fetch_ok {
            // an aborted download leaves partial bytes behind
            fs::write(partial_path(destination), b"AUD")
                .map_err(|e| StageError::io("writing partial audio", e))?;
            return Err(StageError::audio_fetch("HTTP Error 403"));
        }
        fs::write(destination, b"AUDIO").map_err(|e| StageError::io("writing audio", e))
    }
}
