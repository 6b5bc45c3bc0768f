//! Lifecycle controller that drives one capture run end to end.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::cancel::CancelHandle;
use super::cleanup::{clean_up, CleanupReport};
use super::errors::{PipelineError, PipelineResult, StageError};
use super::frame_loop::pump_frames;
use super::stage::Stage;
use super::types::{LoopEnd, RunReport, SessionState, StageOutcome};
use crate::audio::AudioFetcher;
use crate::config::StreamConfig;
use crate::logging::RunLogger;
use crate::mux::{finalize, MuxOutcome, MuxPlan};
use crate::sink::FrameSink;
use crate::source::FrameSource;
use crate::ytdlp::partial_path;

/// The collaborators a run drives.
pub struct Components {
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn FrameSink>,
    pub audio: Box<dyn AudioFetcher>,
}

/// Sequences the stages of a run.
///
/// `run` consumes the controller, so the stages and the cleanup that
/// follows them happen exactly once. Stage order:
///
/// ```text
/// INIT -> AUDIO_PROBED -> [AUDIO_FETCHED] -> STREAM_OPEN -> WRITER_OPEN
///      -> WRITING -> STOPPED -> FINALIZED -> CLEANED_UP
/// ```
///
/// Any fatal error moves to FAILED, from which only cleanup follows.
pub struct LifecycleController {
    config: StreamConfig,
    components: Components,
    logger: Arc<RunLogger>,
    cancel: CancelHandle,
    state: SessionState,
    loop_end: Option<LoopEnd>,
    /// Source stopped and sink closed.
    released: bool,
}

impl LifecycleController {
    pub fn new(
        config: StreamConfig,
        components: Components,
        logger: Arc<RunLogger>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            config,
            components,
            logger,
            cancel,
            state: SessionState::new(),
            loop_end: None,
            released: false,
        }
    }

    /// Get a cancellation handle for this run.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run every stage, then clean up whatever the outcome.
    pub fn run(mut self) -> RunReport {
        let outcome = self.execute();

        self.release();

        if let Err(e) = &outcome {
            if e.is_cancelled() {
                self.logger.warn(&e.to_string());
            } else {
                self.logger.error(&e.to_string());
            }
            self.enter(Stage::Failed);
        }

        self.logger.phase(Stage::CleanedUp.title());
        let partial_audio = partial_path(&self.config.temp_audio);
        let cleanup = clean_up(
            &[
                self.config.temp_video.as_path(),
                self.config.temp_audio.as_path(),
                partial_audio.as_path(),
            ],
            &self.config.output_file,
            &self.logger,
        );
        self.enter(Stage::CleanedUp);

        match &outcome {
            Ok(MuxOutcome::Merged) => self.logger.success("Run complete: video and audio merged"),
            Ok(MuxOutcome::Copied) => self.logger.success("Run complete: video only"),
            Err(_) => {}
        }

        RunReport {
            outcome,
            loop_end: self.loop_end,
            frame_count: self.state.frame_count,
            frame_rate: self.state.frame_rate,
            has_audio: self.state.has_audio,
            stages: self.state.history().to_vec(),
            cleanup,
        }
    }

    fn execute(&mut self) -> PipelineResult<MuxOutcome> {
        self.log_start();
        self.config.validate().map_err(|e| {
            PipelineError::stage_failed(Stage::Init, StageError::invalid_config(e.to_string()))
        })?;

        self.discover_audio()?;
        self.open_stream()?;
        self.open_writer()?;
        self.write_frames()?;

        self.logger.phase(Stage::Finalized.title());
        let audio = self.state.has_audio.then(|| self.config.temp_audio.as_path());
        let plan = MuxPlan {
            video: &self.config.temp_video,
            audio,
            output: &self.config.output_file,
        };
        let outcome = finalize(&plan, self.components.sink.as_mut(), &self.logger)
            .map_err(|e| PipelineError::stage_failed(Stage::Finalized, e))?;
        self.enter(Stage::Finalized);

        Ok(outcome)
    }

    /// INIT -> AUDIO_PROBED [-> AUDIO_FETCHED]
    fn discover_audio(&mut self) -> PipelineResult<()> {
        self.check_cancelled(Stage::AudioProbed)?;
        self.logger.phase(Stage::AudioProbed.title());

        let url = &self.config.source_url;
        let probe = StageOutcome::degrade_on_error(self.components.audio.probe(url), false);
        if let StageOutcome::Degraded { reason, .. } = &probe {
            self.logger
                .warn(&format!("Audio probe failed, continuing without audio: {}", reason));
        }
        let has_audio = probe
            .into_result()
            .map_err(|e| PipelineError::stage_failed(Stage::AudioProbed, e))?;
        self.state.has_audio = has_audio;
        self.enter(Stage::AudioProbed);

        if !has_audio {
            self.logger.info("No audio track found, output will be video only");
            return Ok(());
        }

        self.check_cancelled(Stage::AudioFetched)?;
        self.logger.phase(Stage::AudioFetched.title());
        let fetched = StageOutcome::fatal_on_error(self.components.audio.fetch(
            &self.config.source_url,
            &self.config.audio_quality,
            &self.config.temp_audio,
        ));
        fetched
            .into_result()
            .map_err(|e| PipelineError::stage_failed(Stage::AudioFetched, e))?;

        self.logger.success(&format!(
            "Audio saved to {}",
            self.config.temp_audio.display()
        ));
        self.enter(Stage::AudioFetched);
        Ok(())
    }

    /// -> STREAM_OPEN
    fn open_stream(&mut self) -> PipelineResult<()> {
        self.check_cancelled(Stage::StreamOpen)?;
        self.logger.phase(Stage::StreamOpen.title());

        let metadata = self
            .components
            .source
            .open(&self.config.source_url, &self.config.video_quality)
            .map_err(|e| PipelineError::stage_failed(Stage::StreamOpen, e))?;

        self.state.frame_rate = metadata.effective_frame_rate();
        match metadata.frame_rate {
            Some(_) => self
                .logger
                .info(&format!("Frame rate: {}", self.state.frame_rate)),
            None => self.logger.warn(&format!(
                "Source reports no frame rate, using {}",
                self.state.frame_rate
            )),
        }
        self.enter(Stage::StreamOpen);
        Ok(())
    }

    /// -> WRITER_OPEN
    fn open_writer(&mut self) -> PipelineResult<()> {
        self.check_cancelled(Stage::WriterOpen)?;
        self.logger.phase(Stage::WriterOpen.title());

        for dir in [self.config.temp_video_dir(), self.config.output_dir()]
            .into_iter()
            .flatten()
        {
            create_dir(dir).map_err(|e| PipelineError::stage_failed(Stage::WriterOpen, e))?;
        }

        self.components
            .sink
            .open(
                &self.config.temp_video,
                self.state.frame_rate,
                &self.config.output_codec,
            )
            .map_err(|e| PipelineError::stage_failed(Stage::WriterOpen, e))?;
        self.enter(Stage::WriterOpen);
        Ok(())
    }

    /// -> WRITING -> STOPPED
    ///
    /// The source is stopped and the sink closed however the loop ends.
    fn write_frames(&mut self) -> PipelineResult<()> {
        self.check_cancelled(Stage::Writing)?;
        self.logger.phase(Stage::Writing.title());
        self.enter(Stage::Writing);

        let pumped = pump_frames(
            self.components.source.as_mut(),
            self.components.sink.as_mut(),
            self.config.frame_limit,
            &self.cancel,
            &self.logger,
            &mut self.state.frame_count,
        );

        self.logger.phase(Stage::Stopped.title());
        self.components.source.stop();
        let closed = self.components.sink.close();
        self.released = true;

        let end = match (pumped, closed) {
            (Err(write_err), closed) => {
                if let Err(close_err) = closed {
                    self.logger
                        .warn(&format!("Encoder close after failed write: {}", close_err));
                }
                return Err(PipelineError::stage_failed(Stage::Writing, write_err));
            }
            (Ok(_), Err(close_err)) => {
                return Err(PipelineError::stage_failed(Stage::Stopped, close_err));
            }
            (Ok(end), Ok(())) => end,
        };

        self.logger.info(&format!(
            "Wrote {} frames ({})",
            self.state.frame_count,
            describe_end(&end)
        ));
        self.loop_end = Some(end);
        self.enter(Stage::Stopped);
        Ok(())
    }

    /// Stop the source and close the sink if the loop never got to.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.components.source.stop();
        if let Err(e) = self.components.sink.close() {
            self.logger.warn(&format!("Encoder close: {}", e));
        }
    }

    fn check_cancelled(&self, next: Stage) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::cancelled(next));
        }
        Ok(())
    }

    fn enter(&mut self, next: Stage) {
        let from = self.state.stage();
        if self.state.advance(next) {
            self.logger.debug(&format!("Stage {} -> {}", from, next));
        } else {
            self.logger
                .warn(&format!("Ignoring invalid stage transition {} -> {}", from, next));
        }
    }

    fn log_start(&self) {
        self.logger.section(&format!("Source: {}", self.config.source_url));
        self.logger.info(&format!(
            "Video quality: {}, audio quality: {}, codec: {}",
            self.config.video_quality, self.config.audio_quality, self.config.output_codec
        ));
        self.logger
            .info(&format!("Frame limit: {}", self.config.frame_limit_label()));
        self.logger
            .info(&format!("Output: {}", self.config.output_file.display()));

        match serde_json::to_string(&self.config) {
            Ok(json) => self.logger.debug(&format!("Config: {}", json)),
            Err(e) => self.logger.debug(&format!("Config not serializable: {}", e)),
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), StageError> {
    fs::create_dir_all(dir)
        .map_err(|e| StageError::io(format!("creating directory {}", dir.display()), e))
}

fn describe_end(end: &LoopEnd) -> String {
    match end {
        LoopEnd::EndOfStream => "end of stream".to_string(),
        LoopEnd::FrameLimit => "frame limit reached".to_string(),
        LoopEnd::Cancelled => "interrupted".to_string(),
        LoopEnd::ReadError(e) => format!("read error: {}", e),
    }
}
