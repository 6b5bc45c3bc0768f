//! vidmux - capture a remote video stream, re-encode it and mux in its audio.
//!
//! Configuration is read from the environment (`VIDEO_URL`, `OUTPUT_FILE`,
//! `FRAME_LIMIT`, ...); see `vidmux_core::config::keys` for the full list.
//!
//! Exit codes: 0 on success or interrupt, 1 on any fatal failure.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use vidmux_core::audio::YtDlpAudioFetcher;
use vidmux_core::config::StreamConfig;
use vidmux_core::logging::{init_tracing, LogConfig, LogLevel, RunLoggerBuilder};
use vidmux_core::orchestrator::{
    install_signal_handlers, CancelHandle, Components, LifecycleController,
};
use vidmux_core::sink::FfmpegFrameSink;
use vidmux_core::source::FfmpegFrameSource;
use vidmux_core::ytdlp::YtDlp;

fn main() -> Result<ExitCode> {
    let config = StreamConfig::from_env().context("Invalid configuration")?;

    init_tracing(if config.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let cancel = CancelHandle::new();
    install_signal_handlers(&cancel).context("Failed to install signal handlers")?;

    let logger = RunLoggerBuilder::new("vidmux")
        .config(LogConfig::for_verbosity(config.verbose))
        .build();
    logger.info(&format!("vidmux {}", vidmux_core::version()));

    let ytdlp = || YtDlp::new(config.ytdlp_binary.clone(), Arc::clone(&logger));
    let components = Components {
        source: Box::new(FfmpegFrameSource::new(
            config.ffmpeg_binary.clone(),
            ytdlp(),
            Arc::clone(&logger),
        )),
        sink: Box::new(FfmpegFrameSink::new(
            config.ffmpeg_binary.clone(),
            Arc::clone(&logger),
        )),
        audio: Box::new(YtDlpAudioFetcher::new(ytdlp(), config.verbose)),
    };

    let report = LifecycleController::new(config, components, logger, cancel).run();
    tracing::debug!(
        frames = report.frame_count,
        stages = ?report.stages,
        "Run finished"
    );

    Ok(ExitCode::from(report.exit_code()))
}
