//! Per-run logger injected into every pipeline component.
//!
//! Each run gets one logger that:
//! - Forwards every line to `tracing`
//! - Sends lines to an optional callback
//! - Throttles frame progress lines
//! - Maintains a tail buffer of external tool output for error diagnosis

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Logger shared by the controller and its collaborators.
pub struct RunLogger {
    /// Run name, attached to every tracing event.
    run_name: String,
    /// Logging configuration.
    config: LogConfig,
    /// Callback for embedders and tests.
    callback: Mutex<Option<LogCallback>>,
    /// Recent external tool output.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl RunLogger {
    /// Create a new run logger.
    pub fn new(
        run_name: impl Into<String>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        let capacity = config.error_tail;
        Self {
            run_name: run_name.into(),
            config,
            callback: Mutex::new(callback),
            tail_buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Whether debug output is enabled.
    pub fn is_verbose(&self) -> bool {
        self.config.level <= LogLevel::Debug
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        self.emit(level, message);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log frame progress, throttled to `progress_interval`.
    ///
    /// Returns true if a line was logged.
    pub fn frame_progress(&self, frames: u64) -> bool {
        let interval = self.config.progress_interval;
        if interval == 0 || frames == 0 || frames % interval != 0 {
            return false;
        }

        self.info(&format!("Processed {} frames...", frames));
        true
    }

    /// Record a line of external tool output.
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.log(LogLevel::Debug, &format!("{}{}", prefix, line));
    }

    /// Show the tail buffer (typically after a tool failed).
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }

        self.emit(LogLevel::Error, &format!("[{}/tail]", header));
        for line in lines {
            self.emit(LogLevel::Error, &line);
        }
    }

    /// Clear the tail buffer.
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    fn emit(&self, level: LogLevel, message: &str) {
        let run = self.run_name.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(run = %run, "{}", message),
            LogLevel::Debug => tracing::debug!(run = %run, "{}", message),
            LogLevel::Info => tracing::info!(run = %run, "{}", message),
            LogLevel::Warn => tracing::warn!(run = %run, "{}", message),
            LogLevel::Error => tracing::error!(run = %run, "{}", message),
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(&self.format_message(message));
        }
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }
}

/// Builder for creating a shared `RunLogger`.
pub struct RunLoggerBuilder {
    run_name: String,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl RunLoggerBuilder {
    /// Create a new builder.
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    /// Set the logging configuration.
    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the callback.
    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Build the logger, ready to be shared between components.
    pub fn build(self) -> Arc<RunLogger> {
        Arc::new(RunLogger::new(self.run_name, self.config, self.callback))
    }
}
