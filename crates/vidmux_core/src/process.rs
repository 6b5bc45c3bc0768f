//! Shared helpers for the external tools (ffmpeg, yt-dlp).

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::logging::RunLogger;

/// Render a command line for logging.
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Check if a tool can be executed with the given version flag.
pub fn tool_available(program: &Path, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Keep a child out of the terminal's foreground process group.
///
/// Ctrl+C then only reaches this process, which shuts children down in order.
pub fn isolate_from_terminal(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// Drain a child's stderr on a helper thread into the logger's tail buffer.
///
/// The returned handle yields the last line seen, for error messages.
pub fn drain_stderr<R>(stderr: R, logger: Arc<RunLogger>) -> JoinHandle<Option<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut last = None;
        for line in BufReader::new(stderr).lines() {
            let Ok(line) = line else { break };
            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            logger.output_line(&line, true);
            last = Some(line);
        }
        last
    })
}

/// Join a stderr drain thread, tolerating a panicked reader.
pub fn join_stderr(handle: Option<JoinHandle<Option<String>>>) -> Option<String> {
    handle.and_then(|h| h.join().ok().flatten())
}

/// Pick the most useful line of tool output for an error message.
pub fn last_line(text: &[u8]) -> String {
    String::from_utf8_lossy(text)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("unknown error")
        .to_string()
}
