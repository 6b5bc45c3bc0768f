//! ffmpeg merge command options builder.
//!
//! The argument order is fixed: existing deployments match on it.

use std::path::Path;

/// Builder for the merge command tokens.
pub struct MergeOptionsBuilder<'a> {
    video: &'a Path,
    audio: &'a Path,
    output: &'a Path,
}

impl<'a> MergeOptionsBuilder<'a> {
    pub fn new(video: &'a Path, audio: &'a Path, output: &'a Path) -> Self {
        Self {
            video,
            audio,
            output,
        }
    }

    /// Build the complete argument vector, without the program name.
    ///
    /// Both streams are copied, video is taken from the first input and
    /// audio from the second, and the output stops at the shorter one.
    pub fn build(&self) -> Vec<String> {
        let mut tokens = vec!["-y".to_string()];

        for input in [self.video, self.audio] {
            tokens.push("-i".to_string());
            tokens.push(input.to_string_lossy().to_string());
        }

        tokens.extend(
            [
                "-c:v", "copy", "-c:a", "copy", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        tokens.push(self.output.to_string_lossy().to_string());
        tokens
    }
}
