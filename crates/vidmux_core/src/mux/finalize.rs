//! Produce the final artifact: merge with audio, or copy the video as-is.

use std::fs;
use std::path::Path;

use serde::Serialize;

use super::options_builder::MergeOptionsBuilder;
use crate::logging::RunLogger;
use crate::orchestrator::{StageError, StageResult};
use crate::sink::FrameSink;

/// How the final artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxOutcome {
    /// Video and audio were merged by the external tool.
    Merged,
    /// No audio track; the video was copied to the final path.
    Copied,
}

/// Inputs of the finalize step.
#[derive(Debug, Clone, Copy)]
pub struct MuxPlan<'a> {
    /// Closed temporary video file.
    pub video: &'a Path,
    /// Fetched audio file, present only when the source had audio.
    pub audio: Option<&'a Path>,
    /// Final output path.
    pub output: &'a Path,
}

/// Create the final artifact from the temporary ones.
///
/// Must only be called once the video file is closed and the audio
/// decision is made.
pub fn finalize(
    plan: &MuxPlan<'_>,
    sink: &mut dyn FrameSink,
    logger: &RunLogger,
) -> StageResult<MuxOutcome> {
    if !plan.video.is_file() {
        return Err(StageError::merge(format!(
            "temporary video {} does not exist",
            plan.video.display()
        )));
    }

    if let Some(parent) = plan.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StageError::io("creating output directory", e))?;
    }

    let Some(audio) = plan.audio else {
        logger.info("No audio track, copying video to output");
        fs::copy(plan.video, plan.output)
            .map_err(|e| StageError::io("copying video to output", e))?;
        return Ok(MuxOutcome::Copied);
    };

    if !audio.is_file() {
        return Err(StageError::merge(format!(
            "expected audio {} does not exist",
            audio.display()
        )));
    }

    logger.section("Merging audio and video");
    let args = MergeOptionsBuilder::new(plan.video, audio, plan.output).build();
    sink.run_merge_command(&args)
        .map_err(|e| StageError::merge(e.to_string()))?;

    if !plan.output.is_file() {
        return Err(StageError::merge(format!(
            "merge finished but {} was not created",
            plan.output.display()
        )));
    }

    Ok(MuxOutcome::Merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_logger, Call, Journal, MergeScript, RecordingSink};
    use std::path::PathBuf;

    struct Paths {
        _dir: tempfile::TempDir,
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
    }

    fn paths() -> Paths {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        let audio = dir.path().join("audio.aac");
        let output = dir.path().join("out").join("final.mp4");
        Paths {
            _dir: dir,
            video,
            audio,
            output,
        }
    }

    #[test]
    fn copies_video_when_there_is_no_audio() {
        let p = paths();
        fs::write(&p.video, b"VIDEO-BYTES").unwrap();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: None,
            output: &p.output,
        };
        let outcome = finalize(&plan, &mut sink, &logger).unwrap();

        assert_eq!(outcome, MuxOutcome::Copied);
        assert_eq!(fs::read(&p.output).unwrap(), b"VIDEO-BYTES");
        assert_eq!(journal.count(|c| matches!(c, Call::Merge(_))), 0);
    }

    #[test]
    fn merges_when_audio_exists() {
        let p = paths();
        fs::write(&p.video, b"V").unwrap();
        fs::write(&p.audio, b"A").unwrap();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: Some(&p.audio),
            output: &p.output,
        };
        let outcome = finalize(&plan, &mut sink, &logger).unwrap();

        assert_eq!(outcome, MuxOutcome::Merged);
        assert_eq!(fs::read(&p.output).unwrap(), b"VA");
        let merges = journal.merges();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0][0], "-y");
        assert_eq!(merges[0].last(), Some(&p.output.to_string_lossy().to_string()));
    }

    #[test]
    fn missing_video_is_a_merge_error() {
        let p = paths();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: None,
            output: &p.output,
        };
        let err = finalize(&plan, &mut sink, &logger).unwrap_err();

        assert!(matches!(err, StageError::Merge(_)));
        assert!(!p.output.exists());
    }

    #[test]
    fn missing_audio_is_a_merge_error() {
        let p = paths();
        fs::write(&p.video, b"V").unwrap();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: Some(&p.audio),
            output: &p.output,
        };
        let err = finalize(&plan, &mut sink, &logger).unwrap_err();

        assert!(matches!(err, StageError::Merge(_)));
        assert!(journal.merges().is_empty());
    }

    #[test]
    fn merge_tool_failure_is_a_merge_error() {
        let p = paths();
        fs::write(&p.video, b"V").unwrap();
        fs::write(&p.audio, b"A").unwrap();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal).with_merge(MergeScript::Fail);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: Some(&p.audio),
            output: &p.output,
        };
        let err = finalize(&plan, &mut sink, &logger).unwrap_err();

        assert!(matches!(err, StageError::Merge(ref m) if m.contains("exit code 1")));
    }

    #[test]
    fn merge_without_output_is_a_merge_error() {
        let p = paths();
        fs::write(&p.video, b"V").unwrap();
        fs::write(&p.audio, b"A").unwrap();
        let journal = Journal::default();
        let mut sink = RecordingSink::new(&journal).with_merge(MergeScript::NoOutput);
        let (logger, _) = test_logger();

        let plan = MuxPlan {
            video: &p.video,
            audio: Some(&p.audio),
            output: &p.output,
        };
        assert!(matches!(
            finalize(&plan, &mut sink, &logger),
            Err(StageError::Merge(_))
        ));
    }
}
