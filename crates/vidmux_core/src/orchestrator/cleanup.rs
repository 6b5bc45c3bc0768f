//! Removal of temporary artifacts and reporting on the final one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::logging::RunLogger;

/// A temporary file that could not be removed. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

/// The output file left behind by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl FinalArtifact {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// What cleanup did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Temporary files that existed and were removed.
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
    /// The final output, if it exists.
    pub final_artifact: Option<FinalArtifact>,
}

/// Remove `temporaries` and inspect `final_path`.
///
/// Missing files are skipped silently and failures become warnings, so this
/// can run any number of times, whatever state the run ended in.
pub fn clean_up(temporaries: &[&Path], final_path: &Path, logger: &RunLogger) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in temporaries {
        match fs::remove_file(path) {
            Ok(()) => {
                logger.debug(&format!("Removed {}", path.display()));
                report.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                logger.warn(&format!("Could not remove {}: {}", path.display(), e));
                report.warnings.push(CleanupWarning {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    report.final_artifact = fs::metadata(final_path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| FinalArtifact {
            path: final_path.to_path_buf(),
            size_bytes: m.len(),
        });

    match &report.final_artifact {
        Some(artifact) => logger.success(&format!(
            "Output: {} ({:.2} MB)",
            artifact.path.display(),
            artifact.size_mb()
        )),
        None => logger.warn(&format!("Output {} was not created", final_path.display())),
    }

    report
}
