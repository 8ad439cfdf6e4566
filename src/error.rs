use std::io;
use std::path::{Path, PathBuf};

/// Failures that stop processing of a single calculation unit
///
/// None of these abort a sweep: the aggregator logs them against the unit and moves on to the
/// next directory. Scheduler failures are a [`crate::slurm::queue::QueueError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("can't access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error in {}: {reason}", path.display())]
    Configuration { path: PathBuf, reason: String },

    #[error("stage {current} is beyond the last stage {max} of {}", path.display())]
    InvalidStage {
        path: PathBuf,
        current: usize,
        max: usize,
    },
}

impl UnitError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        UnitError::Io { path: path.to_path_buf(), source }
    }

    pub fn configuration(path: &Path, reason: impl Into<String>) -> Self {
        UnitError::Configuration { path: path.to_path_buf(), reason: reason.into() }
    }

    /// File or directory the error is about
    pub fn path(&self) -> &Path {
        match self {
            UnitError::Io { path, .. }
            | UnitError::Configuration { path, .. }
            | UnitError::InvalidStage { path, .. } => path,
        }
    }
}
