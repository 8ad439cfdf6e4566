use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

/// Scheduler states that mean the job is done with its directory
static FINISHED_STATES: [&str; 2] = ["COMPLETING", "COMPLETED"];

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Live status of one working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    /// Pending, running or any other unfinished state, with the state reported by squeue
    Active(String),
    /// Completing, completed, or not in the queue at all
    Inactive,
}

/// Snapshot of the scheduler queue, keyed by job working directory
///
/// Rebuilt on every sweep and never persisted.
#[derive(Debug, Clone, Default)]
pub struct QueueRecord {
    jobs: HashMap<PathBuf, String>,
}

impl QueueRecord {
    /// Parse `squeue -o "%Z %T"` output
    ///
    /// The first line is the column header. squeue may echo the format quotes, so they're removed
    /// before splitting each row into a directory and a state.
    pub fn parse(output: &str) -> QueueRecord {
        let jobs = output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let line = line.replace('"', "");
                let mut fields = line.split_whitespace();
                match (fields.next(), fields.next()) {
                    (Some(dir), Some(state)) => Some((PathBuf::from(dir), state.to_string())),
                    _ => None,
                }
            })
            .collect();
        QueueRecord { jobs }
    }

    pub fn status(&self, path: &Path) -> QueueStatus {
        match self.jobs.get(path) {
            Some(state) if !FINISHED_STATES.contains(&state.as_str()) => QueueStatus::Active(state.clone()),
            _ => QueueStatus::Inactive,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Something that can list the scheduler queue
pub trait QueueSource {
    /// Raw queue listing, header line first
    fn query(&self) -> Result<String, QueueError>;
}

/// Queue listing from the SLURM `squeue` command
pub struct Squeue {
    pub command: String,
}

impl QueueSource for Squeue {
    fn query(&self) -> Result<String, QueueError> {
        let mut squeue = Command::new(&self.command);
        let cmd = squeue.args(["-o", "%Z %T"]);
        info!("Running squeue process");
        debug!("{:?}", &cmd);

        let output = cmd.output().map_err(|source| QueueError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(QueueError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Query the scheduler once and classify every listed directory
pub fn resolve(source: &dyn QueueSource) -> Result<QueueRecord, QueueError> {
    let record = QueueRecord::parse(&source.query()?);
    info!("{} jobs in the scheduler queue", record.len());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    static LISTING: &str = "\"WORK_DIR STATE\"\n\
                            \"/scratch/wf/Fe2O3/relax RUNNING\"\n\
                            \"/scratch/wf/Fe2O3/static PENDING\"\n\
                            \"/scratch/wf/NiO/relax COMPLETING\"\n\
                            \"/scratch/wf/NiO/static COMPLETED\"\n";

    struct Listing(&'static str);

    impl QueueSource for Listing {
        fn query(&self) -> Result<String, QueueError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn classifies_queue_rows() {
        let record = resolve(&Listing(LISTING)).unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(
            record.status(Path::new("/scratch/wf/Fe2O3/relax")),
            QueueStatus::Active("RUNNING".to_string())
        );
        assert_eq!(
            record.status(Path::new("/scratch/wf/Fe2O3/static")),
            QueueStatus::Active("PENDING".to_string())
        );
        assert_eq!(record.status(Path::new("/scratch/wf/NiO/relax")), QueueStatus::Inactive);
        assert_eq!(record.status(Path::new("/scratch/wf/NiO/static")), QueueStatus::Inactive);
    }

    #[test]
    fn absent_directories_are_inactive() {
        let record = QueueRecord::parse("WORK_DIR STATE\n");
        assert!(record.is_empty());
        assert_eq!(record.status(Path::new("/scratch/elsewhere")), QueueStatus::Inactive);
    }

    #[test]
    fn missing_squeue_is_an_error() {
        let squeue = Squeue { command: "/nonexistent/squeue".to_string() };
        assert!(matches!(resolve(&squeue), Err(QueueError::Spawn { .. })));
    }
}
