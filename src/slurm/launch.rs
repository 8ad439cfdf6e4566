use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;

use log::{debug, info};

use crate::config::manifest::CONVERGENCE;

/// How a unit is (re)submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Single stage job, submitted from scratch
    Fresh,
    /// Staged job, continuing at the stage recorded in its INCAR
    StagedContinue,
    /// Staged job that has never run, starting at stage 0
    StagedInitialize,
}

impl LaunchMode {
    /// Launcher flags for this mode, the unit name is appended after them
    pub fn arguments(&self) -> Vec<&'static str> {
        match self {
            LaunchMode::Fresh => vec![],
            LaunchMode::StagedContinue => vec!["-m", CONVERGENCE],
            LaunchMode::StagedInitialize => vec!["-m", CONVERGENCE, "--init"],
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LaunchMode::Fresh => write!(f, "single"),
            LaunchMode::StagedContinue => write!(f, "multi"),
            LaunchMode::StagedInitialize => write!(f, "multi_initial"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: String },
}

/// Submits units to the scheduler
///
/// Launchers never retry: a failed submission is picked up again on the next sweep.
pub trait Launcher {
    fn launch(&self, mode: LaunchMode, name: &str, dir: &Path) -> Result<(), LaunchError>;
}

/// Runs the external launcher script from inside the unit directory
pub struct CommandLauncher {
    pub command: String,
}

impl Launcher for CommandLauncher {
    fn launch(&self, mode: LaunchMode, name: &str, dir: &Path) -> Result<(), LaunchError> {
        let mut launcher = Command::new(&self.command);
        let cmd = launcher
            .args(mode.arguments())
            .args(["-n", name])
            .current_dir(dir);
        info!("Launching {name} ({mode})");
        debug!("{:?}", &cmd);

        let status = cmd.status().map_err(|source| LaunchError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        match status.success() {
            true => Ok(()),
            false => Err(LaunchError::Failed {
                command: self.command.clone(),
                status: status.to_string(),
            }),
        }
    }
}

/// Logs what would be launched, used with --dry-run
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn launch(&self, mode: LaunchMode, name: &str, dir: &Path) -> Result<(), LaunchError> {
        info!("--dry-run set, not launching {name} ({mode}) in {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags_match_launcher_interface() {
        assert!(LaunchMode::Fresh.arguments().is_empty());
        assert_eq!(LaunchMode::StagedContinue.arguments(), vec!["-m", "CONVERGENCE"]);
        assert_eq!(LaunchMode::StagedInitialize.arguments(), vec!["-m", "CONVERGENCE", "--init"]);
    }

    #[test]
    fn missing_launcher_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = CommandLauncher { command: "/nonexistent/vasp.py".to_string() };
        let result = launcher.launch(LaunchMode::Fresh, "Fe2O3-wf-relax", dir.path());
        assert!(matches!(result, Err(LaunchError::Spawn { .. })));
    }
}
