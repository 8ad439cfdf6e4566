use std::path::PathBuf;

/// Everything a sweep needs to know about its environment
///
/// Built once from the command line and handed to each component, there is no process-wide
/// configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Workflow root, every unit below it is part of the workflow
    pub root: PathBuf,
    /// Workflow name used when no WORKFLOW_NAME file exists yet
    pub name: Option<String>,
    /// Compute and log decisions without touching configs or launching anything
    pub dry_run: bool,
    /// Job launcher, called with a mode flag and `-n <unit name>`
    pub launcher: String,
    /// Output parser, called with the artifact path and printing convergence flags as JSON
    pub parser: String,
    /// Scheduler queue command
    pub squeue: String,
    /// NELM is raised to this when electronic convergence fails
    pub nelm_ceiling: i64,
    /// Consecutive fizzled runs tolerated before a unit stops being resubmitted
    pub max_fizzled: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root: PathBuf::from("."),
            name: None,
            dry_run: false,
            launcher: "vasp.py".to_string(),
            parser: "vasprun-flags".to_string(),
            squeue: "squeue".to_string(),
            nelm_ceiling: 500,
            max_fizzled: 5,
        }
    }
}
