use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::incar::Incar;
use crate::unit::model::CalculationUnit;

/// File holding the workflow name as `NAME = <name>`
pub const WORKFLOW_NAME: &str = "WORKFLOW_NAME";

/// File holding the workflow convergence flag as `WORKFLOW_CONVERGED = True|False`
pub const WORKFLOW_CONVERGENCE: &str = "WORKFLOW_CONVERGENCE";

/// Converged unit paths and names
pub const COMPLETED_JOBS: &str = "completed_jobs.yml";

/// Converged units recorded so far, by path
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletedJobs {
    #[serde(rename = "PATHs", default)]
    pub paths: BTreeMap<PathBuf, String>,
}

impl CompletedJobs {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains_key(path)
    }
}

/// A unit accepted as converged, with the parser's final report
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AcceptedResult {
    pub path: PathBuf,
    pub name: String,
    pub recorded_at: String,
    pub output: Value,
}

impl AcceptedResult {
    pub fn new(unit: &CalculationUnit, mut output: Value) -> AcceptedResult {
        if let Value::Object(fields) = &mut output {
            fields.insert("entry_id".to_string(), Value::String(unit.name.clone()));
        }
        AcceptedResult {
            path: unit.path.clone(),
            name: unit.name.clone(),
            recorded_at: Utc::now().to_rfc3339(),
            output,
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match path.exists() {
        true => fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("Can't read {}", path.display())),
        false => Ok(None),
    }
}

pub fn read_workflow_name(root: &Path) -> Result<Option<String>> {
    let path = root.join(WORKFLOW_NAME);
    Ok(read_optional(&path)?.and_then(|text| Incar::parse(&path, &text).get("NAME").map(str::to_string)))
}

pub fn write_workflow_name(root: &Path, name: &str) -> Result<()> {
    let path = root.join(WORKFLOW_NAME);
    info!("Writing workflow name {name} to {}", path.display());
    fs::write(&path, format!("NAME = {name}\n")).with_context(|| format!("Can't write {}", path.display()))
}

pub fn read_convergence_flag(root: &Path) -> Result<Option<bool>> {
    let path = root.join(WORKFLOW_CONVERGENCE);
    match read_optional(&path)? {
        None => Ok(None),
        Some(text) => Ok(Incar::parse(&path, &text).get_bool("WORKFLOW_CONVERGED")?),
    }
}

pub fn write_convergence_flag(root: &Path, converged: bool) -> Result<()> {
    let path = root.join(WORKFLOW_CONVERGENCE);
    let flag = match converged {
        true => "True",
        false => "False",
    };
    fs::write(&path, format!("WORKFLOW_CONVERGED = {flag}\n"))
        .with_context(|| format!("Can't write {}", path.display()))
}

pub fn read_completed(root: &Path) -> Result<CompletedJobs> {
    let path = root.join(COMPLETED_JOBS);
    match read_optional(&path)? {
        None => Ok(CompletedJobs::default()),
        Some(text) => serde_yaml::from_str(&text).with_context(|| format!("Invalid YAML in {}", path.display())),
    }
}

pub fn write_completed(root: &Path, completed: &CompletedJobs) -> Result<()> {
    let path = root.join(COMPLETED_JOBS);
    info!("Writing {} converged jobs to {}", completed.paths.len(), path.display());
    let yaml = serde_yaml::to_string(completed)?;
    fs::write(&path, yaml).with_context(|| format!("Can't write {}", path.display()))
}

/// Path of the accepted results file for a workflow
pub fn accepted_path(root: &Path, workflow: &str) -> PathBuf {
    root.join(format!("{workflow}_converged.json"))
}

pub fn read_accepted(root: &Path, workflow: &str) -> Result<Vec<AcceptedResult>> {
    let path = accepted_path(root, workflow);
    match read_optional(&path)? {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display())),
    }
}

/// Add newly accepted results to the workflow's results file, replacing older entries for the same
/// path
pub fn append_accepted(root: &Path, workflow: &str, accepted: &[AcceptedResult]) -> Result<()> {
    let mut results = read_accepted(root, workflow)?;
    results.retain(|old| !accepted.iter().any(|new| new.path == old.path));
    results.extend(accepted.iter().cloned());

    let path = accepted_path(root, workflow);
    info!("Writing {} accepted results to {}", results.len(), path.display());
    let json = serde_json::to_string_pretty(&results)?;
    fs::write(&path, json).with_context(|| format!("Can't write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn convergence_flag_round_trip() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(read_convergence_flag(root.path()).unwrap(), None);
        write_convergence_flag(root.path(), false).unwrap();
        assert_eq!(read_convergence_flag(root.path()).unwrap(), Some(false));
        write_convergence_flag(root.path(), true).unwrap();
        assert_eq!(read_convergence_flag(root.path()).unwrap(), Some(true));
    }

    #[test]
    fn workflow_name_round_trip() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(read_workflow_name(root.path()).unwrap(), None);
        write_workflow_name(root.path(), "hematite").unwrap();
        assert_eq!(read_workflow_name(root.path()).unwrap().as_deref(), Some("hematite"));
    }

    #[test]
    fn completed_jobs_use_paths_key() {
        let root = tempfile::tempdir().unwrap();
        let mut completed = CompletedJobs::default();
        completed.paths.insert(PathBuf::from("/scratch/wf/NiO"), "NiO".to_string());
        write_completed(root.path(), &completed).unwrap();

        let yaml = fs::read_to_string(root.path().join(COMPLETED_JOBS)).unwrap();
        assert!(yaml.contains("PATHs:"));
        assert_eq!(read_completed(root.path()).unwrap(), completed);
    }

    #[test]
    fn accepted_results_are_merged_by_path() {
        let root = tempfile::tempdir().unwrap();
        let unit = CalculationUnit {
            path: PathBuf::from("/scratch/wf/NiO"),
            name: "NiO".to_string(),
            has_manifest: false,
        };
        let first = AcceptedResult::new(&unit, json!({"converged": true, "energy": -1.0}));
        let second = AcceptedResult::new(&unit, json!({"converged": true, "energy": -2.0}));
        assert_eq!(first.output["entry_id"], "NiO");

        append_accepted(root.path(), "wf", &[first]).unwrap();
        append_accepted(root.path(), "wf", &[second]).unwrap();

        let results = read_accepted(root.path(), "wf").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output["energy"], -2.0);
    }
}
