use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Convergence flags reported for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConvergenceFlags {
    pub converged: bool,
    pub converged_electronic: bool,
    pub converged_ionic: bool,
}

/// A successfully parsed output artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    pub flags: ConvergenceFlags,
    /// Everything the parser reported, kept for the accepted results file
    pub snapshot: Value,
}

impl ParsedOutput {
    /// Untyped JSON -> typed flags, keeping the whole document as the snapshot
    pub fn from_json(snapshot: Value) -> Result<ParsedOutput> {
        let flags = serde_json::from_value::<ConvergenceFlags>(snapshot.clone())
            .context("parser output is missing convergence flags")?;
        Ok(ParsedOutput { flags, snapshot })
    }
}

/// Reads an output artifact into convergence flags
pub trait OutputParser {
    fn parse(&self, artifact: &Path) -> Result<ParsedOutput>;
}

/// Runs an external parser that prints a JSON object for the artifact it's given
///
/// The object must carry `converged`, `converged_electronic` and `converged_ionic`; any other
/// fields are passed through untouched.
pub struct ExternalParser {
    pub command: String,
}

impl OutputParser for ExternalParser {
    fn parse(&self, artifact: &Path) -> Result<ParsedOutput> {
        let mut parser = Command::new(&self.command);
        let cmd = parser.arg(artifact);
        debug!("{:?}", &cmd);

        let output = cmd
            .output()
            .with_context(|| format!("can't run {}", self.command))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("{} printed invalid JSON", self.command))?;
        ParsedOutput::from_json(json)
    }
}
