//! Aggregate many calculation units into one named workflow run

/// Workflow name, convergence flag and accepted results files
pub mod record;

/// Run one sweep over every unit in the workflow
pub mod sweep;
