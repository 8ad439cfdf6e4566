//! Resubmission orchestrator for staged VASP calculations on SLURM
//!
//! Each sweep finds calculation directories below a workflow root, checks the scheduler queue,
//! reads the output of finished runs, and decides whether to resubmit, advance a stage, or accept
//! a unit as converged.

/// Unit INCAR and stage manifest files, sweep settings
pub mod config;
/// The resubmission state machine
pub mod decision;
pub mod error;
/// Output artifact interpretation
pub mod output;
/// Scheduler queue and job launcher
pub mod slurm;
/// Calculation unit discovery and naming
pub mod unit;
/// Sweeps and persisted workflow state
pub mod workflow;
