//! Decide whether and how each unit is resubmitted

/// Directives, the engine's output
pub mod directive;

/// The resubmission state machine
pub mod engine;
