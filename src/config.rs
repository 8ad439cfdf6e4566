//! Typed access to the files that describe a calculation unit
//!
//! The directory tree is the only database: a unit's INCAR and CONVERGENCE files are the source of
//! truth for its settings and stage progress.

/// Read and rewrite INCAR tags
pub mod incar;

/// Parse CONVERGENCE stage manifests
pub mod manifest;

/// Sweep settings collected from the command line
pub mod settings;
