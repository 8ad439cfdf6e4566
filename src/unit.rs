//! Calculation units: directories holding one simulation job each

/// Unit, stage progress and the typed view the decision engine works on
pub mod model;

/// Walk a workflow root for complete input sets
pub mod scan;

/// Read or synthesize unit names
pub mod name;

/// Count consecutive fizzled runs per unit
pub mod fizzle;
