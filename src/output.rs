//! Interpret the output artifact of a finished run

/// Boundary to the external output parser
pub mod parser;

/// Turn parser results into parsed-or-fizzled outcomes
pub mod interpret;
