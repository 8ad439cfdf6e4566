use std::path::Path;

use log::warn;

use crate::output::parser::{OutputParser, ParsedOutput};

/// Output artifact written by a finished run
pub const VASPRUN: &str = "vasprun.xml";

/// What a prior run left behind
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Parsed(ParsedOutput),
    /// The artifact exists but can't be read, with the parser's complaint
    Fizzled(String),
}

pub fn artifact_exists(dir: &Path) -> bool {
    dir.join(VASPRUN).is_file()
}

/// Parse a unit's output artifact
///
/// A fizzled run is an ordinary outcome, so parse failures are folded into
/// [`Interpretation::Fizzled`] rather than returned as errors.
pub fn interpret(parser: &dyn OutputParser, dir: &Path) -> Interpretation {
    let artifact = dir.join(VASPRUN);
    match parser.parse(&artifact) {
        Ok(parsed) => Interpretation::Parsed(parsed),
        Err(err) => {
            warn!("{} fizzled, check errors: {err:#}", dir.display());
            Interpretation::Fizzled(format!("{err:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::{anyhow, Result};
    use serde_json::json;

    use super::*;
    use crate::output::parser::ExternalParser;

    struct Truncated;

    impl OutputParser for Truncated {
        fn parse(&self, _artifact: &Path) -> Result<ParsedOutput> {
            Err(anyhow!("unexpected end of file"))
        }
    }

    struct Converged;

    impl OutputParser for Converged {
        fn parse(&self, _artifact: &Path) -> Result<ParsedOutput> {
            ParsedOutput::from_json(json!({
                "converged": true,
                "converged_electronic": true,
                "converged_ionic": true
            }))
        }
    }

    #[test]
    fn parse_failure_is_fizzled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VASPRUN), "<modeling>").unwrap();
        assert!(artifact_exists(dir.path()));
        assert!(matches!(interpret(&Truncated, dir.path()), Interpretation::Fizzled(_)));
    }

    #[test]
    fn missing_parser_is_fizzled_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ExternalParser { command: "/nonexistent/vasprun-flags".to_string() };
        assert!(matches!(interpret(&parser, dir.path()), Interpretation::Fizzled(_)));
    }

    #[test]
    fn parsed_output() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!artifact_exists(dir.path()));
        match interpret(&Converged, dir.path()) {
            Interpretation::Parsed(parsed) => assert!(parsed.flags.converged),
            other => panic!("expected parsed output, got {other:?}"),
        }
    }
}
