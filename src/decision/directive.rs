use std::fmt;

use crate::slurm::launch::LaunchMode;

/// What should happen to a unit after this sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Still in the scheduler queue, with its reported state
    Queued { state: String },
    /// Submit a single stage job
    NeedsRestartSingle,
    /// First submission of a staged job
    NeedsRestartMultiInit,
    /// Continue a staged job at the stage in its INCAR
    NeedsRestartMulti,
    /// Output unreadable, resubmit at the same stage
    Fizzled { mode: LaunchMode, attempt: u32 },
    /// Fizzled too often in a row, left alone until someone looks at it
    FizzleLimit { attempts: u32 },
    /// Done, never evaluated again
    Converged,
    /// Recognised job type this engine doesn't handle
    Unsupported { reason: String },
}

impl Directive {
    /// How the launcher should submit the unit, `None` when nothing is launched
    pub fn launch_mode(&self) -> Option<LaunchMode> {
        match self {
            Directive::NeedsRestartSingle => Some(LaunchMode::Fresh),
            Directive::NeedsRestartMultiInit => Some(LaunchMode::StagedInitialize),
            Directive::NeedsRestartMulti => Some(LaunchMode::StagedContinue),
            Directive::Fizzled { mode, .. } => Some(*mode),
            Directive::Queued { .. }
            | Directive::FizzleLimit { .. }
            | Directive::Converged
            | Directive::Unsupported { .. } => None,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Directive::Queued { state } => write!(f, "queued ({state})"),
            Directive::NeedsRestartSingle => write!(f, "restart single stage"),
            Directive::NeedsRestartMultiInit => write!(f, "initialize staged run"),
            Directive::NeedsRestartMulti => write!(f, "restart staged run"),
            Directive::Fizzled { attempt, .. } => write!(f, "fizzled, resubmission {attempt}"),
            Directive::FizzleLimit { attempts } => write!(f, "fizzled {attempts} times, giving up"),
            Directive::Converged => write!(f, "converged"),
            Directive::Unsupported { reason } => write!(f, "unsupported: {reason}"),
        }
    }
}

/// INCAR tag to rewrite before launching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChange {
    pub key: &'static str,
    pub value: String,
}

/// Directive plus the config changes that go with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub directive: Directive,
    pub changes: Vec<TagChange>,
}

impl Decision {
    pub fn new(directive: Directive) -> Decision {
        Decision { directive, changes: Vec::new() }
    }

    pub fn with_change(mut self, key: &'static str, value: impl ToString) -> Decision {
        self.changes.push(TagChange { key, value: value.to_string() });
        self
    }
}
