use log::info;

use crate::config::manifest::STAGE_NUMBER;
use crate::config::settings::Settings;
use crate::decision::directive::{Decision, Directive};
use crate::output::interpret::Interpretation;
use crate::output::parser::ConvergenceFlags;
use crate::slurm::launch::LaunchMode;
use crate::slurm::queue::QueueStatus;
use crate::unit::model::{UnitView, NELM};

/// Resubmission state machine
///
/// Decisions are a pure function of the unit view, its queue status and its output. Config
/// changes are returned with the decision and applied by the caller.
pub struct Engine {
    nelm_ceiling: i64,
    max_fizzled: u32,
}

impl Engine {
    pub fn new(settings: &Settings) -> Engine {
        Engine {
            nelm_ceiling: settings.nelm_ceiling,
            max_fizzled: settings.max_fizzled,
        }
    }

    /// Decide what happens to one unit this sweep
    ///
    /// `output` is `None` when the unit has no output artifact yet.
    pub fn decide(&self, view: &UnitView, queue: &QueueStatus, output: Option<&Interpretation>) -> Decision {
        if let QueueStatus::Active(state) = queue {
            info!("{} in queue, status: {state}", view.name);
            return Decision::new(Directive::Queued { state: state.clone() });
        }

        if view.multi_image {
            info!("{} is a multi-image job, those aren't handled yet", view.name);
            return Decision::new(Directive::Unsupported {
                reason: "multi-image (NEB) jobs are not handled".to_string(),
            });
        }

        match output {
            None => self.not_started(view),
            Some(Interpretation::Fizzled(_)) => self.fizzled(view),
            Some(Interpretation::Parsed(parsed)) => match view.stage {
                None => self.judge(view, &parsed.flags, Directive::NeedsRestartSingle),
                Some(stage) => match stage.next() {
                    Some(next) => {
                        info!("Rerunning {} stage {} of {}", view.name, next.current(), next.max());
                        Decision::new(Directive::NeedsRestartMulti).with_change(STAGE_NUMBER, next.current())
                    }
                    None => self.judge(view, &parsed.flags, Directive::NeedsRestartMulti),
                },
            },
        }
    }

    fn not_started(&self, view: &UnitView) -> Decision {
        match view.has_manifest {
            true => {
                info!("{} initializing multi-step run", view.name);
                Decision::new(Directive::NeedsRestartMultiInit)
            }
            false => {
                info!("{} initializing run", view.name);
                Decision::new(Directive::NeedsRestartSingle)
            }
        }
    }

    fn fizzled(&self, view: &UnitView) -> Decision {
        let attempt = view.fizzled + 1;
        if attempt > self.max_fizzled {
            return Decision::new(Directive::FizzleLimit { attempts: view.fizzled });
        }
        let mode = match view.stage {
            Some(_) => LaunchMode::StagedContinue,
            None => LaunchMode::Fresh,
        };
        info!("{} fizzled, attempting to resubmit ({attempt} of {})", view.name, self.max_fizzled);
        Decision::new(Directive::Fizzled { mode, attempt })
    }

    /// Three-way convergence test for a single stage job or the final stage of a staged job
    fn judge(&self, view: &UnitView, flags: &ConvergenceFlags, restart: Directive) -> Decision {
        if flags.converged {
            info!("{} complete and ready for post processing", view.name);
            return Decision::new(Directive::Converged);
        }

        if !flags.converged_electronic {
            info!("{}: increasing {NELM} to {} for electronic convergence", view.name, self.nelm_ceiling);
            return Decision::new(restart).with_change(NELM, self.nelm_ceiling);
        }

        if !flags.converged_ionic && view.single_point {
            // a single point calculation can't converge ionically
            info!("{}: single point calculation, electronically converged, not resubmitting", view.name);
            return Decision::new(Directive::Converged);
        }

        info!("Rerunning {}", view.name);
        Decision::new(restart)
    }
}
