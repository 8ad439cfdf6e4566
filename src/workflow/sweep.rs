use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};

use crate::config::incar::{read_config, write_config, write_tag, Incar};
use crate::config::settings::Settings;
use crate::decision::directive::{Decision, Directive};
use crate::decision::engine::Engine;
use crate::error::UnitError;
use crate::output::interpret::{artifact_exists, interpret, Interpretation};
use crate::output::parser::OutputParser;
use crate::slurm::launch::Launcher;
use crate::slurm::queue::{resolve, QueueRecord, QueueSource, QueueStatus};
use crate::unit::fizzle;
use crate::unit::model::{is_complete, CalculationUnit};
use crate::unit::scan::{count_units, scan};
use crate::workflow::record::{
    append_accepted, read_completed, read_convergence_flag, read_workflow_name, write_completed,
    write_convergence_flag, write_workflow_name, AcceptedResult,
};

/// How a unit came out of the sweep
#[derive(Debug)]
pub enum Outcome {
    Decided(Directive),
    /// Recorded as converged by an earlier sweep and not looked at again
    PreviouslyConverged,
    /// Setup problem or failed launch, the rest of the sweep carried on
    Failed(String),
}

#[derive(Debug)]
pub struct UnitReport {
    pub path: PathBuf,
    pub name: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct SweepReport {
    pub workflow: String,
    /// Units that converged during this sweep
    pub accepted: Vec<AcceptedResult>,
    pub units: Vec<UnitReport>,
    pub all_converged: bool,
}

/// One pass over every unit of a workflow
///
/// The queue is read once, then each unit is decided and launched in turn. Only a queue failure
/// stops the sweep; anything going wrong with a single unit is reported against it.
pub struct Workflow<'a> {
    pub settings: &'a Settings,
    pub queue: &'a dyn QueueSource,
    pub parser: &'a dyn OutputParser,
    pub launcher: &'a dyn Launcher,
}

impl Workflow<'_> {
    pub fn sweep(&self) -> Result<SweepReport> {
        let root = fs::canonicalize(&self.settings.root)
            .with_context(|| format!("Can't open workflow root {}", self.settings.root.display()))?;
        let dry_run = self.settings.dry_run;

        // queue status is needed for every decision, so fail before touching anything
        let queue = resolve(self.queue).context("Can't read the scheduler queue")?;

        if dry_run {
            info!("--dry-run set, no files will be written and nothing will be launched");
        } else if read_convergence_flag(&root)?.is_none() {
            write_convergence_flag(&root, false)?;
        }

        let mut completed = read_completed(&root)?;
        let found = scan(&root, !dry_run);
        let workflow = self.workflow_name(&root, &found)?;
        info!("Sweeping workflow {workflow} in {}", root.display());

        let engine = Engine::new(self.settings);
        let mut accepted: Vec<AcceptedResult> = Vec::new();
        let mut units: Vec<UnitReport> = Vec::new();

        for result in found {
            let unit = match result {
                Ok(unit) => unit,
                Err(err) => {
                    error!("{err}");
                    units.push(UnitReport {
                        path: err.path().to_path_buf(),
                        name: None,
                        outcome: Outcome::Failed(err.to_string()),
                    });
                    continue;
                }
            };

            if completed.contains(&unit.path) {
                debug!("{} already converged", unit.name);
                units.push(UnitReport {
                    path: unit.path.clone(),
                    name: Some(unit.name.clone()),
                    outcome: Outcome::PreviouslyConverged,
                });
                continue;
            }

            let outcome = match self.process(&engine, &unit, &queue) {
                Ok((directive, result)) => {
                    if let Some(result) = result {
                        completed.paths.insert(unit.path.clone(), unit.name.clone());
                        accepted.push(result);
                    }
                    Outcome::Decided(directive)
                }
                Err(err) => {
                    error!("{}: {err:#}", unit.name);
                    Outcome::Failed(format!("{err:#}"))
                }
            };
            units.push(UnitReport { path: unit.path.clone(), name: Some(unit.name.clone()), outcome });
        }

        let total = count_units(&root);
        let converged = completed.paths.keys().filter(|path| is_complete(path)).count();
        let all_converged = total > 0 && converged == total;
        info!("{converged} of {total} jobs converged");
        if all_converged {
            info!("All jobs have converged!");
        }

        if !dry_run {
            write_completed(&root, &completed)?;
            write_convergence_flag(&root, all_converged)?;
            append_accepted(&root, &workflow, &accepted)?;
        }

        Ok(SweepReport { workflow, accepted, units, all_converged })
    }

    /// Decide, apply and launch for one unit, returning an accepted result if it converged
    ///
    /// A unit in the queue is reported as queued without reading any of its files.
    fn process(
        &self,
        engine: &Engine,
        unit: &CalculationUnit,
        queue: &QueueRecord,
    ) -> Result<(Directive, Option<AcceptedResult>)> {
        let status = queue.status(&unit.path);
        if let QueueStatus::Active(state) = &status {
            info!("{}: in queue, status: {state}", unit.name);
            return Ok((Directive::Queued { state: state.clone() }, None));
        }

        let view = unit.view()?;
        let output = match artifact_exists(&unit.path) {
            true => Some(interpret(self.parser, &unit.path)),
            false => None,
        };

        let decision = engine.decide(&view, &status, output.as_ref());
        info!("{}: {}", unit.name, decision.directive);

        let dry_run = self.settings.dry_run;
        let previous = match dry_run {
            true => None,
            false => self.apply_changes(unit, &decision)?,
        };

        if let Some(mode) = decision.directive.launch_mode() {
            if let Err(err) = self.launcher.launch(mode, &unit.name, &unit.path) {
                if let Some(previous) = previous {
                    warn!("Launching {} failed, restoring {}", unit.name, previous.path().display());
                    write_config(&previous)?;
                }
                return Err(err.into());
            }
        }

        if !dry_run {
            self.record_fizzles(unit, &decision.directive, output.as_ref())?;
        }

        let result = match (&decision.directive, output) {
            (Directive::Converged, Some(Interpretation::Parsed(parsed))) => {
                Some(AcceptedResult::new(unit, parsed.snapshot))
            }
            _ => None,
        };

        Ok((decision.directive, result))
    }

    /// Write a decision's config changes, returning the config as it was before them
    fn apply_changes(&self, unit: &CalculationUnit, decision: &Decision) -> Result<Option<Incar>> {
        if decision.changes.is_empty() {
            return Ok(None);
        }

        let previous = read_config(&unit.path)?;
        for change in &decision.changes {
            write_tag(&unit.path, change.key, &change.value)?;
        }
        Ok(Some(previous))
    }

    /// Fizzle bookkeeping once a decision has been carried out
    fn record_fizzles(&self, unit: &CalculationUnit, directive: &Directive, output: Option<&Interpretation>) -> Result<()> {
        match (output, directive) {
            (Some(Interpretation::Parsed(_)), _) => fizzle::clear(&unit.path)?,
            (Some(Interpretation::Fizzled(_)), Directive::Fizzled { .. }) => {
                fizzle::record(&unit.path)?;
            }
            (Some(Interpretation::Fizzled(_)), Directive::FizzleLimit { attempts }) => {
                warn!("{} fizzled {attempts} times in a row, not resubmitting", unit.name);
            }
            _ => {}
        }

        Ok(())
    }

    /// Name from WORKFLOW_NAME, else the only unit's name, else the configured or directory name
    ///
    /// Names that didn't come from a unit are written to WORKFLOW_NAME so later sweeps agree.
    fn workflow_name(&self, root: &Path, found: &[Result<CalculationUnit, UnitError>]) -> Result<String> {
        if let Some(name) = read_workflow_name(root)? {
            return Ok(name);
        }

        if let [Ok(unit)] = found {
            return Ok(unit.name.clone());
        }

        let name = match &self.settings.name {
            Some(name) => name.clone(),
            None => root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workflow".to_string()),
        };
        if !self.settings.dry_run {
            write_workflow_name(root, &name)?;
        }
        Ok(name)
    }
}
