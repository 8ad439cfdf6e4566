use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use reconverge::config::settings::Settings;
use reconverge::output::parser::ExternalParser;
use reconverge::slurm::launch::{CommandLauncher, DryRunLauncher, Launcher};
use reconverge::slurm::queue::Squeue;
use reconverge::workflow::sweep::{Outcome, Workflow};

/// Check every calculation in a workflow and resubmit the ones that need it
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Workflow root directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Workflow name, only used if the root has no WORKFLOW_NAME file yet
    #[arg(short, long)]
    name: Option<String>,

    /// Log decisions without changing files or launching jobs
    #[arg(long)]
    dry_run: bool,

    /// Job launcher script
    #[arg(long, default_value = "vasp.py")]
    launcher: String,

    /// Output parser, prints convergence flags of a vasprun.xml as JSON
    #[arg(long, default_value = "vasprun-flags")]
    parser: String,

    /// SLURM queue command
    #[arg(long, default_value = "squeue")]
    squeue: String,

    /// NELM ceiling used when electronic convergence fails
    #[arg(long, default_value_t = 500)]
    nelm_ceiling: i64,

    /// Consecutive fizzled runs before a unit is no longer resubmitted
    #[arg(long, default_value_t = 5)]
    max_fizzled: u32,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Settings {
            root: args.root,
            name: args.name,
            dry_run: args.dry_run,
            launcher: args.launcher,
            parser: args.parser,
            squeue: args.squeue,
            nelm_ceiling: args.nelm_ceiling,
            max_fizzled: args.max_fizzled,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let settings: Settings = Args::parse().into();
    info!("Starting sweep of {}", settings.root.display());

    let queue = Squeue { command: settings.squeue.clone() };
    let parser = ExternalParser { command: settings.parser.clone() };
    let launcher: Box<dyn Launcher> = match settings.dry_run {
        true => Box::new(DryRunLauncher),
        false => Box::new(CommandLauncher { command: settings.launcher.clone() }),
    };

    let workflow = Workflow { settings: &settings, queue: &queue, parser: &parser, launcher: launcher.as_ref() };
    let report = workflow.sweep()?;

    let failed = report
        .units
        .iter()
        .filter(|u| matches!(u.outcome, Outcome::Failed(_)))
        .count();
    if failed > 0 {
        warn!("{failed} units could not be processed, see errors above");
    }
    info!(
        "Workflow {}: {} units, {} newly converged, all converged: {}",
        report.workflow,
        report.units.len(),
        report.accepted.len(),
        report.all_converged
    );

    Ok(())
}
