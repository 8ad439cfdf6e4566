//! Talk to the SLURM scheduler: read the queue and (re)submit jobs

/// Query squeue once per sweep and classify each working directory
pub mod queue;

/// Run the job launcher for a resubmission directive
pub mod launch;
