use crate::{
    config::{ConfigErrors, FailurePolicy, JobConfig},
    displacement::{DEFAULT_PREFIX, DEFAULT_WIDTH},
    queue::Scheduler,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Generate and run per-displacement batch jobs for phonon calculations
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace), RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Additionally write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the batch script looping over all displacements
    Generate(JobArgs),
    /// Run the displacement loop locally, without a scheduler
    Run {
        #[command(flatten)]
        job: JobArgs,
        /// Directory holding the displacement inputs
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
    },
    /// Count the displacement inputs in a directory
    Scan(ScanArgs),
    /// Report completed and missing displacements
    Status {
        #[command(flatten)]
        job: JobArgs,
        /// Directory the job runs in
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
    },
}

/// Job description, read from `--config` and overridden field by field
#[derive(Args, Debug, Default, Clone)]
pub struct JobArgs {
    /// YAML job file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Job name, also used in file names
    #[arg(long)]
    pub label: Option<String>,

    /// Queue to submit to, its last two characters give the processes per node
    #[arg(long)]
    pub queue: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub nodes: Option<i64>,

    /// Processes per node, overrides the queue name suffix
    #[arg(long, allow_negative_numbers = true)]
    pub ppn: Option<i64>,

    /// Number of displacements
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Directory with the displacement inputs, scanned to derive or verify the count
    #[arg(long)]
    pub inputs: Option<PathBuf>,

    /// Directory the job script is written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub scheduler: Option<Scheduler>,

    #[arg(long, value_enum)]
    pub on_failure: Option<FailurePolicy>,

    #[arg(long)]
    pub walltime: Option<String>,

    /// Environment module to load, may be repeated and replaces the configured list
    #[arg(long = "module")]
    pub modules: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,
}

impl JobArgs {
    /// load the config file, if any, and apply the command line on top of it
    pub fn load(&self) -> Result<JobConfig, ConfigErrors> {
        let mut config = match self.config {
            Some(ref path) => JobConfig::from_file(path)?,
            None => JobConfig::default(),
        };

        self.apply(&mut config);

        Ok(config)
    }

    /// like [`JobArgs::load`], for commands staging inputs from `workdir`: unless configured
    /// otherwise the inputs are scanned there, so the count is verified against what gets staged
    pub fn load_in(&self, workdir: &Path) -> Result<JobConfig, ConfigErrors> {
        let mut config = self.load()?;

        if config.displacements.inputs.is_none() {
            config.displacements.inputs = Some(workdir.to_path_buf());
        }

        Ok(config)
    }

    pub fn apply(&self, config: &mut JobConfig) {
        if let Some(ref label) = self.label {
            config.job.label = Some(label.clone());
        }
        if let Some(ref queue) = self.queue {
            config.job.queue = Some(queue.clone());
        }
        if let Some(nodes) = self.nodes {
            config.job.nodes = nodes;
        }
        if let Some(ppn) = self.ppn {
            config.job.ppn = Some(ppn);
        }
        if let Some(ref walltime) = self.walltime {
            config.job.walltime = Some(walltime.clone());
        }
        if let Some(count) = self.count {
            config.displacements.count = Some(count);
        }
        if let Some(ref inputs) = self.inputs {
            config.displacements.inputs = Some(inputs.clone());
        }
        if let Some(ref output) = self.output {
            config.output.directory = output.clone();
        }
        if let Some(scheduler) = self.scheduler {
            config.scheduler = scheduler;
        }
        if let Some(on_failure) = self.on_failure {
            config.on_failure = on_failure;
        }
        if !self.modules.is_empty() {
            config.environment.modules = self.modules.clone();
        }
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod cli_test;
