pub mod batch;
pub mod local;
pub mod staging;

use crate::{ledger::LedgerError, plan::JobPlan, script::ScriptError};
use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("Ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Working directory {0:?} not found")]
    NotADirectory(PathBuf),
    #[error("Failed to open log file {path:?}: {source}")]
    LogFile { path: PathBuf, source: io::Error },
    #[error("Displacement {index} failed: {reason}")]
    StepFailed { index: String, reason: StepFailure },
}

/// Why a single displacement step did not produce an archived result
#[derive(Error, Debug)]
pub enum StepFailure {
    #[error("failed to stage {input:?}: {source}")]
    Staging { input: PathBuf, source: io::Error },
    #[error("failed to spawn the program: {0}")]
    Spawn(io::Error),
    #[error("failed to wait for the program: {0}")]
    Wait(io::Error),
    #[error("program exited with status {}", .0.map_or("unknown (killed by signal)".to_owned(), |code| code.to_string()))]
    Exit(Option<i32>),
    #[error("program did not finish within {0:?}")]
    Timeout(Duration),
    #[error("failed to archive {result:?}: {source}")]
    Archive { result: PathBuf, source: io::Error },
}

/// Result of handing a plan to an executor
#[derive(Debug)]
pub enum Outcome {
    Script(PathBuf),
    Run(local::RunSummary),
}

#[derive(Debug)]
pub enum Executors {
    Batch(batch::BatchExecutor),
    Local(local::LocalExecutor),
}

impl Executors {
    pub fn batch(plan: JobPlan) -> Self {
        Self::Batch(batch::BatchExecutor::load(plan))
    }

    pub fn local(plan: JobPlan, workdir: PathBuf) -> Self {
        Self::Local(local::LocalExecutor::load(plan, workdir))
    }

    pub fn execute(&mut self) -> Result<Outcome, ExecutorError> {
        match self {
            Self::Batch(executor) => executor.execute().map(Outcome::Script),
            Self::Local(executor) => executor.execute().map(Outcome::Run),
        }
    }
}
