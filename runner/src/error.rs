use crate::{
    collector::CollectorError, config::ConfigErrors, executors::ExecutorError,
    ledger::LedgerError, script::ScriptError,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Failed to set up logging: {0}")]
    Logging(#[from] std::io::Error),
}
