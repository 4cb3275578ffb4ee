use crate::{
    collector::CollectorError,
    displacement::{DEFAULT_PREFIX, DEFAULT_WIDTH},
    ledger::DEFAULT_LEDGER,
    queue::{QueueError, Scheduler},
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

pub const INDEX_PLACEHOLDER: &str = "{index}";
pub const LABEL_PLACEHOLDER: &str = "{label}";
pub const NP_PLACEHOLDER: &str = "{np}";

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("job.label is required")]
    MissingLabel,
    #[error("job.label '{0}' must start with a letter and contain only letters, digits, '_', '.' or '-'")]
    InvalidLabel(String),
    #[error("job.queue is required")]
    MissingQueue,
    #[error("job.queue '{0}' may only contain letters, digits, '_', '.', '+', '-' or '/'")]
    InvalidQueue(String),
    #[error("job.queue: {0}")]
    Queue(#[from] QueueError),
    #[error("job.nodes must be at least 1, got {0}")]
    InvalidNodes(i64),
    #[error("job.ppn must be at least 1, got {0}")]
    InvalidPpn(i64),
    #[error("job.walltime '{0}' may only contain digits, ':' and '-'")]
    InvalidWalltime(String),
    #[error("displacements.count must be at least 1, got {0}")]
    InvalidCount(i64),
    #[error("displacements.width must be at least 1")]
    InvalidWidth,
    #[error("displacements.count {count} is too large for an index width of {width} (at most {capacity})")]
    CountTooLarge {
        count: i64,
        width: usize,
        capacity: u64,
    },
    #[error("Neither displacements.count nor displacements.inputs was given")]
    MissingCount,
    #[error("displacements.count is {configured} but {found} inputs were found in {dir:?}")]
    CountMismatch {
        configured: i64,
        found: u32,
        dir: PathBuf,
    },
    #[error("displacements.inputs: {0}")]
    Collector(#[from] CollectorError),
    #[error("{field} '{value}' is not a plain, shell-safe name")]
    UnsafeFileName { field: &'static str, value: String },
    #[error("program.archive '{0}' must contain {{index}}, otherwise every displacement overwrites the same archive")]
    ArchiveWithoutIndex(String),
    #[error("program.command must not be empty")]
    EmptyCommand,
    #[error("{field} must be a single line")]
    MultilineValue { field: &'static str },
    #[error("environment.modules entry '{0}' is not a valid module name")]
    InvalidModule(String),
    #[error("{} configuration errors: {}", .0.len(), .0.iter().join("; "))]
    Preflight(Vec<ConfigErrors>),
}

/// What happens to the loop when the external program exits non-zero
#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// stop at the failing displacement and exit with its status
    #[default]
    Abort,
    /// report the failing displacement, leave it unarchived and carry on
    Warn,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Warn => f.write_str("warn"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct JobConfig {
    pub job: JobSection,
    pub scheduler: Scheduler,
    pub environment: EnvironmentConfig,
    pub displacements: DisplacementConfig,
    pub program: ProgramConfig,
    pub on_failure: FailurePolicy,
    // set to null to disable resume support
    pub ledger: Option<String>,
    pub output: OutputConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct JobSection {
    pub label: Option<String>,
    pub queue: Option<String>,
    pub nodes: i64,
    // derived from the queue name when absent
    pub ppn: Option<i64>,
    pub walltime: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields, default)]
pub struct EnvironmentConfig {
    pub modules: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct DisplacementConfig {
    pub count: Option<i64>,
    // directory holding the numbered inputs, scanned to derive or verify `count`
    pub inputs: Option<PathBuf>,
    pub prefix: String,
    pub width: usize,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ProgramConfig {
    pub command: String,
    pub launcher: String,
    pub staging: String,
    pub result: String,
    pub archive: String,
    pub log: String,
    pub scratch: Vec<String>,
    // seconds, only honoured by the local executor
    pub timeout: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub script: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job: JobSection::default(),
            scheduler: Scheduler::default(),
            environment: EnvironmentConfig::default(),
            displacements: DisplacementConfig::default(),
            program: ProgramConfig::default(),
            on_failure: FailurePolicy::default(),
            ledger: Some(DEFAULT_LEDGER.to_owned()),
            output: OutputConfig::default(),
        }
    }
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            label: None,
            queue: None,
            nodes: 1,
            ppn: None,
            walltime: None,
        }
    }
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            count: None,
            inputs: None,
            prefix: DEFAULT_PREFIX.to_owned(),
            width: DEFAULT_WIDTH,
        }
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            command: "vasp_std".to_owned(),
            launcher: format!("mpirun -np {NP_PLACEHOLDER}"),
            staging: "POSCAR".to_owned(),
            result: "vasprun.xml".to_owned(),
            archive: format!("vasprun.xml-{INDEX_PLACEHOLDER}"),
            log: format!("{LABEL_PLACEHOLDER}.log"),
            scratch: vec!["WAVECAR".to_owned(), "CHG".to_owned(), "CHGCAR".to_owned()],
            timeout: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            script: format!("{LABEL_PLACEHOLDER}.sh"),
        }
    }
}

impl JobConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigErrors> {
        debug!("Loading configuration from file: {:?}", path);

        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigErrors::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// check that `name` can be used unquoted in a shell script and stays inside the working
/// directory, known placeholders are allowed where `placeholders` lists them
pub fn is_file_name_safe(name: &str, placeholders: &[&str]) -> bool {
    let stripped = placeholders
        .iter()
        .fold(name.to_owned(), |acc, placeholder| acc.replace(placeholder, "x"));

    !stripped.is_empty()
        && stripped != "."
        && stripped != ".."
        && !stripped.starts_with('-')
        && stripped
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
}

/// job names double as file name fragments, so they are held to the stricter rule
pub fn is_label_valid(label: &str) -> bool {
    label
        .chars()
        .next()
        .map_or(false, |first| first.is_ascii_alphabetic())
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// environment modules are usually namespaced, e.g. `vasp/5.4.4`
pub fn is_module_valid(module: &str) -> bool {
    !module.is_empty()
        && !module.starts_with('-')
        && module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-' | '/'))
}

pub fn is_walltime_valid(walltime: &str) -> bool {
    !walltime.is_empty()
        && walltime
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ':' | '-'))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
