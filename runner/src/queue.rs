use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of trailing queue-name characters that encode the per-node process count
pub const PPN_SUFFIX_LEN: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue name is empty")]
    Empty,
    #[error("queue name '{0}' does not end in a two-digit process count")]
    MissingSuffix(String),
    #[error("queue name '{0}' encodes a process count of zero")]
    ZeroSuffix(String),
}

/// Derive the processes per node from the trailing digits of a queue name,
/// e.g. `q.testqueue16` -> 16
pub fn ppn_from_queue_name(name: &str) -> Result<u32, QueueError> {
    if name.is_empty() {
        return Err(QueueError::Empty);
    }

    let chars: Vec<char> = name.chars().collect();
    if chars.len() < PPN_SUFFIX_LEN {
        return Err(QueueError::MissingSuffix(name.to_owned()));
    }

    let suffix = &chars[chars.len() - PPN_SUFFIX_LEN..];
    if !suffix.iter().all(char::is_ascii_digit) {
        return Err(QueueError::MissingSuffix(name.to_owned()));
    }

    match suffix.iter().collect::<String>().parse::<u32>() {
        Ok(0) => Err(QueueError::ZeroSuffix(name.to_owned())),
        Ok(ppn) => Ok(ppn),
        Err(_) => Err(QueueError::MissingSuffix(name.to_owned())),
    }
}

/// Batch scheduler dialect used for the directive block
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    #[default]
    Pbs,
    Slurm,
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbs => f.write_str("pbs"),
            Self::Slurm => f.write_str("slurm"),
        }
    }
}

/// Resources requested from the scheduler for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub queue: String,
    pub job_name: String,
    pub nodes: u32,
    pub ppn: u32,
    pub walltime: Option<String>,
}

impl ResourceRequest {
    /// total number of processes handed to the launcher
    pub fn processes(&self) -> u64 {
        u64::from(self.nodes) * u64::from(self.ppn)
    }
}

impl Scheduler {
    /// render the directive block, one directive per line
    pub fn directives(&self, request: &ResourceRequest) -> Vec<String> {
        let mut lines = Vec::new();

        match self {
            Self::Pbs => {
                lines.push(format!("#PBS -q {}", request.queue));
                lines.push(format!("#PBS -N {}", request.job_name));
                lines.push(format!(
                    "#PBS -l nodes={}:ppn={}",
                    request.nodes, request.ppn
                ));
                if let Some(ref walltime) = request.walltime {
                    lines.push(format!("#PBS -l walltime={walltime}"));
                }
                lines.push("#PBS -j oe".to_owned());
            }
            Self::Slurm => {
                lines.push(format!("#SBATCH --partition={}", request.queue));
                lines.push(format!("#SBATCH --job-name={}", request.job_name));
                lines.push(format!("#SBATCH --nodes={}", request.nodes));
                lines.push(format!("#SBATCH --ntasks-per-node={}", request.ppn));
                if let Some(ref walltime) = request.walltime {
                    lines.push(format!("#SBATCH --time={walltime}"));
                }
            }
        }

        lines
    }

    /// environment variable holding the directory the job was submitted from
    pub fn submit_dir_var(&self) -> &'static str {
        match self {
            Self::Pbs => "PBS_O_WORKDIR",
            Self::Slurm => "SLURM_SUBMIT_DIR",
        }
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
