use crate::{
    ledger::{Ledger, LedgerError},
    plan::JobPlan,
};
use itertools::Itertools;
use std::{fmt, path::Path};
use tracing::{debug, warn};

/// Progress of a job in its working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub total: u32,
    pub completed: Vec<String>,
    pub missing: Vec<String>,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "completed {}/{}", self.completed.len(), self.total)?;
        if !self.missing.is_empty() {
            writeln!(f, "missing: {}", self.missing.iter().join(" "))?;
        }
        Ok(())
    }
}

/// read progress from the ledger, or from the archived results when the ledger is disabled
pub fn progress(plan: &JobPlan, workdir: &Path) -> Result<Progress, LedgerError> {
    let set = &plan.displacements;
    let (completed, missing): (Vec<_>, Vec<_>) = match plan.ledger {
        Some(ref name) => {
            let ledger = Ledger::open(workdir.join(name))?;
            let stray = ledger.stray(set);
            if !stray.is_empty() {
                warn!(
                    ledger = ?ledger.path(),
                    "Ledger lists indices outside of 1..={}: {}",
                    set.count,
                    stray.iter().join(", ")
                );
            }

            let completed = ledger.completed(set).collect();
            let missing = ledger.missing(set).collect();

            (completed, missing)
        }
        None => {
            debug!("No ledger configured, checking archived results instead");

            set.indices()
                .partition(|index| workdir.join(plan.archive_name(*index)).is_file())
        }
    };

    Ok(Progress {
        total: set.count,
        completed: completed.iter().map(ToString::to_string).collect(),
        missing: missing.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
#[path = "status_test.rs"]
mod status_test;
