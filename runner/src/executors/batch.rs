use super::ExecutorError;
use crate::{plan::JobPlan, script};
use std::path::PathBuf;
use tracing::{info, instrument};

/// Hands the plan to the batch scheduler by writing the job script, submission is left to the user
#[derive(Debug)]
pub struct BatchExecutor {
    plan: JobPlan,
}

impl BatchExecutor {
    pub fn load(plan: JobPlan) -> Self {
        Self { plan }
    }

    #[instrument(skip(self), fields(label = %self.plan.label), level = "info")]
    pub fn execute(&mut self) -> Result<PathBuf, ExecutorError> {
        let path = script::generate(&self.plan)?;

        info!(
            scheduler = %self.plan.scheduler,
            "Job script ready for submission: {}",
            path.display()
        );

        Ok(path)
    }
}
