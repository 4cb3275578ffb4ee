use super::{staging::StagedInput, ExecutorError, StepFailure};
use crate::{
    config::FailurePolicy, displacement::DisplacementIndex, ledger::Ledger, plan::JobPlan,
};
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::PathBuf,
    process::{Child, Command, ExitStatus, Stdio},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

/// Executor that runs the displacement loop in-process, one step after another
#[derive(Debug)]
pub struct LocalExecutor {
    plan: JobPlan,
    workdir: PathBuf,
}

/// Indices by what happened to them during one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl LocalExecutor {
    /// create a new LocalExecutor working in `workdir`
    pub fn load(plan: JobPlan, workdir: PathBuf) -> Self {
        Self { plan, workdir }
    }

    /// execute all displacements strictly in sequence, they share the staging name
    #[instrument(skip(self), fields(label = %self.plan.label), level = "info")]
    pub fn execute(&mut self) -> Result<RunSummary, ExecutorError> {
        if !self.workdir.is_dir() {
            return Err(ExecutorError::NotADirectory(self.workdir.clone()));
        }

        let mut ledger = match self.plan.ledger {
            Some(ref name) => Some(Ledger::open(self.workdir.join(name))?),
            None => None,
        };

        let mut summary = RunSummary::default();
        let total = self.plan.displacements.count;

        for index in self.plan.displacements.indices() {
            if ledger.as_ref().map_or(false, |ledger| ledger.contains(index)) {
                info!(index = %index, "Already completed, skipping");
                summary.skipped.push(index.to_string());
                continue;
            }

            debug!("Processing displacement {index} of {total}");

            match self.step(index)? {
                Ok(()) => {
                    if let Some(ref mut ledger) = ledger {
                        ledger.record(index)?;
                    }
                    summary.completed.push(index.to_string());
                }
                Err(reason) => match self.plan.on_failure {
                    FailurePolicy::Abort => {
                        return Err(ExecutorError::StepFailed {
                            index: index.to_string(),
                            reason,
                        });
                    }
                    FailurePolicy::Warn => {
                        warn!(index = %index, "Displacement failed, continuing: {reason}");
                        summary.failed.push(index.to_string());
                    }
                },
            }

            info!(
                "Done with {}/{}",
                summary.completed.len() + summary.skipped.len() + summary.failed.len(),
                total
            );
        }

        info!(
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "Done with processing"
        );

        Ok(summary)
    }

    /// stage, run, archive; the outer error is for problems that end the run regardless of policy
    fn step(&self, index: DisplacementIndex) -> Result<Result<(), StepFailure>, ExecutorError> {
        let program = &self.plan.program;
        let input = self.workdir.join(self.plan.input_name(index));

        let staged =
            match StagedInput::stage(&input, &self.workdir, &program.staging, &program.scratch) {
                Ok(staged) => staged,
                Err(source) => return Ok(Err(StepFailure::Staging { input, source })),
            };

        let (stdout, stderr) = self.open_log()?;
        let start = Instant::now();

        let status = match self.run(stdout, stderr) {
            Ok(status) => status,
            Err(failure) => return Ok(Err(failure)),
        };

        debug!(
            "Finished in {} ms | status: {}",
            start.elapsed().as_millis(),
            status.success()
        );

        if !status.success() {
            return Ok(Err(StepFailure::Exit(status.code())));
        }

        let result = self.workdir.join(&program.result);
        let archive = self.workdir.join(self.plan.archive_name(index));
        if let Err(source) = fs::copy(&result, &archive) {
            return Ok(Err(StepFailure::Archive { result, source }));
        }

        debug!(archive = ?archive, "Archived result");
        drop(staged);

        Ok(Ok(()))
    }

    /// stdout and stderr handles, both appending to the program log
    fn open_log(&self) -> Result<(File, File), ExecutorError> {
        let path = self.workdir.join(&self.plan.program.log);
        let into_error = |source: io::Error| ExecutorError::LogFile {
            path: path.clone(),
            source,
        };

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(into_error)?;
        let stderr = stdout.try_clone().map_err(into_error)?;

        Ok((stdout, stderr))
    }

    fn run(&self, stdout: File, stderr: File) -> Result<ExitStatus, StepFailure> {
        let command_line = self.plan.command_line();
        debug!(command = %command_line, "Spawning");

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&command_line)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // own process group, so a timeout reaches the launcher and everything it started
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command.spawn().map_err(StepFailure::Spawn)?;

        match self.plan.program.timeout {
            Some(timeout) => match child.wait_timeout(timeout).map_err(StepFailure::Wait)? {
                Some(status) => Ok(status),
                None => {
                    // child hasn't exited yet
                    kill(&mut child);
                    child.wait().map_err(StepFailure::Wait)?;

                    Err(StepFailure::Timeout(timeout))
                }
            },
            None => child.wait().map_err(StepFailure::Wait),
        }
    }
}

#[cfg(unix)]
fn kill(child: &mut Child) {
    use nix::{
        sys::signal::{killpg, Signal},
        unistd::Pid,
    };

    let group = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        warn!(error = ?e, pgid = %group, "Failed to kill timed out process group");
    }
}

#[cfg(not(unix))]
fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = ?e, "Failed to kill timed out program");
    }
}

#[cfg(all(test, unix))]
#[path = "local_test.rs"]
mod local_test;
