use crate::{
    collector::Collector,
    config::{
        is_file_name_safe, is_label_valid, is_module_valid, is_walltime_valid, ConfigErrors,
        FailurePolicy, JobConfig, INDEX_PLACEHOLDER, LABEL_PLACEHOLDER, NP_PLACEHOLDER,
    },
    displacement::{DisplacementIndex, DisplacementSet},
    queue::{ppn_from_queue_name, ResourceRequest, Scheduler},
};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, error, info, warn};

/// The external program and the fixed file names it works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub command: String,
    pub launcher: String,
    pub staging: String,
    pub result: String,
    pub archive: String,
    pub log: String,
    pub scratch: Vec<String>,
    pub timeout: Option<Duration>,
}

/// A fully validated job, everything the script renderer and the executors need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub label: String,
    pub request: ResourceRequest,
    pub scheduler: Scheduler,
    pub modules: Vec<String>,
    pub displacements: DisplacementSet,
    pub program: Program,
    pub on_failure: FailurePolicy,
    pub ledger: Option<String>,
    pub output: PathBuf,
    pub script: String,
}

impl Program {
    /// launcher with the process count filled in, followed by the command
    pub fn command_line(&self, processes: u64) -> String {
        let launcher = self
            .launcher
            .replace(NP_PLACEHOLDER, &processes.to_string());

        if launcher.trim().is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", launcher.trim(), self.command)
        }
    }
}

/// substitute `{label}` and `{index}` in a file name template
pub fn fill_template(template: &str, label: &str, index: &str) -> String {
    template
        .replace(LABEL_PLACEHOLDER, label)
        .replace(INDEX_PLACEHOLDER, index)
}

impl JobPlan {
    /// validate `config` and resolve derived values, all problems are collected before failing
    pub fn from_config(config: &JobConfig) -> Result<Self, ConfigErrors> {
        let mut errors = Vec::new();

        let label = match config.job.label.as_deref() {
            None | Some("") => {
                errors.push(ConfigErrors::MissingLabel);
                None
            }
            Some(label) if !is_label_valid(label) => {
                errors.push(ConfigErrors::InvalidLabel(label.to_owned()));
                None
            }
            Some(label) => Some(label.to_owned()),
        };

        let nodes = match u32::try_from(config.job.nodes) {
            Ok(nodes) if nodes >= 1 => Some(nodes),
            _ => {
                errors.push(ConfigErrors::InvalidNodes(config.job.nodes));
                None
            }
        };

        let queue = match config.job.queue.as_deref() {
            None | Some("") => {
                errors.push(ConfigErrors::MissingQueue);
                None
            }
            Some(queue) if !is_module_valid(queue) => {
                errors.push(ConfigErrors::InvalidQueue(queue.to_owned()));
                None
            }
            Some(queue) => Some(queue.to_owned()),
        };

        let ppn = match (config.job.ppn, queue.as_deref()) {
            (Some(explicit), queue) => match u32::try_from(explicit) {
                Ok(ppn) if ppn >= 1 => {
                    if let Some(Ok(derived)) = queue.map(ppn_from_queue_name) {
                        if derived != ppn {
                            warn!(
                                "job.ppn ({ppn}) overrides the process count encoded in the queue name ({derived})"
                            );
                        }
                    }
                    Some(ppn)
                }
                _ => {
                    errors.push(ConfigErrors::InvalidPpn(explicit));
                    None
                }
            },
            (None, Some(queue)) => match ppn_from_queue_name(queue) {
                Ok(ppn) => Some(ppn),
                Err(e) => {
                    errors.push(e.into());
                    None
                }
            },
            // already reported as a missing queue
            (None, None) => None,
        };

        if let Some(ref walltime) = config.job.walltime {
            if !is_walltime_valid(walltime) {
                errors.push(ConfigErrors::InvalidWalltime(walltime.clone()));
            }
        }

        for module in config.environment.modules.iter() {
            if !is_module_valid(module) {
                errors.push(ConfigErrors::InvalidModule(module.clone()));
            }
        }

        let count = Self::resolve_count(config, &mut errors);

        let program = &config.program;
        let mut check_name = |field: &'static str, value: &str, placeholders: &[&str]| {
            if !is_file_name_safe(value, placeholders) {
                errors.push(ConfigErrors::UnsafeFileName {
                    field,
                    value: value.to_owned(),
                });
            }
        };

        check_name("displacements.prefix", &config.displacements.prefix, &[]);
        check_name("program.staging", &program.staging, &[]);
        check_name("program.result", &program.result, &[]);
        check_name(
            "program.archive",
            &program.archive,
            &[LABEL_PLACEHOLDER, INDEX_PLACEHOLDER],
        );
        check_name("program.log", &program.log, &[LABEL_PLACEHOLDER]);
        for scratch in program.scratch.iter() {
            check_name("program.scratch", scratch, &[]);
        }
        if let Some(ref ledger) = config.ledger {
            check_name("ledger", ledger, &[]);
        }
        check_name("output.script", &config.output.script, &[LABEL_PLACEHOLDER]);

        if !program.archive.contains(INDEX_PLACEHOLDER) {
            errors.push(ConfigErrors::ArchiveWithoutIndex(program.archive.clone()));
        }

        if program.command.trim().is_empty() {
            errors.push(ConfigErrors::EmptyCommand);
        }
        for (field, value) in [
            ("program.command", &program.command),
            ("program.launcher", &program.launcher),
        ] {
            if value.contains('\n') || value.contains('\r') {
                errors.push(ConfigErrors::MultilineValue { field });
            }
        }

        match (label, queue, nodes, ppn, count) {
            (Some(label), Some(queue), Some(nodes), Some(ppn), Some(count))
                if errors.is_empty() =>
            {
                let script = fill_template(&config.output.script, &label, "");

                let plan = Self {
                    request: ResourceRequest {
                        queue,
                        job_name: label.clone(),
                        nodes,
                        ppn,
                        walltime: config.job.walltime.clone(),
                    },
                    scheduler: config.scheduler,
                    modules: config.environment.modules.clone(),
                    displacements: DisplacementSet::new(
                        config.displacements.prefix.clone(),
                        config.displacements.width,
                        count,
                    ),
                    program: Program {
                        command: program.command.trim().to_owned(),
                        launcher: program.launcher.clone(),
                        staging: program.staging.clone(),
                        result: program.result.clone(),
                        archive: program.archive.clone(),
                        log: fill_template(&program.log, &label, ""),
                        scratch: program.scratch.clone(),
                        timeout: program.timeout.map(Duration::from_secs),
                    },
                    on_failure: config.on_failure,
                    ledger: config.ledger.clone(),
                    output: config.output.directory.clone(),
                    script,
                    label,
                };

                info!(
                    label = %plan.label,
                    queue = %plan.request.queue,
                    nodes = plan.request.nodes,
                    ppn = plan.request.ppn,
                    displacements = plan.displacements.count,
                    "Resolved job plan"
                );

                Ok(plan)
            }
            _ => {
                for e in errors.iter() {
                    error!("{e}");
                }

                Err(ConfigErrors::Preflight(errors))
            }
        }
    }

    /// count from config, from scanning the inputs, or both as long as they agree
    fn resolve_count(config: &JobConfig, errors: &mut Vec<ConfigErrors>) -> Option<u32> {
        let displacements = &config.displacements;

        if displacements.width == 0 {
            errors.push(ConfigErrors::InvalidWidth);
            return None;
        }

        let configured = match displacements.count {
            Some(count) if count < 1 => {
                errors.push(ConfigErrors::InvalidCount(count));
                return None;
            }
            Some(count) if count as u64 > DisplacementSet::capacity(displacements.width) => {
                errors.push(ConfigErrors::CountTooLarge {
                    count,
                    width: displacements.width,
                    capacity: DisplacementSet::capacity(displacements.width),
                });
                return None;
            }
            Some(count) => match u32::try_from(count) {
                Ok(count) => Some(count),
                Err(_) => {
                    errors.push(ConfigErrors::InvalidCount(count));
                    return None;
                }
            },
            None => None,
        };

        let scanned = match displacements.inputs {
            Some(ref dir) => {
                match Collector::new(&displacements.prefix, displacements.width)
                    .and_then(|collector| collector.scan(dir))
                    .and_then(|scan| scan.contiguous_count())
                {
                    Ok(found) => {
                        debug!(dir = ?dir, found = found, "Derived displacement count from inputs");
                        Some((dir, found))
                    }
                    Err(e) => {
                        errors.push(e.into());
                        return None;
                    }
                }
            }
            None => None,
        };

        match (configured, scanned) {
            (Some(configured), Some((dir, found))) if configured != found => {
                errors.push(ConfigErrors::CountMismatch {
                    configured: i64::from(configured),
                    found,
                    dir: dir.clone(),
                });
                None
            }
            (_, Some((_, found))) => Some(found),
            (Some(configured), None) => {
                warn!("displacements.inputs not given, the count of {configured} is not verified against the input files");
                Some(configured)
            }
            (None, None) => {
                errors.push(ConfigErrors::MissingCount);
                None
            }
        }
    }

    pub fn archive_name(&self, index: DisplacementIndex) -> String {
        fill_template(&self.program.archive, &self.label, &index.to_string())
    }

    pub fn input_name(&self, index: DisplacementIndex) -> String {
        self.displacements.input_name(index)
    }

    pub fn command_line(&self) -> String {
        self.program.command_line(self.request.processes())
    }

    pub fn script_path(&self) -> PathBuf {
        self.output.join(&self.script)
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
pub(crate) mod plan_test;
