//! Rendering of the batch script handed to the scheduler
//!
//! The script consists of three blocks which are always emitted in the same order:
//! scheduler directives, environment setup and the displacement loop. Rendering is a
//! pure function of the plan, so identical plans give byte-identical scripts.

use crate::{
    config::FailurePolicy,
    plan::{fill_template, JobPlan},
};
use itertools::Itertools;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

/// shell variable holding the current zero-padded index inside the loop
const INDEX_VAR: &str = "index";
const SHEBANG: &str = "#!/bin/bash";
const INDENT: &str = "    ";

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to write job script {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Rendered script split into its blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub directives: Vec<String>,
    pub environment: Vec<String>,
    pub body: Vec<String>,
}

impl Script {
    pub fn render(plan: &JobPlan) -> Self {
        Self {
            directives: plan.scheduler.directives(&plan.request),
            environment: environment_block(plan),
            body: loop_block(plan),
        }
    }

    pub fn text(&self) -> String {
        let mut text = String::new();
        text.push_str(SHEBANG);
        text.push('\n');

        for block in [&self.directives, &self.environment, &self.body] {
            for line in block.iter() {
                text.push_str(line);
                text.push('\n');
            }
            text.push('\n');
        }

        // a single trailing newline
        text.truncate(text.trim_end().len());
        text.push('\n');

        text
    }
}

fn environment_block(plan: &JobPlan) -> Vec<String> {
    let mut lines = vec![format!("cd \"${}\"", plan.scheduler.submit_dir_var())];

    lines.extend(plan.modules.iter().map(|module| format!("module load {module}")));

    lines
}

/// the index as seen by the shell, braced so it can be followed by any character
fn shell_index() -> String {
    format!("${{{INDEX_VAR}}}")
}

fn on_failure(plan: &JobPlan, what: &str) -> Vec<String> {
    let index = shell_index();
    let indent = INDENT.repeat(2);

    match plan.on_failure {
        FailurePolicy::Abort => vec![
            format!("{indent}echo \"displacement {index}: {what} failed with status $status, aborting\" >&2"),
            format!("{indent}{}", cleanup(plan)),
            format!("{indent}exit $status"),
        ],
        FailurePolicy::Warn => {
            let mut lines = vec![format!(
                "{indent}echo \"warning: displacement {index}: {what} failed with status $status, skipping\" >&2"
            )];
            lines.push(format!("{indent}{}", cleanup(plan)));
            lines.push(format!("{indent}continue"));
            lines
        }
    }
}

fn checked(plan: &JobPlan, command: String, what: &str) -> Vec<String> {
    let mut lines = vec![
        format!("{INDENT}{command}"),
        format!("{INDENT}status=$?"),
        format!("{INDENT}if [ $status -ne 0 ]; then"),
    ];
    lines.extend(on_failure(plan, what));
    lines.push(format!("{INDENT}fi"));

    lines
}

fn cleanup(plan: &JobPlan) -> String {
    format!(
        "rm -f {}",
        std::iter::once(&plan.program.staging)
            .chain(plan.program.scratch.iter())
            .join(" ")
    )
}

fn loop_block(plan: &JobPlan) -> Vec<String> {
    let index = shell_index();
    let program = &plan.program;
    let input = format!("{}{index}", plan.displacements.prefix);
    let archive = fill_template(&program.archive, &plan.label, &index);

    let mut lines = vec![format!(
        "for {INDEX_VAR} in {}; do",
        plan.displacements.indices().join(" ")
    )];

    if let Some(ref ledger) = plan.ledger {
        lines.push(format!(
            "{INDENT}if grep -qx \"{index}\" {ledger} 2>/dev/null; then"
        ));
        lines.push(format!(
            "{INDENT}{INDENT}echo \"displacement {index} already completed, skipping\""
        ));
        lines.push(format!("{INDENT}{INDENT}continue"));
        lines.push(format!("{INDENT}fi"));
    }

    lines.extend(checked(
        plan,
        format!("cp {input} {}", program.staging),
        &format!("staging {input}"),
    ));
    lines.extend(checked(
        plan,
        format!("{} >> {} 2>&1", plan.command_line(), program.log),
        &program.command,
    ));
    lines.extend(checked(
        plan,
        format!("cp {} {archive}", program.result),
        &format!("archiving {}", program.result),
    ));
    lines.push(format!("{INDENT}{}", cleanup(plan)));

    if let Some(ref ledger) = plan.ledger {
        lines.push(format!("{INDENT}echo \"{index}\" >> {ledger}"));
    }

    lines.push("done".to_owned());

    lines
}

/// write `text` next to `path` and move it into place, so a reader never sees a partial script
fn write_atomic(path: &Path, text: &str) -> Result<(), ScriptError> {
    let into_error = |source: io::Error| ScriptError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, text).map_err(into_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o755)).map_err(into_error)?;
    }

    fs::rename(&tmp_path, path).map_err(into_error)
}

/// render the script for `plan` into its output directory and return the script path
pub fn generate(plan: &JobPlan) -> Result<PathBuf, ScriptError> {
    let text = Script::render(plan).text();
    let path = plan.script_path();

    if !plan.output.is_dir() {
        debug!(path = ?plan.output, "Creating output directory");
        fs::create_dir_all(&plan.output).map_err(|source| ScriptError::CreateDir {
            path: plan.output.clone(),
            source,
        })?;
    }

    write_atomic(&path, &text)?;

    info!(
        path = ?path,
        first = %plan.displacements.first().map(|i| i.to_string()).unwrap_or_default(),
        last = %plan.displacements.last().map(|i| i.to_string()).unwrap_or_default(),
        "Wrote job script"
    );

    Ok(path)
}

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;
