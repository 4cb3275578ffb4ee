use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, error};

/// Input copied to the fixed staging name, removed together with the scratch files on drop
#[derive(Debug)]
pub struct StagedInput {
    staged: PathBuf,
    scratch: Vec<PathBuf>,
}

impl StagedInput {
    pub fn stage(
        input: &Path,
        workdir: &Path,
        staging: &str,
        scratch: &[String],
    ) -> io::Result<Self> {
        let staged = workdir.join(staging);
        let scratch = scratch.iter().map(|name| workdir.join(name)).collect();

        // the guard exists before the copy so a partial copy is cleaned up as well
        let guard = Self { staged, scratch };
        fs::copy(input, &guard.staged)?;

        debug!(input = ?input, staged = ?guard.staged, "Staged input");

        Ok(guard)
    }
}

fn remove(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = ?path, "Removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(error = ?e, path = ?path, "Failed to remove staged or scratch file"),
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        remove(&self.staged);
        self.scratch.iter().for_each(|path| remove(path));
    }
}
