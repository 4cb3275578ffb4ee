use crate::displacement::{DisplacementIndex, DisplacementSet};
use itertools::Itertools;
use std::{
    collections::BTreeSet,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_LEDGER: &str = "completed.ledger";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to record index {index} in ledger {path:?}: {source}")]
    Write {
        path: PathBuf,
        index: String,
        source: io::Error,
    },
}

/// Append-only record of completed displacement indices, one per line
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    completed: BTreeSet<u32>,
}

impl Ledger {
    /// open the ledger at `path`, a missing file is an empty ledger
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let completed = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(LedgerError::Read { path, source }),
        };

        debug!(path = ?path, completed = completed.len(), "Loaded ledger");

        Ok(Self { path, completed })
    }

    fn parse(path: &Path, content: &str) -> BTreeSet<u32> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match line.parse::<u32>() {
                Ok(index) => Some(index),
                Err(_) => {
                    warn!(path = ?path, line = line, "Ignoring malformed ledger line");
                    None
                }
            })
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, index: DisplacementIndex) -> bool {
        self.completed.contains(&index.value())
    }

    /// append `index` and flush, so an interrupted run keeps its progress
    pub fn record(&mut self, index: DisplacementIndex) -> Result<(), LedgerError> {
        let into_error = |source: io::Error| LedgerError::Write {
            path: self.path.clone(),
            index: index.to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(into_error)?;
        writeln!(file, "{index}").map_err(into_error)?;
        file.flush().map_err(into_error)?;

        self.completed.insert(index.value());

        Ok(())
    }

    pub fn completed<'a>(
        &'a self,
        set: &'a DisplacementSet,
    ) -> impl Iterator<Item = DisplacementIndex> + 'a {
        set.indices().filter(|index| self.contains(*index))
    }

    pub fn missing<'a>(
        &'a self,
        set: &'a DisplacementSet,
    ) -> impl Iterator<Item = DisplacementIndex> + 'a {
        set.indices().filter(|index| !self.contains(*index))
    }

    /// recorded indices that lie outside of `set`, usually left over from a different job
    pub fn stray(&self, set: &DisplacementSet) -> Vec<u32> {
        self.completed
            .iter()
            .copied()
            .filter(|&index| index == 0 || index > set.count)
            .collect_vec()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod ledger_test;
