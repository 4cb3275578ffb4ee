use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use itertools::Itertools;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Glob for displacement inputs was invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error("Input directory {0:?} not found")]
    NotADirectory(PathBuf),
    #[error("No displacement inputs matching '{prefix}' found in {dir:?}")]
    Empty { dir: PathBuf, prefix: String },
    #[error("Displacement inputs contain index 0, numbering must start at 1")]
    ZeroIndex,
    #[error("Displacement inputs are not contiguous, missing: {}", .missing.iter().join(", "))]
    Gaps { missing: Vec<String> },
}

/// Finds the numbered displacement inputs in a directory
#[derive(Debug)]
pub struct Collector {
    glob: GlobMatcher,
    prefix: String,
    width: usize,
}

/// Indices found by a single scan
#[derive(Debug, Clone)]
pub struct Scan {
    pub dir: PathBuf,
    pub prefix: String,
    pub width: usize,
    pub indices: BTreeSet<u32>,
}

impl Collector {
    /// the prefix is expected to be free of glob metacharacters, see `config::is_file_name_safe`
    pub fn new(prefix: &str, width: usize) -> Result<Self, CollectorError> {
        let pattern = format!("{prefix}{}", "?".repeat(width));
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()?
            .compile_matcher();

        debug!("Filtering with glob: {glob:?}");

        Ok(Self {
            glob,
            prefix: prefix.to_owned(),
            width,
        })
    }

    /// parse the index out of a file name, the suffix has to be exactly `width` digits
    pub fn parse_index(&self, file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(self.prefix.as_str())
            .filter(|suffix| suffix.len() == self.width)
            .filter(|suffix| suffix.bytes().all(|byte| byte.is_ascii_digit()))
            .and_then(|suffix| suffix.parse().ok())
    }

    /// non-recursive scan of `dir`, symlinked inputs count as the files they point to
    pub fn scan(&self, dir: &Path) -> Result<Scan, CollectorError> {
        if !dir.is_dir() {
            return Err(CollectorError::NotADirectory(dir.to_path_buf()));
        }

        let indices = WalkBuilder::new(dir)
            .max_depth(Some(1))
            .follow_links(true)
            .standard_filters(false)
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read entry while scanning for displacements: {e}");
                    None
                }
            })
            .filter(|entry| entry.depth() == 1)
            .filter(|entry| entry.file_type().map_or(false, |kind| kind.is_file()))
            .filter(|entry| self.glob.is_match(entry.file_name()))
            .filter_map(|entry| {
                let index = entry.file_name().to_str().and_then(|name| self.parse_index(name));
                if index.is_none() {
                    debug!(path = ?entry.path(), "Skipped, suffix is not a displacement index");
                }
                index
            })
            .collect::<BTreeSet<_>>();

        debug!(dir = ?dir, found = indices.len(), "Finished scanning for displacements");

        Ok(Scan {
            dir: dir.to_path_buf(),
            prefix: self.prefix.clone(),
            width: self.width,
            indices,
        })
    }
}

impl Scan {
    /// number of displacements, provided the indices are exactly 1..=N
    pub fn contiguous_count(&self) -> Result<u32, CollectorError> {
        let last = match self.indices.iter().next_back() {
            Some(&last) => last,
            None => {
                return Err(CollectorError::Empty {
                    dir: self.dir.clone(),
                    prefix: self.prefix.clone(),
                })
            }
        };

        if self.indices.contains(&0) {
            return Err(CollectorError::ZeroIndex);
        }

        let missing = (1..=last)
            .filter(|index| !self.indices.contains(index))
            .map(|index| format!("{}{index:0width$}", self.prefix, width = self.width))
            .collect_vec();

        if missing.is_empty() {
            Ok(last)
        } else {
            Err(CollectorError::Gaps { missing })
        }
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod collector_test;
