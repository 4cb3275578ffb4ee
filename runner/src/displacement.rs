use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PREFIX: &str = "POSCAR-";
pub const DEFAULT_WIDTH: usize = 3;

/// A single displacement index, formatted zero-padded to the width of its set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplacementIndex {
    value: u32,
    width: usize,
}

impl DisplacementIndex {
    pub fn new(value: u32, width: usize) -> Self {
        Self { value, width }
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl fmt::Display for DisplacementIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.width)
    }
}

/// The numbered input sequence written by the upstream displacement generator
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DisplacementSet {
    pub prefix: String,
    pub width: usize,
    pub count: u32,
}

impl DisplacementSet {
    pub fn new(prefix: impl Into<String>, width: usize, count: u32) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            count,
        }
    }

    /// largest count representable with `width` digits, bounded by the index type
    pub fn capacity(width: usize) -> u64 {
        (10u64.saturating_pow(width.min(19) as u32) - 1).min(u64::from(u32::MAX))
    }

    /// indices 1..=count, never 0
    pub fn indices(&self) -> impl Iterator<Item = DisplacementIndex> + '_ {
        (1..=self.count).map(move |value| DisplacementIndex::new(value, self.width))
    }

    pub fn index(&self, value: u32) -> DisplacementIndex {
        DisplacementIndex::new(value, self.width)
    }

    pub fn input_name(&self, index: DisplacementIndex) -> String {
        format!("{}{}", self.prefix, index)
    }

    pub fn first(&self) -> Option<DisplacementIndex> {
        self.indices().next()
    }

    pub fn last(&self) -> Option<DisplacementIndex> {
        (self.count > 0).then(|| self.index(self.count))
    }
}

#[cfg(test)]
#[path = "displacement_test.rs"]
mod displacement_test;
