//! Batch jobs for phonon displacement calculations
//!
//! A phonon calculation runs an external DFT program once per displaced structure. The
//! displaced structures are numbered input files (`POSCAR-001`, `POSCAR-002`, ...), each of
//! which has to be copied to the fixed name the program reads, run, and its result archived
//! under a per-displacement name. This crate turns a job description into a [`plan::JobPlan`]
//! and either writes a scheduler script performing that loop ([`script::generate`]) or runs
//! the loop in-process ([`executors::local::LocalExecutor`]).

pub mod cli;
pub mod collector;
pub mod config;
pub mod displacement;
pub mod error;
pub mod executors;
pub mod ledger;
pub mod logging;
pub mod plan;
pub mod queue;
pub mod script;
pub mod status;
