//! Runs generated job scripts with bash against a stand-in for the DFT program
#![cfg(unix)]

use phonon_runner::{
    config::{FailurePolicy, JobConfig},
    plan::JobPlan,
    script::generate,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tempfile::TempDir;

const FAKE_PROGRAM: &str = "#!/bin/sh
grep -q fail POSCAR && exit 3
cp POSCAR vasprun.xml && echo wavefunctions > WAVECAR
";

fn config(dir: &Path, count: i64) -> JobConfig {
    let mut config = JobConfig::default();
    config.job.label = Some("Si_phonon".to_owned());
    config.job.queue = Some("q.testqueue16".to_owned());
    config.displacements.count = Some(count);
    config.displacements.inputs = Some(dir.to_path_buf());
    config.program.launcher = String::new();
    config.program.command = "sh fake_vasp.sh".to_owned();
    config.output.directory = dir.to_path_buf();
    config
}

fn workdir(inputs: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fake_vasp.sh"), FAKE_PROGRAM).unwrap();
    for (i, content) in inputs.iter().enumerate() {
        fs::write(dir.path().join(format!("POSCAR-{:03}", i + 1)), content).unwrap();
    }
    dir
}

fn write_script(config: &JobConfig) -> PathBuf {
    generate(&JobPlan::from_config(config).unwrap()).unwrap()
}

/// run the script the way the scheduler would, returning its exit code
fn submit(script: &Path, dir: &Path) -> Option<i32> {
    Command::new("bash")
        .arg(script)
        .current_dir(dir)
        .env("PBS_O_WORKDIR", dir)
        .output()
        .unwrap()
        .status
        .code()
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn si_phonon_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 6);
    config.displacements.inputs = None;
    config.program = JobConfig::default().program;
    config.output.directory = dir.path().join("job");

    let script = write_script(&config);
    let text = fs::read_to_string(&script).unwrap();

    assert_eq!(script, dir.path().join("job").join("Si_phonon.sh"));
    assert!(text.contains("#PBS -l nodes=1:ppn=16\n"));
    assert!(text.contains("\nfor index in 001 002 003 004 005 006; do\n"));
    assert!(!text.contains("000"));
    assert!(!text.contains("007"));
}

#[test]
fn all_displacements_are_archived() {
    let dir = workdir(&["Si 1\n", "Si 2\n", "Si 3\n"]);
    let script = write_script(&config(dir.path(), 3));

    assert_eq!(submit(&script, dir.path()), Some(0));

    for index in ["001", "002", "003"] {
        assert!(dir.path().join(format!("vasprun.xml-{index}")).is_file());
    }
    assert_eq!(read(dir.path(), "vasprun.xml-003"), "Si 3\n");
    assert_eq!(read(dir.path(), "completed.ledger"), "001\n002\n003\n");
    assert!(!dir.path().join("POSCAR").exists());
    assert!(!dir.path().join("WAVECAR").exists());
}

#[test]
fn failing_displacement_aborts_with_its_status() {
    let dir = workdir(&["Si 1\n", "fail\n", "Si 3\n"]);
    let script = write_script(&config(dir.path(), 3));

    assert_eq!(submit(&script, dir.path()), Some(3));

    assert!(dir.path().join("vasprun.xml-001").is_file());
    assert!(!dir.path().join("vasprun.xml-002").exists());
    assert!(!dir.path().join("vasprun.xml-003").exists());
    assert_eq!(read(dir.path(), "completed.ledger"), "001\n");
    assert!(!dir.path().join("POSCAR").exists());

    // resubmitting after fixing the input picks up where the job stopped
    fs::write(dir.path().join("POSCAR-002"), "Si 2\n").unwrap();
    assert_eq!(submit(&script, dir.path()), Some(0));
    assert_eq!(read(dir.path(), "completed.ledger"), "001\n002\n003\n");
    assert_eq!(read(dir.path(), "vasprun.xml-002"), "Si 2\n");
}

#[test]
fn warn_policy_skips_failing_displacement() {
    let dir = workdir(&["Si 1\n", "fail\n", "Si 3\n"]);
    let mut config = config(dir.path(), 3);
    config.on_failure = FailurePolicy::Warn;
    let script = write_script(&config);

    assert_eq!(submit(&script, dir.path()), Some(0));

    assert!(dir.path().join("vasprun.xml-001").is_file());
    assert!(!dir.path().join("vasprun.xml-002").exists());
    assert!(dir.path().join("vasprun.xml-003").is_file());
    assert_eq!(read(dir.path(), "completed.ledger"), "001\n003\n");
    assert!(!dir.path().join("POSCAR").exists());
}

#[test]
fn input_count_must_match_files_present() {
    let dir = workdir(&["Si 1\n", "Si 2\n"]);

    assert!(JobPlan::from_config(&config(dir.path(), 3)).is_err());
}
