use super::{
    is_file_name_safe, is_label_valid, is_module_valid, ConfigErrors, FailurePolicy, JobConfig,
};
use crate::queue::Scheduler;
use std::path::PathBuf;

const FULL_CONFIG: &str = r#"
job:
  label: Si_phonon
  queue: q.testqueue16
  nodes: 2
  walltime: "24:00:00"
scheduler: slurm
environment:
  modules: [intel/2019, vasp/5.4.4]
displacements:
  count: 6
  prefix: POSCAR-
program:
  command: vasp_gam
  scratch: [WAVECAR]
on_failure: warn
ledger: null
output:
  directory: /tmp/job
"#;

#[test]
pub fn full_config_is_read() {
    let config = JobConfig::from_yaml(FULL_CONFIG).unwrap();

    assert_eq!(config.job.label.as_deref(), Some("Si_phonon"));
    assert_eq!(config.job.nodes, 2);
    assert_eq!(config.scheduler, Scheduler::Slurm);
    assert_eq!(config.environment.modules, ["intel/2019", "vasp/5.4.4"]);
    assert_eq!(config.displacements.count, Some(6));
    assert_eq!(config.displacements.width, 3);
    assert_eq!(config.program.command, "vasp_gam");
    // untouched program fields keep their defaults
    assert_eq!(config.program.staging, "POSCAR");
    assert_eq!(config.program.archive, "vasprun.xml-{index}");
    assert_eq!(config.on_failure, FailurePolicy::Warn);
    assert_eq!(config.ledger, None);
    assert_eq!(config.output.directory, PathBuf::from("/tmp/job"));
}

#[test]
pub fn empty_config_uses_defaults() {
    let config = JobConfig::from_yaml("{}").unwrap();

    assert_eq!(config.job.nodes, 1);
    assert_eq!(config.scheduler, Scheduler::Pbs);
    assert_eq!(config.on_failure, FailurePolicy::Abort);
    assert_eq!(config.ledger.as_deref(), Some("completed.ledger"));
    assert_eq!(config.program.launcher, "mpirun -np {np}");
    assert_eq!(config.output.script, "{label}.sh");
}

#[test]
pub fn unknown_fields_are_rejected() {
    assert!(JobConfig::from_yaml("job:\n  lable: typo\n").is_err());
    assert!(JobConfig::from_yaml("retries: 3\n").is_err());
}

#[test]
pub fn missing_config_file() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        JobConfig::from_file(&dir.path().join("job.yaml")),
        Err(ConfigErrors::Read { .. })
    ));
}

#[test]
pub fn labels() {
    assert!(is_label_valid("Si_phonon"));
    assert!(is_label_valid("GaAs-2x2x2.v1"));
    assert!(!is_label_valid(""));
    assert!(!is_label_valid("1st_run"));
    assert!(!is_label_valid("Si phonon"));
    assert!(!is_label_valid("Si;rm"));
}

#[test]
pub fn file_names() {
    assert!(is_file_name_safe("vasprun.xml", &[]));
    assert!(is_file_name_safe("vasprun.xml-{index}", &["{index}"]));
    assert!(!is_file_name_safe("vasprun.xml-{index}", &[]));
    assert!(!is_file_name_safe("results/vasprun.xml", &[]));
    assert!(!is_file_name_safe("-rf", &[]));
    assert!(!is_file_name_safe("..", &[]));
    assert!(!is_file_name_safe("a b", &[]));
    assert!(!is_file_name_safe("$HOME", &[]));
}

#[test]
pub fn module_names() {
    assert!(is_module_valid("vasp/5.4.4"));
    assert!(!is_module_valid("vasp 5"));
    assert!(!is_module_valid("--force"));
}
