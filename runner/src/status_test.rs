use super::progress;
use crate::plan::{plan_test::si_config, JobPlan};
use std::fs;

#[test]
pub fn progress_from_ledger() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("completed.ledger"), "001\n003\n009\n").unwrap();
    let plan = JobPlan::from_config(&si_config(4)).unwrap();

    let progress = progress(&plan, dir.path()).unwrap();

    assert_eq!(progress.completed, ["001", "003"]);
    assert_eq!(progress.missing, ["002", "004"]);
    assert!(!progress.is_done());
    assert_eq!(progress.to_string(), "completed 2/4\nmissing: 002 004\n");
}

#[test]
pub fn progress_from_archives_without_ledger() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vasprun.xml-001"), "<modeling/>").unwrap();
    fs::write(dir.path().join("vasprun.xml-002"), "<modeling/>").unwrap();
    let mut config = si_config(2);
    config.ledger = None;
    let plan = JobPlan::from_config(&config).unwrap();

    let progress = progress(&plan, dir.path()).unwrap();

    assert!(progress.is_done());
    assert_eq!(progress.to_string(), "completed 2/2\n");
}
