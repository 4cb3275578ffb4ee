use super::{ppn_from_queue_name, QueueError, ResourceRequest, Scheduler};

fn request() -> ResourceRequest {
    ResourceRequest {
        queue: "q.testqueue16".to_owned(),
        job_name: "Si_phonon".to_owned(),
        nodes: 2,
        ppn: 16,
        walltime: None,
    }
}

#[test]
pub fn ppn_from_two_digit_suffix() {
    assert_eq!(ppn_from_queue_name("q.testqueue16"), Ok(16));
    assert_eq!(ppn_from_queue_name("q.express08"), Ok(8));
    assert_eq!(ppn_from_queue_name("24"), Ok(24));
}

#[test]
pub fn ppn_only_reads_last_two_characters() {
    assert_eq!(ppn_from_queue_name("q.big128"), Ok(28));
}

#[test]
pub fn malformed_queue_names_are_rejected() {
    assert_eq!(ppn_from_queue_name(""), Err(QueueError::Empty));
    assert!(matches!(
        ppn_from_queue_name("q.default"),
        Err(QueueError::MissingSuffix(_))
    ));
    assert!(matches!(
        ppn_from_queue_name("q.short6"),
        Err(QueueError::MissingSuffix(_))
    ));
    assert!(matches!(
        ppn_from_queue_name("6"),
        Err(QueueError::MissingSuffix(_))
    ));
    assert!(matches!(
        ppn_from_queue_name("q.idle00"),
        Err(QueueError::ZeroSuffix(_))
    ));
}

#[test]
pub fn pbs_directives() {
    let mut request = request();
    request.walltime = Some("24:00:00".to_owned());

    assert_eq!(
        Scheduler::Pbs.directives(&request),
        [
            "#PBS -q q.testqueue16",
            "#PBS -N Si_phonon",
            "#PBS -l nodes=2:ppn=16",
            "#PBS -l walltime=24:00:00",
            "#PBS -j oe",
        ]
    );
}

#[test]
pub fn slurm_directives_without_walltime() {
    assert_eq!(
        Scheduler::Slurm.directives(&request()),
        [
            "#SBATCH --partition=q.testqueue16",
            "#SBATCH --job-name=Si_phonon",
            "#SBATCH --nodes=2",
            "#SBATCH --ntasks-per-node=16",
        ]
    );
}

#[test]
pub fn processes_span_all_nodes() {
    assert_eq!(request().processes(), 32);
}
