use std::path::Path;

use instr_sampler::config::{Opts, Proc, RunConfig};
use instr_sampler::count::Counter;
use instr_sampler::event::sw::Software;
use instr_sampler::process::Exit;
use instr_sampler::sampler::{run, Discipline};

fn counter_available() -> bool {
    match Counter::new(Software::TaskClock, Proc::CURRENT, &Opts::user_only()) {
        Ok(_) => true,
        Err(e) => {
            println!("no task clock counter ({}), skipping", e);
            false
        }
    }
}

#[test]
fn test_all_disciplines_on_true() {
    if !counter_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut config = RunConfig {
        output: dir.path().join("output"),
        event: Software::TaskClock.into(),
        ..Default::default()
    };
    config.signal.period = 100_000;
    config.ring.period = 100_000;

    let reports: Vec<_> = Discipline::ALL
        .into_iter()
        .map(|it| run(it, &config, Path::new("/bin/true"), &[]).unwrap())
        .collect();

    for (report, discipline) in reports.iter().zip(Discipline::ALL) {
        assert_eq!(report.discipline, discipline);
        assert_eq!(report.exit, Exit::Code(0));
        assert!(report.total > 0, "{} counted nothing", discipline);
        assert_ne!(report.pid, 0);
    }
    // Every run starts a fresh workload.
    assert_ne!(reports[0].pid, reports[1].pid);
    assert_ne!(reports[1].pid, reports[2].pid);
}

#[test]
fn test_missing_workload() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        output: dir.path().join("output"),
        ..Default::default()
    };

    let report = run(
        Discipline::Signal,
        &config,
        Path::new("/nonexistent/workload"),
        &[],
    )
    .unwrap();
    assert!(!report.measured);
    assert!(report.suspect());
    assert_eq!(report.total, 0);
}
