use cloudsched::core::cloudlet::{CloudletRecord, CloudletStatus};
use cloudsched::core::common::SchedulingPolicy;
use cloudsched::core::metrics::{compare, Recommendation, RunOutcome, RunStats};

fn record(id: u32, status: CloudletStatus, start: f64, finish: f64) -> CloudletRecord {
    CloudletRecord {
        id,
        status,
        vm_id: Some(0),
        execution_time: if status == CloudletStatus::Success {
            finish - start
        } else {
            0.
        },
        start_time: start,
        finish_time: finish,
    }
}

fn outcome(policy: SchedulingPolicy, records: Vec<CloudletRecord>) -> RunOutcome {
    let stats = RunStats::from_records(&records, 3.0);
    RunOutcome {
        policy,
        records,
        stats,
        wall_time: 0.1,
    }
}

#[test]
fn test_stats_aggregation() {
    let records = vec![
        record(0, CloudletStatus::Success, 0., 40.),
        record(1, CloudletStatus::Success, 0., 80.),
        record(2, CloudletStatus::Failed, -1., 5.),
    ];
    let stats = RunStats::from_records(&records, 3.0);

    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.avg_execution_time, 60.);
    assert_eq!(stats.makespan, 80.);
    // 120 cpu-seconds at 3.0 per second
    assert_eq!(stats.cpu_cost, 360.);
}

#[test]
// Failed cloudlets contribute to the makespan but not to the average.
fn test_stats_with_failures_only() {
    let records = vec![record(0, CloudletStatus::Failed, -1., 0.)];
    let stats = RunStats::from_records(&records, 3.0);
    assert_eq!(stats.success_count, 0);
    assert_eq!(stats.avg_execution_time, 0.);
    assert_eq!(stats.cpu_cost, 0.);
}

#[test]
// A policy is preferred outright only when it strictly wins on both metrics.
fn test_recommendation_on_strict_dominance() {
    let ts = outcome(
        SchedulingPolicy::TimeShared,
        vec![record(0, CloudletStatus::Success, 0., 50.)],
    );
    let ss = outcome(
        SchedulingPolicy::SpaceShared,
        vec![record(0, CloudletStatus::Success, 0., 100.)],
    );
    let comparison = compare(Some(ts), Some(ss));
    assert_eq!(
        comparison.recommendation,
        Recommendation::Preferred(SchedulingPolicy::TimeShared)
    );
}

#[test]
// Split metrics produce a trade-off with per-metric winners, no single
// winner declared.
fn test_recommendation_on_split_metrics() {
    // time-shared: makespan 100, avg 60; space-shared: makespan 120, avg 50
    let ts = outcome(
        SchedulingPolicy::TimeShared,
        vec![
            record(0, CloudletStatus::Success, 0., 100.),
            record(1, CloudletStatus::Success, 0., 20.),
        ],
    );
    let ss = outcome(
        SchedulingPolicy::SpaceShared,
        vec![
            record(0, CloudletStatus::Success, 100., 120.),
            record(1, CloudletStatus::Success, 0., 80.),
        ],
    );
    let comparison = compare(Some(ts), Some(ss));
    assert_eq!(
        comparison.recommendation,
        Recommendation::TradeOff {
            makespan_winner: Some(SchedulingPolicy::TimeShared),
            avg_time_winner: Some(SchedulingPolicy::SpaceShared),
        }
    );
}

#[test]
fn test_recommendation_on_equal_metrics() {
    let ts = outcome(
        SchedulingPolicy::TimeShared,
        vec![record(0, CloudletStatus::Success, 0., 100.)],
    );
    let ss = outcome(
        SchedulingPolicy::SpaceShared,
        vec![record(0, CloudletStatus::Success, 0., 100.)],
    );
    let comparison = compare(Some(ts), Some(ss));
    assert_eq!(
        comparison.recommendation,
        Recommendation::TradeOff {
            makespan_winner: None,
            avg_time_winner: None,
        }
    );
}

#[test]
// One failed run must not take down the comparison.
fn test_comparison_with_absent_sides() {
    let ss = outcome(
        SchedulingPolicy::SpaceShared,
        vec![record(0, CloudletStatus::Success, 0., 40.)],
    );
    let comparison = compare(None, Some(ss));
    assert_eq!(
        comparison.recommendation,
        Recommendation::OneSided(SchedulingPolicy::SpaceShared)
    );
    assert!(comparison.time_shared.is_none());
    assert_eq!(comparison.space_shared.unwrap().stats.success_count, 1);

    let comparison = compare(None, None);
    assert_eq!(comparison.recommendation, Recommendation::Inconclusive);
}

#[test]
// The report renders without panicking for every recommendation shape.
fn test_comparison_display() {
    let ts = outcome(
        SchedulingPolicy::TimeShared,
        vec![record(0, CloudletStatus::Success, 0., 50.)],
    );
    let comparison = compare(Some(ts), None);
    let report = format!("{}", comparison);
    assert!(report.contains("time-shared"));
    assert!(report.contains("recommendation"));
}
