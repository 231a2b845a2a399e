//! Run metrics and the cross-policy comparison engine.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::cloudlet::{CloudletRecord, CloudletStatus};
use crate::core::common::SchedulingPolicy;

/// Metrics aggregated over the cloudlets returned by one policy run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStats {
    /// Total number of returned cloudlets.
    pub total_count: usize,
    /// Number of cloudlets that reached `Success`.
    pub success_count: usize,
    /// Average `finish_time - start_time` over successful cloudlets, 0 if none.
    pub avg_execution_time: f64,
    /// Maximum finish time over all returned cloudlets, 0 if the list is empty.
    pub makespan: f64,
    /// Flat linear CPU cost: total execution time times the per-second price.
    pub cpu_cost: f64,
}

impl RunStats {
    pub fn from_records(records: &[CloudletRecord], cost_per_cpu_second: f64) -> Self {
        let mut success_count = 0;
        let mut total_execution_time = 0.;
        let mut makespan: f64 = 0.;
        for record in records {
            if record.status == CloudletStatus::Success {
                success_count += 1;
                total_execution_time += record.execution_time;
            }
            makespan = makespan.max(record.finish_time);
        }
        let avg_execution_time = if success_count > 0 {
            total_execution_time / success_count as f64
        } else {
            0.
        };
        Self {
            total_count: records.len(),
            success_count,
            avg_execution_time,
            makespan,
            cpu_cost: total_execution_time * cost_per_cpu_second,
        }
    }
}

/// Result of one policy run consumed by the comparison engine.
#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
    pub policy: SchedulingPolicy,
    /// Returned cloudlet records ordered by cloudlet id.
    pub records: Vec<CloudletRecord>,
    pub stats: RunStats,
    /// Wall-clock duration of the run in seconds.
    pub wall_time: f64,
}

/// Verdict of the comparison engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    /// One policy strictly wins on both makespan and average execution time.
    Preferred(SchedulingPolicy),
    /// Neither policy dominates, the metrics are reported as a trade-off.
    TradeOff {
        makespan_winner: Option<SchedulingPolicy>,
        avg_time_winner: Option<SchedulingPolicy>,
    },
    /// Only one run produced results.
    OneSided(SchedulingPolicy),
    /// No results are available.
    Inconclusive,
}

/// Cross-policy comparison of two runs of the same workload.
#[derive(Clone, Debug, Serialize)]
pub struct Comparison {
    pub time_shared: Option<RunOutcome>,
    pub space_shared: Option<RunOutcome>,
    pub recommendation: Recommendation,
}

/// Compares the outcomes of the two policy runs.
///
/// Tolerates one side being absent (failed run) and reports accordingly
/// instead of crashing.
pub fn compare(time_shared: Option<RunOutcome>, space_shared: Option<RunOutcome>) -> Comparison {
    let recommendation = match (&time_shared, &space_shared) {
        (Some(ts), Some(ss)) => recommend(&ts.stats, &ss.stats),
        (Some(_), None) => Recommendation::OneSided(SchedulingPolicy::TimeShared),
        (None, Some(_)) => Recommendation::OneSided(SchedulingPolicy::SpaceShared),
        (None, None) => Recommendation::Inconclusive,
    };
    Comparison {
        time_shared,
        space_shared,
        recommendation,
    }
}

// Metric values closer than EPSILON are treated as a tie, so accumulated
// float error cannot manufacture a winner.
fn winner(time_shared: f64, space_shared: f64) -> Option<SchedulingPolicy> {
    if time_shared < space_shared - simcore::EPSILON {
        Some(SchedulingPolicy::TimeShared)
    } else if space_shared < time_shared - simcore::EPSILON {
        Some(SchedulingPolicy::SpaceShared)
    } else {
        None
    }
}

fn recommend(ts: &RunStats, ss: &RunStats) -> Recommendation {
    let makespan_winner = winner(ts.makespan, ss.makespan);
    let avg_time_winner = winner(ts.avg_execution_time, ss.avg_execution_time);
    match (makespan_winner, avg_time_winner) {
        (Some(a), Some(b)) if a == b => Recommendation::Preferred(a),
        _ => Recommendation::TradeOff {
            makespan_winner,
            avg_time_winner,
        },
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for outcome in [&self.time_shared, &self.space_shared].into_iter().flatten() {
            writeln!(
                f,
                "{}: {}/{} successful, avg execution time {:.2}, makespan {:.2}, cpu cost {:.2}, runtime {:.3}s",
                outcome.policy,
                outcome.stats.success_count,
                outcome.stats.total_count,
                outcome.stats.avg_execution_time,
                outcome.stats.makespan,
                outcome.stats.cpu_cost,
                outcome.wall_time
            )?;
        }
        match &self.recommendation {
            Recommendation::Preferred(policy) => {
                writeln!(f, "recommendation: use {} for best results", policy)
            }
            Recommendation::TradeOff {
                makespan_winner,
                avg_time_winner,
            } => {
                writeln!(f, "recommendation: choose based on priority")?;
                if let Some(policy) = makespan_winner {
                    writeln!(f, "- {} gives a better makespan", policy)?;
                }
                if let Some(policy) = avg_time_winner {
                    writeln!(f, "- {} gives a better average execution time", policy)?;
                }
                Ok(())
            }
            Recommendation::OneSided(policy) => {
                writeln!(f, "recommendation: only the {} run produced results", policy)
            }
            Recommendation::Inconclusive => writeln!(f, "recommendation: no results available"),
        }
    }
}
