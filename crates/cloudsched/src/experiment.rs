//! Two-policy comparison experiment.

use std::fs;
use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indexmap::IndexMap;
use log::Level;
use threadpool::ThreadPool;

use simcore::Simulation;

use crate::core::cloudlet::CloudletRecord;
use crate::core::common::SchedulingPolicy;
use crate::core::config::SimulationConfig;
use crate::core::error::SimulationError;
use crate::core::logger::{FileLogger, Logger, StdoutLogger};
use crate::core::metrics::{compare, Comparison, RunOutcome, RunStats};
use crate::simulation::DatacenterSimulation;

/// Runs the same scenario once per scheduling policy and compares the outcomes.
///
/// The two runs are fully independent simulation contexts with no shared
/// mutable state, so they are dispatched on a thread pool. A fatal error in
/// one run does not discard the other run's results: the comparison engine
/// reports whatever sides are available.
pub struct ComparisonExperiment {
    config: SimulationConfig,
    seed: u64,
    log_dir: Option<String>,
    log_level: Level,
}

impl ComparisonExperiment {
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            log_dir: None,
            log_level: Level::Info,
        }
    }

    /// Enables per-run CSV traces and the results file in the given directory.
    pub fn with_log_dir(mut self, log_dir: &str) -> Self {
        self.log_dir = Some(log_dir.to_string());
        self
    }

    pub fn with_log_level(mut self, log_level: Level) -> Self {
        self.log_level = log_level;
        self
    }

    /// Executes both policy runs and produces the comparison report.
    pub fn run(&self, num_threads: usize) -> Comparison {
        if let Some(dir) = &self.log_dir {
            fs::create_dir_all(dir).unwrap();
        }

        let results: Arc<Mutex<Vec<(SchedulingPolicy, Result<RunOutcome, SimulationError>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads);

        for policy in [SchedulingPolicy::TimeShared, SchedulingPolicy::SpaceShared] {
            let config = self.config.clone();
            let seed = self.seed;
            let log_level = self.log_level;
            let log_file = self.log_dir.as_ref().map(|dir| format!("{}/{}-trace.csv", dir, policy));
            let results = results.clone();

            pool.execute(move || {
                let started = Instant::now();
                let outcome = run_policy(seed, &config, policy, log_file, log_level).map(|(records, stats)| {
                    RunOutcome {
                        policy,
                        records,
                        stats,
                        wall_time: started.elapsed().as_secs_f64(),
                    }
                });
                results.lock().unwrap().push((policy, outcome));
            });
        }
        pool.join();

        let collected = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        let mut time_shared = None;
        let mut space_shared = None;
        for (policy, outcome) in collected {
            match outcome {
                Ok(outcome) => match policy {
                    SchedulingPolicy::TimeShared => time_shared = Some(outcome),
                    SchedulingPolicy::SpaceShared => space_shared = Some(outcome),
                },
                Err(error) => log::error!("{} run failed: {}", policy, error),
            }
        }
        let comparison = compare(time_shared, space_shared);

        if let Some(dir) = &self.log_dir {
            if let Err(error) = save_results(dir, &comparison) {
                log::error!("can't save experiment results: {}", error);
            }
        }
        comparison
    }
}

fn run_policy(
    seed: u64,
    config: &SimulationConfig,
    policy: SchedulingPolicy,
    log_file: Option<String>,
    log_level: Level,
) -> Result<(Vec<CloudletRecord>, RunStats), SimulationError> {
    let logger: Box<dyn Logger> = if log_file.is_some() {
        Box::new(FileLogger::with_level(log_level))
    } else {
        Box::new(StdoutLogger::new())
    };
    let sim = Simulation::new(seed);
    let mut dc_sim = DatacenterSimulation::from_config_with_logger(sim, config, policy, logger)?;
    dc_sim.run()?;
    if let Some(path) = log_file {
        match dc_sim.save_log(&path) {
            Ok(_) => log::info!("{} run trace saved to {}", policy, path),
            Err(error) => log::error!("can't save {} run trace: {}", policy, error),
        }
    }
    Ok((dc_sim.received_cloudlets(), dc_sim.stats()))
}

fn save_results(dir: &str, comparison: &Comparison) -> Result<(), std::io::Error> {
    let mut rows: Vec<IndexMap<String, serde_json::Value>> = Vec::new();
    for outcome in [&comparison.time_shared, &comparison.space_shared].into_iter().flatten() {
        let mut row = IndexMap::new();
        row.insert("policy".to_string(), serde_json::json!(outcome.policy));
        row.insert("wall_time".to_string(), serde_json::json!(outcome.wall_time));
        row.insert("stats".to_string(), serde_json::to_value(&outcome.stats)?);
        row.insert("cloudlets".to_string(), serde_json::to_value(&outcome.records)?);
        rows.push(row);
    }
    let mut report = IndexMap::new();
    report.insert("runs".to_string(), serde_json::to_value(rows)?);
    report.insert(
        "recommendation".to_string(),
        serde_json::to_value(&comparison.recommendation)?,
    );
    let mut file = File::create(format!("{}/results.json", dir))?;
    serde_json::to_writer_pretty(&mut file, &report)?;
    Ok(())
}
