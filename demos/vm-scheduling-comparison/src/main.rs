use clap::Parser;
use log::info;

use cloudsched::core::config::SimulationConfig;
use cloudsched::experiment::ComparisonExperiment;

/// Runs the same scenario under time-shared and space-shared scheduling and
/// reports which policy wins on makespan and average execution time.
#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// Path to the scenario configuration file
    #[clap(long, default_value = "config.yaml")]
    config: String,

    /// Random seed shared by both policy runs
    #[clap(long, default_value_t = 123)]
    seed: u64,

    /// Directory for per-run traces and the results file
    #[clap(long)]
    log_dir: Option<String>,

    /// Number of worker threads for the policy runs
    #[clap(long, default_value_t = 2)]
    threads: usize,
}

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() {
    init_logger();
    let args = Args::parse();

    let config = match SimulationConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
    };

    let mut experiment = ComparisonExperiment::new(config, args.seed);
    if let Some(log_dir) = &args.log_dir {
        experiment = experiment.with_log_dir(log_dir).with_log_level(log::Level::Debug);
    }
    let comparison = experiment.run(args.threads);

    info!("all simulations completed");
    println!("{}", comparison);
}
