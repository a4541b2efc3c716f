//! `millrace-sim`: run a built-in network and print its report.

use clap::Parser;
use millrace_simulator::{print_report, to_json, Case};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "millrace-sim", version, about = "Discrete-event processing-network simulator")]
struct Cli {
    /// Built-in network to run.
    #[arg(long, value_enum, default_value_t = Case::SingleServer)]
    case: Case,

    /// Simulated duration in seconds.
    #[arg(long, default_value_t = 100.0)]
    duration: f64,

    /// Base random seed. The same seed reproduces the same report.
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Number of independent replications to run.
    #[arg(long, default_value_t = 1)]
    replications: u64,

    /// Emit each report as pretty-printed JSON instead of tables.
    #[arg(long)]
    json: bool,

    /// Enable debug-level engine logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !cli.duration.is_finite() || cli.duration < 0.0 {
        return Err(format!("duration must be a non-negative number, got {}", cli.duration).into());
    }
    let duration = Duration::from_secs_f64(cli.duration);

    let env = cli.case.build(cli.seed)?;
    info!(case = %cli.case, seed = cli.seed, replications = cli.replications, "Launching");

    for replication in 0..cli.replications {
        let report = env.run_replication(duration, replication)?;
        if cli.json {
            println!("{}", to_json(&report)?);
        } else {
            print_report(&cli.case.to_string(), replication, &report);
        }
    }
    Ok(())
}
