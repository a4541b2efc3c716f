//! Built-in networks for exercising the engine from the command line.

use clap::ValueEnum;
use millrace_engine::{
    ArrivalSpec, BatchKey, Branch, BuildError, Distribution, Environment, NetworkBuilder,
};
use std::fmt;
use std::time::Duration;

/// Selectable test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Case {
    /// Constant arrivals straight into a dispose, no contention.
    Deterministic,
    /// M/M/1 queue at 80% load.
    SingleServer,
    /// Two-station line with an inspection rework loop.
    Line,
    /// Pallet building: batch four items, then a packing crew.
    Batching,
}

impl Case {
    /// Build the case's environment with the given base seed.
    pub fn build(self, seed: u64) -> Result<Environment, BuildError> {
        let network = match self {
            Case::Deterministic => deterministic(),
            Case::SingleServer => single_server(),
            Case::Line => line(),
            Case::Batching => batching(),
        }?;
        Ok(Environment::new(network, seed))
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Case::Deterministic => "deterministic",
            Case::SingleServer => "single-server",
            Case::Line => "line",
            Case::Batching => "batching",
        };
        f.write_str(name)
    }
}

/// One entity per second, disposed immediately. Useful as a smoke test:
/// every statistic is predictable by hand.
fn deterministic() -> Result<millrace_engine::Network, BuildError> {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    net.arrival(
        "ticks",
        ArrivalSpec::new("tick", Distribution::Constant(1.0)),
        done,
    );
    net.build()
}

/// Exponential arrivals (rate 1.0) into a single server with exponential
/// service (rate 1.25), so the offered load is 0.8.
fn single_server() -> Result<millrace_engine::Network, BuildError> {
    let mut net = NetworkBuilder::new();
    let server = net.resource("server", 1);
    let done = net.dispose("done");
    let station = net.process(
        "station",
        server,
        Distribution::Exponential { rate: 1.25 },
        done,
    );
    net.arrival(
        "customers",
        ArrivalSpec::new("customer", Distribution::Exponential { rate: 1.0 }),
        station,
    );
    net.build()
}

/// Two stations in series with an inspection step that sends 10% of
/// entities back through the second station.
fn line() -> Result<millrace_engine::Network, BuildError> {
    let mut net = NetworkBuilder::new();
    let lathe = net.resource("lathe", 2);
    let polisher = net.resource("polisher", 1);
    let done = net.dispose("shipped");

    let polish = net.reserve("polish");
    let inspect = net.decide_by_chance(
        "inspect",
        vec![Branch::new(0.1, polish), Branch::new(0.9, done)],
    );
    net.define(
        polish,
        millrace_engine::ModuleKind::Process {
            resource: polisher,
            service: Distribution::Triangular {
                low: 0.5,
                mode: 0.8,
                high: 1.4,
            },
            next: inspect,
        },
    );
    let turn = net.process(
        "turn",
        lathe,
        Distribution::Triangular {
            low: 1.0,
            mode: 1.5,
            high: 2.5,
        },
        polish,
    );
    net.arrival(
        "blanks",
        ArrivalSpec::new("part", Distribution::Exponential { rate: 0.9 }),
        turn,
    );
    net.build()
}

/// Items accumulate into pallets of four, and each pallet is wrapped by a
/// two-person packing crew before shipping.
fn batching() -> Result<millrace_engine::Network, BuildError> {
    let mut net = NetworkBuilder::new();
    let crew = net.resource("crew", 2);
    let done = net.dispose("shipped");
    let wrap = net.process(
        "wrap",
        crew,
        Distribution::Uniform { low: 2.0, high: 4.0 },
        done,
    );
    let palletize = net.batch("palletize", 4, BatchKey::None, wrap);
    net.arrival(
        "items",
        ArrivalSpec::new("item", Distribution::Exponential { rate: 2.0 })
            .with_first_arrival(Duration::from_secs_f64(0.5)),
        palletize,
    );
    net.build()
}
