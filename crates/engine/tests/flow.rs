//! End-to-end entity-flow behavior: the worked queueing examples, batch
//! boundary behavior, degenerate routing, and ordering guarantees.

use millrace_engine::{
    ArrivalSpec, BatchKey, Branch, Distribution, Environment, ModuleKind, NetworkBuilder,
};
use std::time::Duration;

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

/// Fixed interarrival of 1 feeding straight into dispose over 10 time
/// units: exactly ten entities, created at 0..=9, disposed the instant
/// they were created.
#[test]
fn test_deterministic_arrivals_straight_to_dispose() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(1.0)),
        done,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(10.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 10);
    for (i, record) in report.entity_metrics.iter().enumerate() {
        assert_eq!(record.created_at, secs(i as f64));
        assert_eq!(record.disposed_at, record.created_at);
    }
}

/// Capacity-1 station, arrivals at t=0 and t=0.5, service time 2.0.
/// First seizes at 0 and releases at 2; second waits 1.5, seizes at 2 on
/// the release, and is still in service at the cut-off. Over [0, 4] the
/// resource is continuously busy.
fn contention_env() -> Environment {
    let mut net = NetworkBuilder::new();
    let server = net.resource("server", 1);
    let done = net.dispose("done");
    let station = net.process("station", server, Distribution::Constant(2.0), done);
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(0.5)).with_max_arrivals(2),
        station,
    );
    Environment::new(net.build().unwrap(), 0)
}

#[test]
fn test_capacity_one_contention_utilization_and_wait() {
    let report = contention_env().run_simulation(secs(4.0)).unwrap();

    assert!((report.system_variables["resource.server.utilization"] - 1.0).abs() < 1e-9);
    assert!((report.system_variables["resource.server.wait.average"] - 1.5).abs() < 1e-9);

    // Only the first entity got through; the second's completion at t=4
    // falls on the cut-off and is abandoned.
    assert_eq!(report.entity_metrics.len(), 1);
    assert_eq!(report.entity_metrics[0].created_at, Duration::ZERO);
    assert_eq!(report.entity_metrics[0].disposed_at, secs(2.0));
    assert_eq!(report.system_variables["entities.abandoned"], 1.0);
}

#[test]
fn test_capacity_one_contention_both_complete_with_headroom() {
    let report = contention_env().run_simulation(secs(4.5)).unwrap();

    assert_eq!(report.entity_metrics.len(), 2);
    let first = &report.entity_metrics[0];
    let second = &report.entity_metrics[1];
    assert_eq!(first.disposed_at, secs(2.0));
    assert_eq!(second.created_at, secs(0.5));
    // Queued at 0.5, seized at 2.0 on the release, served until 4.0.
    assert_eq!(second.disposed_at, secs(4.0));
    assert!((report.system_variables["resource.server.wait.average"] - 1.5).abs() < 1e-9);
}

/// A batch of 3 that only ever sees 2 entities forwards nothing: no
/// aggregate, no metrics rows.
#[test]
fn test_partial_batch_is_abandoned() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    let gather = net.batch("gather", 3, BatchKey::None, done);
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(1.0)).with_max_arrivals(2),
        gather,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(100.0)).unwrap();
    assert!(report.entity_metrics.is_empty());
    assert_eq!(report.stats.batches_formed, 0);
    assert_eq!(report.system_variables["entities.abandoned"], 2.0);
}

#[test]
fn test_full_batch_forms_one_aggregate() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    let gather = net.batch("gather", 3, BatchKey::None, done);
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(1.0)).with_max_arrivals(3),
        gather,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(100.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 1);
    let aggregate = &report.entity_metrics[0];
    assert_eq!(aggregate.members.len(), 3);
    // Formed when the third member arrived at t=2.
    assert_eq!(aggregate.created_at, secs(2.0));
    assert_eq!(report.system_variables["entities.abandoned"], 0.0);
}

#[test]
fn test_batch_by_type_keeps_groups_apart() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    let gather = net.batch("gather", 2, BatchKey::EntityType, done);
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(1.0)).with_max_arrivals(2),
        gather,
    );
    net.arrival(
        "parts",
        ArrivalSpec::new("part", Distribution::Constant(1.0)).with_max_arrivals(1),
        gather,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(100.0)).unwrap();
    // Two orders batch together; the lone part never fills its group.
    assert_eq!(report.entity_metrics.len(), 1);
    assert_eq!(report.entity_metrics[0].entity_type, "order");
    assert_eq!(report.system_variables["entities.abandoned"], 1.0);
}

/// Branch weights 0 and 1 route every entity to the second branch, on
/// every trial.
#[test]
fn test_zero_weight_branch_is_never_taken() {
    let mut net = NetworkBuilder::new();
    let scrap = net.dispose("scrap");
    let ship = net.dispose("ship");
    let check = net.decide_by_chance(
        "check",
        vec![Branch::new(0.0, scrap), Branch::new(1.0, ship)],
    );
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Exponential { rate: 2.0 }),
        check,
    );
    let env = Environment::new(net.build().unwrap(), 31);

    let report = env.run_simulation(secs(100.0)).unwrap();
    assert!(!report.entity_metrics.is_empty());
    for record in &report.entity_metrics {
        assert!(record.visited("ship"));
        assert!(!record.visited("scrap"));
    }
}

#[test]
fn test_condition_routing_is_total() {
    use millrace_engine::Condition;

    let mut net = NetworkBuilder::new();
    let priority = net.dispose("priority");
    let regular = net.dispose("regular");
    let sort = net.decide_by_condition(
        "sort",
        vec![(Condition::TypeIs("rush".into()), priority)],
        regular,
    );
    net.arrival(
        "rush-orders",
        ArrivalSpec::new("rush", Distribution::Constant(2.0)).with_max_arrivals(2),
        sort,
    );
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(2.0)).with_max_arrivals(2),
        sort,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(100.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 4);
    for record in &report.entity_metrics {
        if record.entity_type == "rush" {
            assert!(record.visited("priority"));
        } else {
            assert!(record.visited("regular"));
        }
    }
}

/// Two arrivals firing at the same instant execute in scheduling order:
/// the first-declared root creates the first entity.
#[test]
fn test_simultaneous_events_execute_in_scheduling_order() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    net.arrival(
        "alpha",
        ArrivalSpec::new("alpha", Distribution::Constant(5.0)).with_max_arrivals(1),
        done,
    );
    net.arrival(
        "beta",
        ArrivalSpec::new("beta", Distribution::Constant(5.0)).with_max_arrivals(1),
        done,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(1.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 2);
    assert_eq!(report.entity_metrics[0].entity_type, "alpha");
    assert_eq!(report.entity_metrics[1].entity_type, "beta");
    assert_eq!(report.entity_metrics[0].created_at, Duration::ZERO);
    assert_eq!(report.entity_metrics[1].created_at, Duration::ZERO);
}

/// Disposal never precedes creation, under a stochastic rework loop.
#[test]
fn test_cycle_times_are_non_negative() {
    let mut net = NetworkBuilder::new();
    let server = net.resource("server", 1);
    let done = net.dispose("done");
    let station = net.reserve("station");
    let check = net.decide_by_chance(
        "check",
        vec![Branch::new(0.3, station), Branch::new(0.7, done)],
    );
    net.define(
        station,
        ModuleKind::Process {
            resource: server,
            service: Distribution::Uniform {
                low: 0.1,
                high: 0.9,
            },
            next: check,
        },
    );
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Exponential { rate: 1.5 }),
        station,
    );
    let env = Environment::new(net.build().unwrap(), 5);

    let report = env.run_simulation(secs(200.0)).unwrap();
    assert!(!report.entity_metrics.is_empty());
    for record in &report.entity_metrics {
        assert!(record.created_at <= record.disposed_at);
    }
    // Reworked entities pass the station more than once.
    assert!(report
        .entity_metrics
        .iter()
        .any(|r| r.visits.iter().filter(|v| v.module == "station").count() > 1));
    let utilization = report.system_variables["resource.server.utilization"];
    assert!((0.0..=1.0).contains(&utilization));
}

/// Entities per arrival greater than one creates a burst per firing.
#[test]
fn test_entities_per_arrival_bursts() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    net.arrival(
        "pallets",
        ArrivalSpec::new("pallet", Distribution::Constant(1.0))
            .with_entities_per_arrival(4)
            .with_max_arrivals(2),
        done,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(10.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 8);
    assert_eq!(report.stats.arrivals_fired, 2);
}

/// A first-arrival offset delays the whole stream.
#[test]
fn test_first_arrival_offset() {
    let mut net = NetworkBuilder::new();
    let done = net.dispose("done");
    net.arrival(
        "orders",
        ArrivalSpec::new("order", Distribution::Constant(1.0)).with_first_arrival(secs(3.0)),
        done,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(5.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 2);
    assert_eq!(report.entity_metrics[0].created_at, secs(3.0));
    assert_eq!(report.entity_metrics[1].created_at, secs(4.0));
}

/// Two process modules sharing one pool hand the freed unit to the queue
/// head regardless of which station released it.
#[test]
fn test_shared_resource_across_stations_keeps_fifo() {
    let mut net = NetworkBuilder::new();
    let crew = net.resource("crew", 1);
    let done = net.dispose("done");
    let fit = net.process("fit", crew, Distribution::Constant(3.0), done);
    let paint = net.process("paint", crew, Distribution::Constant(1.0), done);
    net.arrival(
        "bodies",
        ArrivalSpec::new("body", Distribution::Constant(10.0)).with_max_arrivals(1),
        paint,
    );
    net.arrival(
        "frames",
        ArrivalSpec::new("frame", Distribution::Constant(10.0))
            .with_first_arrival(secs(0.5))
            .with_max_arrivals(1),
        fit,
    );
    let env = Environment::new(net.build().unwrap(), 0);

    let report = env.run_simulation(secs(20.0)).unwrap();
    assert_eq!(report.entity_metrics.len(), 2);
    // Paint holds the crew over [0, 1); the frame waits at fit from 0.5,
    // seizes on the release, and finishes at 4.
    let frame = report
        .entity_metrics
        .iter()
        .find(|r| r.entity_type == "frame")
        .unwrap();
    assert_eq!(frame.disposed_at, secs(4.0));
    assert!((report.system_variables["resource.crew.wait.average"] - 0.5).abs() < 1e-9);
}
