//! Console and JSON rendering of replication reports.

use hdrhistogram::Histogram;
use millrace_engine::{EntityRecord, RunReport};

/// Cycle-time percentiles over the disposed-entity rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePercentiles {
    /// Median cycle time, seconds.
    pub p50: f64,
    /// 90th percentile, seconds.
    pub p90: f64,
    /// 99th percentile, seconds.
    pub p99: f64,
    /// Longest observed cycle time, seconds.
    pub max: f64,
}

/// Summarize cycle times with microsecond resolution.
///
/// Returns `None` when no entity was disposed.
pub fn cycle_percentiles(records: &[EntityRecord]) -> Option<CyclePercentiles> {
    if records.is_empty() {
        return None;
    }
    let mut hist = Histogram::<u64>::new(3).ok()?;
    for record in records {
        hist.record(record.cycle_time().as_micros() as u64).ok()?;
    }
    let secs = |us: u64| us as f64 / 1e6;
    Some(CyclePercentiles {
        p50: secs(hist.value_at_quantile(0.50)),
        p90: secs(hist.value_at_quantile(0.90)),
        p99: secs(hist.value_at_quantile(0.99)),
        max: secs(hist.max()),
    })
}

/// Print one replication's report as aligned console tables.
pub fn print_report(case: &str, replication: u64, report: &RunReport) {
    println!();
    println!("=== {case} — replication {replication} ===");
    println!();
    println!("System variables");
    for (name, value) in &report.system_variables {
        println!("  {name:<40} {value:>14.4}");
    }

    println!();
    println!("Entities");
    println!("  {:<40} {:>14}", "disposed rows", report.entity_metrics.len());
    if let Some(p) = cycle_percentiles(&report.entity_metrics) {
        println!("  {:<40} {:>14.4}", "cycle_time.p50", p.p50);
        println!("  {:<40} {:>14.4}", "cycle_time.p90", p.p90);
        println!("  {:<40} {:>14.4}", "cycle_time.p99", p.p99);
        println!("  {:<40} {:>14.4}", "cycle_time.max", p.max);
    }

    println!();
    println!("Engine counters");
    println!("  {:<40} {:>14}", "events processed", report.stats.events_processed);
    println!("  {:<40} {:>14}", "arrivals fired", report.stats.arrivals_fired);
    println!("  {:<40} {:>14}", "seizes", report.stats.seizes);
    println!("  {:<40} {:>14}", "waits queued", report.stats.waits_queued);
    println!("  {:<40} {:>14}", "batches formed", report.stats.batches_formed);
    println!("  {:<40} {:>14}", "branch draws", report.stats.branch_draws);
}

/// Serialize a report as pretty-printed JSON.
pub fn to_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
