//! Statistics collection: counters, time-weighted levels, and the
//! per-entity metrics table.
//!
//! Counters are plain sums. Levels integrate their instantaneous value
//! over time, so an "average entities in system" is the integral of the
//! count divided by elapsed time, not a mean of samples. All integrals
//! are closed at exactly the replication end time by [`Collector::finalize`].

use millrace_types::{Entity, EntityRecord};
use std::collections::BTreeMap;
use std::time::Duration;

/// A time-weighted running statistic.
#[derive(Debug, Clone, Default)]
pub struct TimeWeighted {
    value: f64,
    peak: f64,
    integral: f64,
    last_change: Duration,
}

impl TimeWeighted {
    /// Shift the level by `delta` at `now`.
    pub fn add(&mut self, delta: f64, now: Duration) {
        self.advance(now);
        self.value += delta;
        self.peak = self.peak.max(self.value);
    }

    /// Current instantaneous value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Peak instantaneous value.
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Close the integral at `end` and return the time average.
    pub fn average(&mut self, end: Duration) -> f64 {
        self.advance(end);
        let elapsed = end.as_secs_f64();
        if elapsed > 0.0 {
            self.integral / elapsed
        } else {
            0.0
        }
    }

    fn advance(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_change).as_secs_f64();
        self.integral += self.value * dt;
        self.last_change = now;
    }
}

/// Accumulates system variables and entity records during a replication.
#[derive(Debug, Default)]
pub struct Collector {
    counters: BTreeMap<String, f64>,
    levels: BTreeMap<String, TimeWeighted>,
    records: Vec<EntityRecord>,
}

impl Collector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to a named counter.
    pub fn increment(&mut self, name: &str, amount: f64) {
        *self.counters.entry(name.to_owned()).or_insert(0.0) += amount;
    }

    /// Shift a named time-weighted level at `now`.
    pub fn adjust_level(&mut self, name: &str, delta: f64, now: Duration) {
        self.levels
            .entry(name.to_owned())
            .or_default()
            .add(delta, now);
    }

    /// Current value of a level, zero if never touched.
    pub fn level(&self, name: &str) -> f64 {
        self.levels.get(name).map_or(0.0, TimeWeighted::value)
    }

    /// Freeze a disposed entity into the metrics table.
    pub fn record_disposal(&mut self, entity: Entity, now: Duration) {
        self.increment("entities.disposed", 1.0);
        self.adjust_level("in_system", -1.0, now);
        self.records.push(entity.into_record(now));
    }

    /// Number of rows recorded so far.
    pub fn disposal_count(&self) -> usize {
        self.records.len()
    }

    /// Close every integral at `end` and return the system-variable map
    /// and the frozen metrics table.
    ///
    /// Zero disposals is a valid, degenerate outcome: cycle-time
    /// aggregates come back as zero and the table is empty.
    pub fn finalize(self, end: Duration) -> (BTreeMap<String, f64>, Vec<EntityRecord>) {
        let mut vars = self.counters;

        for (name, mut level) in self.levels {
            vars.insert(format!("{name}.average"), level.average(end));
            vars.insert(format!("{name}.peak"), level.peak());
        }

        // Entities still in the network at the end were abandoned, not
        // disposed; they contribute no rows.
        let created = vars.get("entities.created").copied().unwrap_or(0.0);
        let disposed = vars.get("entities.disposed").copied().unwrap_or(0.0);
        let batched_away = vars.get("entities.batched").copied().unwrap_or(0.0);
        let aggregates = vars.get("batches.formed").copied().unwrap_or(0.0);
        vars.entry("entities.created".into()).or_insert(0.0);
        vars.entry("entities.disposed".into()).or_insert(0.0);
        vars.insert(
            "entities.abandoned".into(),
            (created + aggregates - batched_away - disposed).max(0.0),
        );

        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max: f64 = 0.0;
        for record in &self.records {
            let cycle = record.cycle_time().as_secs_f64();
            total += cycle;
            min = min.min(cycle);
            max = max.max(cycle);
        }
        let count = self.records.len() as f64;
        vars.insert("cycle_time.total".into(), total);
        vars.insert(
            "cycle_time.average".into(),
            if count > 0.0 { total / count } else { 0.0 },
        );
        vars.insert(
            "cycle_time.min".into(),
            if count > 0.0 { min } else { 0.0 },
        );
        vars.insert("cycle_time.max".into(), max);

        (vars, self.records)
    }
}
