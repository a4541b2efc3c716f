//! Command-line launcher for the millrace engine.
//!
//! Bundles a handful of ready-made networks (see [`Case`]) with console
//! and JSON report rendering, so engine behavior can be exercised without
//! writing a scenario by hand.

pub mod cases;
pub mod report;

pub use cases::Case;
pub use report::{cycle_percentiles, print_report, to_json, CyclePercentiles};
