//! Metrics and observability
//!
//! Atomic counters for the hot path; a periodic server task logs a
//! snapshot alongside pool occupancy.

mod counters;

pub use counters::{Metrics, MetricsSnapshot, METRICS};
