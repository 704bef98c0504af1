pub mod metrics;

pub use metrics::{compute_metrics, compute_metrics_with_index, Metrics};
