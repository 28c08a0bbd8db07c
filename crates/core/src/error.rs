use crate::reading::Metric;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing thresholds for metric: {0}")]
    MissingMetric(Metric),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid thresholds for {metric}: warning {warning} must be below danger {danger}")]
    InvertedThresholds {
        metric: Metric,
        warning: f64,
        danger: f64,
    },

    #[error("Non-finite threshold for {0}")]
    NonFiniteThreshold(Metric),

    #[error("Validation failed: {0}")]
    Validation(String),
}
