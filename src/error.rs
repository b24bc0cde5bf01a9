/// Failures of the prediction core. Both are returned, never panicked.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("insufficient data: {qualifying} qualifying cycle(s), at least 2 required")]
    InsufficientData { qualifying: usize },
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: i64 },
}
