//! On-device cycle statistics and prediction.
//!
//! [`statistics::compute_statistics`] reduces a newest-first cycle history to
//! length statistics and [`prediction::predict`] turns those into the next
//! period, ovulation, fertile window and PMS dates. Both are pure; storage is
//! reached only through the traits in [`store`].

pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod prediction;
pub mod service;
pub mod statistics;
pub mod status;
pub mod store;

pub use error::PredictionError;
pub use models::{CycleRecord, CycleStatistics, PredictionSet};
pub use prediction::{forecast, predict, DEFAULT_LUTEAL_PHASE_DAYS};
pub use statistics::compute_statistics;
