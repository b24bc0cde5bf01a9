use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::error::PredictionError;
use crate::models::{CycleRecord, CycleStatistics, PredictionSet};
use crate::statistics::{self, MIN_QUALIFYING_CYCLES, STATISTICS_WINDOW};

pub const DEFAULT_LUTEAL_PHASE_DAYS: i64 = 14;

/// Predictions are never treated as certain.
pub const MAX_PERIOD_CONFIDENCE: f64 = 0.95;

// Fixed regardless of history size or variability. Period confidence accounts
// for both; whether ovulation confidence should too is unresolved.
pub const OVULATION_CONFIDENCE: f64 = 0.7;

const BASE_CONFIDENCE: f64 = 0.5;
const REGULARITY_CEILING: f64 = 0.5;
const DATA_VOLUME_PER_CYCLE: f64 = 0.05;
const DATA_VOLUME_CAP: f64 = 0.3;

/// Fertile window spans the five days before ovulation plus ovulation day.
const FERTILE_DAYS_BEFORE_OVULATION: u64 = 5;
const PMS_DAYS_BEFORE_PERIOD: u64 = 10;

/// Generate the next-cycle predictions from a newest-first history and its statistics.
///
/// `cycles[0]` must be the newest cycle; nothing is re-sorted here.
pub fn predict(
    cycles: &[CycleRecord],
    statistics: &CycleStatistics,
    luteal_phase_length_days: i64,
) -> Result<PredictionSet, PredictionError> {
    predict_at(cycles, statistics, luteal_phase_length_days, Utc::now())
}

/// Same as [`predict`] with an explicit generation timestamp.
pub fn predict_at(
    cycles: &[CycleRecord],
    statistics: &CycleStatistics,
    luteal_phase_length_days: i64,
    computed_at: DateTime<Utc>,
) -> Result<PredictionSet, PredictionError> {
    validate_luteal_phase(luteal_phase_length_days)?;

    let qualifying = statistics::qualifying_count(cycles);
    if qualifying < MIN_QUALIFYING_CYCLES {
        return Err(PredictionError::InsufficientData { qualifying });
    }
    let latest = &cycles[0];

    let average_days = statistics.average_length_days.round();
    let next_period_date = add_days(latest.start_date, average_days as i64).ok_or(
        PredictionError::InvalidParameter {
            name: "average_length_days",
            value: average_days as i64,
        },
    )?;

    let luteal = luteal_phase_length_days as u64;
    let next_ovulation_date = next_period_date.checked_sub_days(Days::new(luteal)).ok_or(
        PredictionError::InvalidParameter {
            name: "luteal_phase_length_days",
            value: luteal_phase_length_days,
        },
    )?;
    let fertile_window_start = next_ovulation_date
        .checked_sub_days(Days::new(FERTILE_DAYS_BEFORE_OVULATION))
        .ok_or(PredictionError::InvalidParameter {
            name: "luteal_phase_length_days",
            value: luteal_phase_length_days,
        })?;
    let pms_start_date = next_period_date
        .checked_sub_days(Days::new(PMS_DAYS_BEFORE_PERIOD))
        .ok_or(PredictionError::InvalidParameter {
            name: "average_length_days",
            value: average_days as i64,
        })?;

    let considered = cycles.len().min(STATISTICS_WINDOW);
    let next_period_confidence = period_confidence(statistics.variability_ratio, considered);

    tracing::debug!(
        %next_period_date,
        confidence = next_period_confidence,
        considered,
        "prediction generated"
    );

    Ok(PredictionSet {
        next_period_date,
        next_period_confidence,
        next_ovulation_date,
        next_ovulation_confidence: OVULATION_CONFIDENCE,
        fertile_window_start,
        fertile_window_end: next_ovulation_date,
        pms_start_date,
        average_cycle_length_days: statistics.average_length_days,
        cycle_variability_ratio: statistics.variability_ratio,
        computed_at,
    })
}

/// Statistics and prediction in one step.
pub fn forecast(
    cycles: &[CycleRecord],
    luteal_phase_length_days: i64,
) -> Result<PredictionSet, PredictionError> {
    validate_luteal_phase(luteal_phase_length_days)?;
    let stats = statistics::compute_statistics(cycles)?;
    predict(cycles, &stats, luteal_phase_length_days)
}

/// Confidence in the next period date, in `[0, MAX_PERIOD_CONFIDENCE]`.
///
/// Base 0.5, plus up to 0.5 for regularity (falling linearly with the
/// variability ratio), plus 0.05 per cycle considered capped at 0.3.
pub fn period_confidence(variability_ratio: f64, cycles_considered: usize) -> f64 {
    let regularity = (REGULARITY_CEILING - variability_ratio).max(0.0);
    let data_volume = (cycles_considered as f64 * DATA_VOLUME_PER_CYCLE).min(DATA_VOLUME_CAP);
    (BASE_CONFIDENCE + regularity + data_volume).clamp(0.0, MAX_PERIOD_CONFIDENCE)
}

fn validate_luteal_phase(days: i64) -> Result<(), PredictionError> {
    if days <= 0 {
        return Err(PredictionError::InvalidParameter {
            name: "luteal_phase_length_days",
            value: days,
        });
    }
    Ok(())
}

fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}
