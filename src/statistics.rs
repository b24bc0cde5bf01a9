use crate::error::PredictionError;
use crate::models::{
    CycleRecord, CycleStatistics, CycleSummary, MoodEnergySummary, StoredCycle, SymptomRecord,
};

/// Only the newest cycles feed statistics; older history is ignored.
pub const STATISTICS_WINDOW: usize = 12;

/// Minimum number of qualifying cycles before any statistic is reported.
pub const MIN_QUALIFYING_CYCLES: usize = 2;

/// How many recent cycles the mood and energy trend covers.
pub const MOOD_TREND_CYCLES: usize = 7;

/// Reduce a newest-first cycle list to length statistics.
///
/// Looks at the first [`STATISTICS_WINDOW`] entries and drops those without a
/// known positive length. Fewer than two survivors is `InsufficientData`.
pub fn compute_statistics(cycles: &[CycleRecord]) -> Result<CycleStatistics, PredictionError> {
    let lengths = window_lengths(cycles);

    if lengths.len() < MIN_QUALIFYING_CYCLES {
        return Err(PredictionError::InsufficientData {
            qualifying: lengths.len(),
        });
    }

    let average = mean(&lengths);
    let std_dev = population_std_deviation(&lengths, average);

    tracing::debug!(
        sample_size = lengths.len(),
        average,
        std_dev,
        "cycle statistics computed"
    );

    Ok(CycleStatistics {
        average_length_days: average,
        standard_deviation_days: std_dev,
        variability_ratio: std_dev / average,
        sample_size: lengths.len(),
    })
}

/// Number of cycles in the window that have a usable length.
pub fn qualifying_count(cycles: &[CycleRecord]) -> usize {
    window_lengths(cycles).len()
}

/// Summary figures for the analytics view, over every qualifying cycle given.
pub fn summarize(cycles: &[CycleRecord]) -> Option<CycleSummary> {
    let lengths: Vec<i64> = cycles
        .iter()
        .filter_map(CycleRecord::qualifying_length)
        .collect();

    let shortest = lengths.iter().copied().min()?;
    let longest = lengths.iter().copied().max()?;

    let values: Vec<f64> = lengths.iter().map(|l| *l as f64).collect();
    let average = mean(&values);
    let std_dev = population_std_deviation(&values, average);
    let consistency = (100.0 - std_dev / average * 100.0).max(0.0).round();

    Some(CycleSummary {
        total_cycles: lengths.len(),
        average_length_days: average,
        shortest_days: shortest,
        longest_days: longest,
        consistency_percent: consistency as u8,
    })
}

/// Mood and energy averages over one cycle's day logs, to one decimal.
///
/// `None` when the cycle has no logs.
pub fn mood_energy(cycle: &StoredCycle, logs: &[SymptomRecord]) -> Option<MoodEnergySummary> {
    if logs.is_empty() {
        return None;
    }
    let moods: Vec<f64> = logs.iter().map(|s| f64::from(s.entry.mood)).collect();
    let energies: Vec<f64> = logs.iter().map(|s| f64::from(s.entry.energy)).collect();

    Some(MoodEnergySummary {
        cycle_id: cycle.id,
        start_date: cycle.start_date,
        entries: logs.len(),
        average_mood: round_tenth(mean(&moods)),
        average_energy: round_tenth(mean(&energies)),
    })
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn window_lengths(cycles: &[CycleRecord]) -> Vec<f64> {
    cycles
        .iter()
        .take(STATISTICS_WINDOW)
        .filter_map(CycleRecord::qualifying_length)
        .map(|len| len as f64)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// N divisor: the window is the whole population of interest.
fn population_std_deviation(values: &[f64], avg: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Build a newest-first history ending at `newest` with the given lengths.
    fn history(newest: &str, lengths: &[i64]) -> Vec<CycleRecord> {
        let mut start = date(newest);
        let mut cycles = Vec::new();
        for len in lengths {
            cycles.push(CycleRecord::new(start, *len));
            start -= Duration::days(*len);
        }
        cycles
    }

    #[test]
    fn no_statistics_without_cycles() {
        assert_eq!(
            compute_statistics(&[]),
            Err(PredictionError::InsufficientData { qualifying: 0 })
        );
    }

    #[test]
    fn no_statistics_with_one_cycle() {
        let cycles = history("2024-01-20", &[28]);
        assert_eq!(
            compute_statistics(&cycles),
            Err(PredictionError::InsufficientData { qualifying: 1 })
        );
    }

    #[test]
    fn malformed_lengths_are_filtered_not_errors() {
        let cycles = vec![
            CycleRecord::ongoing(date("2024-03-01")),
            CycleRecord::new(date("2024-02-01"), 0),
            CycleRecord::new(date("2024-01-01"), -3),
            CycleRecord::new(date("2023-12-01"), 31),
        ];
        assert_eq!(
            compute_statistics(&cycles),
            Err(PredictionError::InsufficientData { qualifying: 1 })
        );

        let mut more = cycles.clone();
        more.push(CycleRecord::new(date("2023-11-01"), 29));
        let stats = compute_statistics(&more).unwrap();
        assert_eq!(stats.sample_size, 2);
        assert_eq!(stats.average_length_days, 30.0);
    }

    #[test]
    fn population_statistics_for_known_lengths() {
        let cycles = history("2024-01-20", &[28, 30, 26, 28]);
        let stats = compute_statistics(&cycles).unwrap();

        assert_eq!(stats.average_length_days, 28.0);
        assert!((stats.standard_deviation_days - 1.4142).abs() < 1e-4);
        assert!((stats.variability_ratio - 0.0505).abs() < 1e-4);
        assert_eq!(stats.sample_size, 4);
    }

    #[test]
    fn regular_cycles_have_zero_variability() {
        let cycles = history("2024-01-20", &[28, 28, 28]);
        let stats = compute_statistics(&cycles).unwrap();
        assert_eq!(stats.standard_deviation_days, 0.0);
        assert_eq!(stats.variability_ratio, 0.0);
    }

    #[test]
    fn only_the_newest_twelve_are_considered() {
        let mut lengths = vec![28; 12];
        lengths.extend([60; 8]);
        let cycles = history("2024-06-01", &lengths);

        let stats = compute_statistics(&cycles).unwrap();
        assert_eq!(stats.average_length_days, 28.0);
        assert_eq!(stats.sample_size, 12);
        assert_eq!(stats, compute_statistics(&cycles[..12]).unwrap());
    }

    #[test]
    fn window_is_applied_before_filtering() {
        // An ongoing newest cycle takes one slot of the window.
        let mut cycles = vec![CycleRecord::ongoing(date("2024-06-01"))];
        cycles.extend(history("2024-05-04", &[28; 11]));
        cycles.push(CycleRecord::new(date("2023-06-01"), 40));

        let stats = compute_statistics(&cycles).unwrap();
        assert_eq!(stats.sample_size, 11);
        assert_eq!(stats.average_length_days, 28.0);
    }

    #[test]
    fn rounded_average_for_display() {
        let cycles = history("2024-01-20", &[29, 30]);
        let stats = compute_statistics(&cycles).unwrap();
        assert_eq!(stats.average_length_days, 29.5);
        assert_eq!(stats.rounded_average_days(), 30);
    }

    #[test]
    fn summary_reports_range_and_consistency() {
        let cycles = history("2024-01-20", &[28, 30, 26, 28]);
        let summary = summarize(&cycles).unwrap();

        assert_eq!(summary.total_cycles, 4);
        assert_eq!(summary.shortest_days, 26);
        assert_eq!(summary.longest_days, 30);
        assert_eq!(summary.average_length_days, 28.0);
        // 100 - 5.05 rounds to 95
        assert_eq!(summary.consistency_percent, 95);
    }

    #[test]
    fn summary_needs_a_qualifying_cycle() {
        assert!(summarize(&[]).is_none());
        assert!(summarize(&[CycleRecord::ongoing(date("2024-01-01"))]).is_none());
    }

    #[test]
    fn mood_and_energy_average_to_one_decimal() {
        use crate::models::SymptomEntry;
        use chrono::{TimeZone, Utc};
        use uuid::Uuid;

        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let cycle = StoredCycle {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_date: date("2024-01-20"),
            end_date: None,
            actual_length: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        let log = |mood, energy| SymptomRecord {
            id: Uuid::new_v4(),
            user_id: cycle.user_id,
            cycle_id: cycle.id,
            entry: SymptomEntry {
                date: date("2024-01-21"),
                mood,
                energy,
                flow: None,
                symptoms: Vec::new(),
                notes: String::new(),
            },
            updated_at: now,
        };

        let logs = vec![log(7, 4), log(8, 5), log(8, 5)];
        let summary = mood_energy(&cycle, &logs).unwrap();
        assert_eq!(summary.entries, 3);
        assert_eq!(summary.average_mood, 7.7);
        assert_eq!(summary.average_energy, 4.7);

        assert!(mood_energy(&cycle, &[]).is_none());
    }
}
