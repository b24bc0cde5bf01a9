use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PredictionSet;

/// Where today falls relative to the current cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodStatus {
    NoData,
    Period,
    Fertile,
    Normal,
}

/// 1-based day of the cycle that started on `start`.
pub fn cycle_day(start: NaiveDate, today: NaiveDate) -> i64 {
    (today - start).num_days() + 1
}

/// Days from `today` to the predicted period; negative once it is overdue.
pub fn days_until_period(prediction: &PredictionSet, today: NaiveDate) -> i64 {
    (prediction.next_period_date - today).num_days()
}

pub fn period_status(
    current_start: Option<NaiveDate>,
    period_length_days: i64,
    prediction: Option<&PredictionSet>,
    today: NaiveDate,
) -> PeriodStatus {
    let Some(start) = current_start else {
        return PeriodStatus::NoData;
    };

    // A day before the recorded start is not part of that period.
    if (0..=period_length_days).contains(&(today - start).num_days()) {
        return PeriodStatus::Period;
    }

    match prediction {
        Some(p) if today >= p.fertile_window_start && today <= p.fertile_window_end => {
            PeriodStatus::Fertile
        }
        _ => PeriodStatus::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CycleRecord;
    use crate::prediction::forecast;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn prediction() -> PredictionSet {
        let cycles = vec![
            CycleRecord::ongoing(date("2024-01-20")),
            CycleRecord::new(date("2023-12-23"), 28),
            CycleRecord::new(date("2023-11-25"), 28),
        ];
        forecast(&cycles, 14).unwrap()
    }

    #[test]
    fn cycle_day_is_one_based() {
        assert_eq!(cycle_day(date("2024-01-20"), date("2024-01-20")), 1);
        assert_eq!(cycle_day(date("2024-01-20"), date("2024-02-01")), 13);
    }

    #[test]
    fn days_until_period_can_go_negative() {
        let p = prediction();
        assert_eq!(p.next_period_date, date("2024-02-17"));
        assert_eq!(days_until_period(&p, date("2024-02-10")), 7);
        assert_eq!(days_until_period(&p, date("2024-02-19")), -2);
    }

    #[test]
    fn status_follows_the_cycle() {
        let p = prediction();
        let start = Some(date("2024-01-20"));

        assert_eq!(
            period_status(None, 5, Some(&p), date("2024-01-21")),
            PeriodStatus::NoData
        );
        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-01-25")),
            PeriodStatus::Period
        );
        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-01-27")),
            PeriodStatus::Normal
        );
        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-01-29")),
            PeriodStatus::Fertile
        );
        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-02-03")),
            PeriodStatus::Fertile
        );
        assert_eq!(
            period_status(start, 5, None, date("2024-02-03")),
            PeriodStatus::Normal
        );
    }

    #[test]
    fn days_before_the_start_are_not_period_days() {
        let p = prediction();
        let start = Some(date("2024-01-20"));

        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-01-19")),
            PeriodStatus::Normal
        );
        assert_eq!(
            period_status(start, 5, Some(&p), date("2024-01-20")),
            PeriodStatus::Period
        );
    }
}
