use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cycle as the prediction core sees it.
///
/// `actual_length` is the day gap to the next cycle's start, or `None`
/// while the cycle is still ongoing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleRecord {
    pub start_date: NaiveDate,
    pub actual_length: Option<i64>,
}

impl CycleRecord {
    pub fn new(start_date: NaiveDate, actual_length: i64) -> Self {
        Self {
            start_date,
            actual_length: Some(actual_length),
        }
    }

    pub fn ongoing(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            actual_length: None,
        }
    }

    /// Length in days if it can feed statistics (known and positive).
    pub fn qualifying_length(&self) -> Option<i64> {
        self.actual_length.filter(|len| *len > 0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CycleStatistics {
    pub average_length_days: f64,
    pub standard_deviation_days: f64,
    pub variability_ratio: f64,
    /// Number of qualifying cycles the figures were computed from.
    pub sample_size: usize,
}

impl CycleStatistics {
    /// Average length as shown to a user.
    pub fn rounded_average_days(&self) -> i64 {
        self.average_length_days.round() as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionSet {
    pub next_period_date: NaiveDate,
    pub next_period_confidence: f64,
    pub next_ovulation_date: NaiveDate,
    pub next_ovulation_confidence: f64,
    pub fertile_window_start: NaiveDate,
    pub fertile_window_end: NaiveDate,
    pub pms_start_date: NaiveDate,
    pub average_cycle_length_days: f64,
    pub cycle_variability_ratio: f64,
    pub computed_at: DateTime<Utc>,
}

/// Display summary for the analytics view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleSummary {
    pub total_cycles: usize,
    pub average_length_days: f64,
    pub shortest_days: i64,
    pub longest_days: i64,
    pub consistency_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub cycle_length_days: i64,
    pub period_length_days: i64,
    pub luteal_phase_length_days: i64,
    #[serde(default = "default_true")]
    pub show_fertility: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            cycle_length_days: 28,
            period_length_days: 5,
            luteal_phase_length_days: crate::prediction::DEFAULT_LUTEAL_PHASE_DAYS,
            show_fertility: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settings: UserSettings,
}

/// A cycle row as persisted by a record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredCycle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub actual_length: Option<i64>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCycle {
    pub fn to_record(&self) -> CycleRecord {
        CycleRecord {
            start_date: self.start_date,
            actual_length: self.actual_length,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowLevel {
    Spotting,
    Light,
    Medium,
    Heavy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SymptomKind {
    Cramps,
    Headache,
    Fatigue,
    Bloating,
    BreastTenderness,
    Acne,
    Nausea,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symptom {
    pub kind: SymptomKind,
    pub severity: u8, // 1-5
}

/// What a user logs for one day of a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomEntry {
    pub date: NaiveDate,
    /// Overall mood, 1-10.
    pub mood: u8,
    /// Overall energy, 1-10.
    pub energy: u8,
    #[serde(default)]
    pub flow: Option<FlowLevel>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    #[serde(default)]
    pub notes: String,
}

/// A day log as persisted, attached to one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cycle_id: Uuid,
    #[serde(flatten)]
    pub entry: SymptomEntry,
    pub updated_at: DateTime<Utc>,
}

/// Mood and energy averaged over one cycle's day logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodEnergySummary {
    pub cycle_id: Uuid,
    pub start_date: NaiveDate,
    pub entries: usize,
    pub average_mood: f64,
    pub average_energy: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Manual,
    Automatic,
    Export,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: BackupKind,
    pub cycles: Vec<StoredCycle>,
    #[serde(default)]
    pub symptoms: Vec<SymptomRecord>,
    pub settings: UserSettings,
    /// Size of the serialized snapshot in bytes.
    pub size: usize,
}

/// Everything a record store holds, serialized as one document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    pub users: Vec<UserProfile>,
    pub cycles: Vec<StoredCycle>,
    #[serde(default)]
    pub symptoms: Vec<SymptomRecord>,
    #[serde(default)]
    pub predictions: BTreeMap<Uuid, PredictionSet>,
    #[serde(default)]
    pub backups: Vec<BackupRecord>,
}
