use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use femcycle::config::Settings;
use femcycle::models::*;
use femcycle::service::{PredictionService, ServiceError};
use femcycle::statistics;
use femcycle::status::{self, PeriodStatus};
use femcycle::store::{CachedSource, FileStore, RecordStore, RECENT_CYCLE_LIMIT};
use femcycle::PredictionError;

/// Open store plus a read cache shared by every command in this process.
pub struct AppState {
    store: Arc<FileStore>,
    cycles: CachedSource<Arc<FileStore>>,
}

impl AppState {
    pub fn open(settings: &Settings, passphrase: &str) -> Result<Self, String> {
        let path = settings.store_path().map_err(|e| e.to_string())?;
        let store = FileStore::open_with(path, passphrase, settings.kdf_params())
            .map_err(|e| e.to_string())?;
        let store = Arc::new(store);
        Ok(Self {
            cycles: CachedSource::new(Arc::clone(&store), settings.cache_freshness()),
            store,
        })
    }

    fn service(&self) -> PredictionService<&CachedSource<Arc<FileStore>>, &FileStore> {
        PredictionService::new(&self.cycles, self.store.as_ref())
    }
}

#[derive(Debug, Serialize)]
pub struct StatsView {
    pub summary: Option<CycleSummary>,
    pub statistics: Option<CycleStatistics>,
    pub message: Option<String>,
    /// Oldest first, recent cycles with day logs only.
    pub mood_energy: Vec<MoodEnergySummary>,
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub today: NaiveDate,
    pub status: PeriodStatus,
    pub cycle_day: Option<i64>,
    pub days_until_period: Option<i64>,
    pub prediction: Option<PredictionSet>,
}

pub fn init(state: &AppState) -> Result<UserProfile, String> {
    state
        .store
        .create_user(UserSettings::default())
        .map_err(|e| e.to_string())
}

pub fn log_cycle(
    state: &AppState,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<StoredCycle, String> {
    let cycle = state
        .store
        .add_cycle(user_id, start_date, end_date)
        .map_err(|e| e.to_string())?;
    history_changed(state, user_id)?;
    Ok(cycle)
}

pub fn delete_cycle(state: &AppState, user_id: Uuid, cycle_id: Uuid) -> Result<(), String> {
    state
        .store
        .delete_cycle(user_id, cycle_id)
        .map_err(|e| e.to_string())?;
    history_changed(state, user_id)
}

/// Drop cached reads and bring the stored prediction in line with the history.
///
/// A history that no longer supports a prediction clears the stored one.
fn history_changed(state: &AppState, user_id: Uuid) -> Result<(), String> {
    state.cycles.invalidate(user_id).map_err(|e| e.to_string())?;

    match refresh(state, user_id) {
        Ok(_) => Ok(()),
        Err(ServiceError::Prediction(PredictionError::InsufficientData { .. })) => {
            if state
                .store
                .clear_prediction(user_id)
                .map_err(|e| e.to_string())?
            {
                info!(%user_id, "stored prediction cleared");
            }
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

pub fn cycle_notes(
    state: &AppState,
    user_id: Uuid,
    cycle_id: Uuid,
    notes: String,
) -> Result<StoredCycle, String> {
    state
        .store
        .update_cycle_notes(user_id, cycle_id, notes)
        .map_err(|e| e.to_string())
}

pub fn list_cycles(
    state: &AppState,
    user_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<StoredCycle>, String> {
    let result = match (from, to) {
        (None, None) => state.store.cycles(user_id),
        (from, to) => state.store.cycles_between(
            user_id,
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        ),
    };
    result.map_err(|e| e.to_string())
}

pub fn predict(state: &AppState, user_id: Uuid) -> Result<PredictionSet, String> {
    refresh(state, user_id).map_err(|e| e.to_string())
}

fn refresh(state: &AppState, user_id: Uuid) -> Result<PredictionSet, ServiceError> {
    let user = state.store.user(user_id)?;
    state
        .service()
        .refresh(user_id, user.settings.luteal_phase_length_days)
}

pub fn log_symptom(
    state: &AppState,
    user_id: Uuid,
    cycle_id: Uuid,
    entry: SymptomEntry,
) -> Result<SymptomRecord, String> {
    state
        .store
        .add_symptom(user_id, cycle_id, entry)
        .map_err(|e| e.to_string())
}

pub fn symptoms(
    state: &AppState,
    user_id: Uuid,
    cycle_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<SymptomRecord>, String> {
    let result = match (from, to) {
        (None, None) => state.store.symptoms(user_id, cycle_id),
        (from, to) => state.store.symptoms_between(
            user_id,
            cycle_id,
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        ),
    };
    result.map_err(|e| e.to_string())
}

pub fn update_symptom(
    state: &AppState,
    user_id: Uuid,
    symptom_id: Uuid,
    entry: SymptomEntry,
) -> Result<SymptomRecord, String> {
    state
        .store
        .update_symptom(user_id, symptom_id, entry)
        .map_err(|e| e.to_string())
}

pub fn delete_symptom(state: &AppState, user_id: Uuid, symptom_id: Uuid) -> Result<(), String> {
    state
        .store
        .delete_symptom(user_id, symptom_id)
        .map_err(|e| e.to_string())
}

pub fn stats(state: &AppState, user_id: Uuid) -> Result<StatsView, String> {
    let stored = state.store.cycles(user_id).map_err(|e| e.to_string())?;
    let records: Vec<CycleRecord> = stored.iter().map(StoredCycle::to_record).collect();

    let mut mood_energy = Vec::new();
    for cycle in stored.iter().take(statistics::MOOD_TREND_CYCLES).rev() {
        let logs = state
            .store
            .symptoms(user_id, cycle.id)
            .map_err(|e| e.to_string())?;
        mood_energy.extend(statistics::mood_energy(cycle, &logs));
    }

    let (statistics, message) = match state.service().statistics(user_id) {
        Ok(stats) => (Some(stats), None),
        Err(ServiceError::Prediction(e)) => (None, Some(e.to_string())),
        Err(e) => return Err(e.to_string()),
    };

    Ok(StatsView {
        summary: statistics::summarize(&records),
        statistics,
        message,
        mood_energy,
    })
}

pub fn status(state: &AppState, user_id: Uuid, today: NaiveDate) -> Result<StatusView, String> {
    let user = state.store.user(user_id).map_err(|e| e.to_string())?;
    let cycles = state
        .store
        .cycles(user_id)
        .map_err(|e| e.to_string())?;
    let current_start = cycles
        .iter()
        .find(|c| c.actual_length.is_none())
        .map(|c| c.start_date);
    let prediction = state.store.prediction(user_id).map_err(|e| e.to_string())?;

    let fertility = prediction.as_ref().filter(|_| user.settings.show_fertility);
    let status = status::period_status(
        current_start,
        user.settings.period_length_days,
        fertility,
        today,
    );

    Ok(StatusView {
        today,
        status,
        cycle_day: current_start.map(|start| status::cycle_day(start, today)),
        days_until_period: prediction
            .as_ref()
            .map(|p| status::days_until_period(p, today)),
        prediction,
    })
}

pub struct SettingsUpdate {
    pub cycle_length_days: Option<i64>,
    pub period_length_days: Option<i64>,
    pub luteal_phase_length_days: Option<i64>,
    pub show_fertility: Option<bool>,
}

pub fn update_settings(
    state: &AppState,
    user_id: Uuid,
    update: SettingsUpdate,
) -> Result<UserProfile, String> {
    let mut settings = state
        .store
        .user(user_id)
        .map_err(|e| e.to_string())?
        .settings;

    if let Some(days) = update.luteal_phase_length_days {
        if days <= 0 {
            return Err(format!("luteal phase length must be positive, got {days}"));
        }
        settings.luteal_phase_length_days = days;
    }
    if let Some(days) = update.cycle_length_days {
        settings.cycle_length_days = days.clamp(15, 60);
    }
    if let Some(days) = update.period_length_days {
        settings.period_length_days = days.clamp(1, 14);
    }
    if let Some(enabled) = update.show_fertility {
        settings.show_fertility = enabled;
    }

    state
        .store
        .update_settings(user_id, settings)
        .map_err(|e| e.to_string())
}

pub fn backup(state: &AppState, user_id: Uuid) -> Result<BackupRecord, String> {
    state
        .store
        .create_backup(user_id, BackupKind::Manual)
        .map_err(|e| e.to_string())
}

pub fn delete_backup(state: &AppState, user_id: Uuid, backup_id: Uuid) -> Result<(), String> {
    state
        .store
        .delete_backup(user_id, backup_id)
        .map_err(|e| e.to_string())
}

pub fn history(state: &AppState, user_id: Uuid) -> Result<Vec<CycleRecord>, String> {
    use femcycle::store::CycleSource;
    state
        .cycles
        .recent_cycles(user_id, RECENT_CYCLE_LIMIT)
        .map_err(|e| e.to_string())
}

pub fn wipe_user(state: &AppState, user_id: Uuid) -> Result<(), String> {
    state
        .store
        .delete_user_data(user_id)
        .map_err(|e| e.to_string())?;
    state.cycles.invalidate(user_id).map_err(|e| e.to_string())
}

pub fn wipe_all_data(state: AppState) -> Result<(), String> {
    let path = state.store.path().to_path_buf();
    drop(state);
    FileStore::wipe(&path).map_err(|e| e.to_string())
}
