//! Record storage behind explicit interfaces.
//!
//! The prediction core only ever sees [`CycleSource`] and [`PredictionSink`];
//! callers pick the implementation and pass it in.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::models::{
    BackupKind, BackupRecord, CycleRecord, PredictionSet, StoredCycle, SymptomEntry, SymptomRecord,
    UserProfile, UserSettings,
};

/// Implements the store traits for a type with `read`/`write` closures over `StoreData`.
macro_rules! record_store_impl {
    ($store:ty) => {
        impl $crate::store::CycleSource for $store {
            fn recent_cycles(
                &self,
                user_id: ::uuid::Uuid,
                limit: usize,
            ) -> Result<Vec<$crate::models::CycleRecord>, $crate::store::StoreError> {
                self.read(|data| Ok(data.recent_cycles(user_id, limit)))
            }
        }

        impl $crate::store::PredictionSink for $store {
            fn save_prediction(
                &self,
                user_id: ::uuid::Uuid,
                prediction: &$crate::models::PredictionSet,
            ) -> Result<(), $crate::store::StoreError> {
                self.write(|data| {
                    data.save_prediction(user_id, prediction.clone());
                    Ok(())
                })
            }
        }

        impl $crate::store::RecordStore for $store {
            fn create_user(
                &self,
                settings: $crate::models::UserSettings,
            ) -> Result<$crate::models::UserProfile, $crate::store::StoreError> {
                self.write(|data| Ok(data.create_user(settings, ::chrono::Utc::now())))
            }

            fn user(
                &self,
                user_id: ::uuid::Uuid,
            ) -> Result<$crate::models::UserProfile, $crate::store::StoreError> {
                self.read(|data| data.user(user_id).cloned())
            }

            fn update_settings(
                &self,
                user_id: ::uuid::Uuid,
                settings: $crate::models::UserSettings,
            ) -> Result<$crate::models::UserProfile, $crate::store::StoreError> {
                self.write(|data| data.update_settings(user_id, settings, ::chrono::Utc::now()))
            }

            fn add_cycle(
                &self,
                user_id: ::uuid::Uuid,
                start_date: ::chrono::NaiveDate,
                end_date: Option<::chrono::NaiveDate>,
            ) -> Result<$crate::models::StoredCycle, $crate::store::StoreError> {
                self.write(|data| {
                    data.add_cycle(user_id, start_date, end_date, ::chrono::Utc::now())
                })
            }

            fn delete_cycle(
                &self,
                user_id: ::uuid::Uuid,
                cycle_id: ::uuid::Uuid,
            ) -> Result<(), $crate::store::StoreError> {
                self.write(|data| data.delete_cycle(user_id, cycle_id, ::chrono::Utc::now()))
            }

            fn update_cycle_notes(
                &self,
                user_id: ::uuid::Uuid,
                cycle_id: ::uuid::Uuid,
                notes: String,
            ) -> Result<$crate::models::StoredCycle, $crate::store::StoreError> {
                self.write(|data| {
                    data.update_cycle_notes(user_id, cycle_id, notes, ::chrono::Utc::now())
                })
            }

            fn cycles_between(
                &self,
                user_id: ::uuid::Uuid,
                from: ::chrono::NaiveDate,
                to: ::chrono::NaiveDate,
            ) -> Result<Vec<$crate::models::StoredCycle>, $crate::store::StoreError> {
                self.read(|data| Ok(data.cycles_between(user_id, from, to)))
            }

            fn cycles(
                &self,
                user_id: ::uuid::Uuid,
            ) -> Result<Vec<$crate::models::StoredCycle>, $crate::store::StoreError> {
                self.read(|data| Ok(data.cycles_newest_first(user_id)))
            }

            fn prediction(
                &self,
                user_id: ::uuid::Uuid,
            ) -> Result<Option<$crate::models::PredictionSet>, $crate::store::StoreError> {
                self.read(|data| Ok(data.predictions.get(&user_id).cloned()))
            }

            fn clear_prediction(&self, user_id: ::uuid::Uuid) -> Result<bool, $crate::store::StoreError> {
                self.write(|data| Ok(data.clear_prediction(user_id)))
            }

            fn add_symptom(
                &self,
                user_id: ::uuid::Uuid,
                cycle_id: ::uuid::Uuid,
                entry: $crate::models::SymptomEntry,
            ) -> Result<$crate::models::SymptomRecord, $crate::store::StoreError> {
                self.write(|data| data.add_symptom(user_id, cycle_id, entry, ::chrono::Utc::now()))
            }

            fn symptoms(
                &self,
                user_id: ::uuid::Uuid,
                cycle_id: ::uuid::Uuid,
            ) -> Result<Vec<$crate::models::SymptomRecord>, $crate::store::StoreError> {
                self.read(|data| data.symptoms_of(user_id, cycle_id))
            }

            fn symptoms_between(
                &self,
                user_id: ::uuid::Uuid,
                cycle_id: ::uuid::Uuid,
                from: ::chrono::NaiveDate,
                to: ::chrono::NaiveDate,
            ) -> Result<Vec<$crate::models::SymptomRecord>, $crate::store::StoreError> {
                self.read(|data| data.symptoms_between(user_id, cycle_id, from, to))
            }

            fn update_symptom(
                &self,
                user_id: ::uuid::Uuid,
                symptom_id: ::uuid::Uuid,
                entry: $crate::models::SymptomEntry,
            ) -> Result<$crate::models::SymptomRecord, $crate::store::StoreError> {
                self.write(|data| {
                    data.update_symptom(user_id, symptom_id, entry, ::chrono::Utc::now())
                })
            }

            fn delete_symptom(
                &self,
                user_id: ::uuid::Uuid,
                symptom_id: ::uuid::Uuid,
            ) -> Result<(), $crate::store::StoreError> {
                self.write(|data| data.delete_symptom(user_id, symptom_id))
            }

            fn create_backup(
                &self,
                user_id: ::uuid::Uuid,
                kind: $crate::models::BackupKind,
            ) -> Result<$crate::models::BackupRecord, $crate::store::StoreError> {
                self.write(|data| data.create_backup(user_id, kind, ::chrono::Utc::now()))
            }

            fn backups(
                &self,
                user_id: ::uuid::Uuid,
                limit: usize,
            ) -> Result<Vec<$crate::models::BackupRecord>, $crate::store::StoreError> {
                self.read(|data| Ok(data.backups_newest_first(user_id, limit)))
            }

            fn delete_backup(
                &self,
                user_id: ::uuid::Uuid,
                backup_id: ::uuid::Uuid,
            ) -> Result<(), $crate::store::StoreError> {
                self.write(|data| data.delete_backup(user_id, backup_id))
            }

            fn delete_user_data(&self, user_id: ::uuid::Uuid) -> Result<(), $crate::store::StoreError> {
                self.write(|data| {
                    data.delete_user_data(user_id);
                    Ok(())
                })
            }
        }
    };
}

pub mod cache;
pub mod fallback;
pub mod file;
pub mod memory;
mod records;
mod symptoms;

pub use cache::CachedSource;
pub use fallback::FallbackSource;
pub use file::FileStore;
pub use memory::MemoryStore;

/// How many recent cycles a prediction reads.
pub const RECENT_CYCLE_LIMIT: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
    #[error("unknown user {0}")]
    UnknownUser(Uuid),
    #[error("unknown cycle {0}")]
    UnknownCycle(Uuid),
    #[error("unknown symptom log {0}")]
    UnknownSymptom(Uuid),
    #[error("unknown backup {0}")]
    UnknownBackup(Uuid),
    #[error("{field} must be within its scale, got {value}")]
    OutOfRange { field: &'static str, value: u8 },
    #[error("a cycle already starts on {start_date}")]
    DuplicateStartDate { start_date: NaiveDate },
    #[error("cycle ends on {end_date}, before its start {start_date}")]
    EndBeforeStart {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

/// Read side: the most recent cycles for a user, newest first, at most `limit`.
pub trait CycleSource {
    fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Result<Vec<CycleRecord>, StoreError>;
}

/// Write side: keep the latest prediction for a user, replacing any earlier one.
pub trait PredictionSink {
    fn save_prediction(&self, user_id: Uuid, prediction: &PredictionSet)
        -> Result<(), StoreError>;
}

/// Full record keeping used by the command layer.
pub trait RecordStore: CycleSource + PredictionSink {
    fn create_user(&self, settings: UserSettings) -> Result<UserProfile, StoreError>;
    fn user(&self, user_id: Uuid) -> Result<UserProfile, StoreError>;
    fn update_settings(
        &self,
        user_id: Uuid,
        settings: UserSettings,
    ) -> Result<UserProfile, StoreError>;
    /// Insert a cycle; lengths of the user's cycles are re-derived afterwards.
    fn add_cycle(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<StoredCycle, StoreError>;
    /// Remove one of `user_id`'s cycles and its day logs; other users' ids are unknown.
    fn delete_cycle(&self, user_id: Uuid, cycle_id: Uuid) -> Result<(), StoreError>;
    fn update_cycle_notes(
        &self,
        user_id: Uuid,
        cycle_id: Uuid,
        notes: String,
    ) -> Result<StoredCycle, StoreError>;
    /// All cycles of a user, newest first.
    fn cycles(&self, user_id: Uuid) -> Result<Vec<StoredCycle>, StoreError>;
    /// Cycles starting within `from..=to`, newest first.
    fn cycles_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StoredCycle>, StoreError>;
    fn prediction(&self, user_id: Uuid) -> Result<Option<PredictionSet>, StoreError>;
    /// Drop the stored prediction, e.g. once the history no longer supports one.
    fn clear_prediction(&self, user_id: Uuid) -> Result<bool, StoreError>;
    fn add_symptom(
        &self,
        user_id: Uuid,
        cycle_id: Uuid,
        entry: SymptomEntry,
    ) -> Result<SymptomRecord, StoreError>;
    /// Day logs of one cycle, oldest first.
    fn symptoms(&self, user_id: Uuid, cycle_id: Uuid) -> Result<Vec<SymptomRecord>, StoreError>;
    fn symptoms_between(
        &self,
        user_id: Uuid,
        cycle_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SymptomRecord>, StoreError>;
    fn update_symptom(
        &self,
        user_id: Uuid,
        symptom_id: Uuid,
        entry: SymptomEntry,
    ) -> Result<SymptomRecord, StoreError>;
    fn delete_symptom(&self, user_id: Uuid, symptom_id: Uuid) -> Result<(), StoreError>;
    fn create_backup(&self, user_id: Uuid, kind: BackupKind) -> Result<BackupRecord, StoreError>;
    fn backups(&self, user_id: Uuid, limit: usize) -> Result<Vec<BackupRecord>, StoreError>;
    fn delete_backup(&self, user_id: Uuid, backup_id: Uuid) -> Result<(), StoreError>;
    fn delete_user_data(&self, user_id: Uuid) -> Result<(), StoreError>;
}

impl<T: CycleSource + ?Sized> CycleSource for &T {
    fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Result<Vec<CycleRecord>, StoreError> {
        (**self).recent_cycles(user_id, limit)
    }
}

impl<T: CycleSource + ?Sized> CycleSource for Arc<T> {
    fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Result<Vec<CycleRecord>, StoreError> {
        (**self).recent_cycles(user_id, limit)
    }
}

impl<T: PredictionSink + ?Sized> PredictionSink for &T {
    fn save_prediction(
        &self,
        user_id: Uuid,
        prediction: &PredictionSet,
    ) -> Result<(), StoreError> {
        (**self).save_prediction(user_id, prediction)
    }
}

impl<T: PredictionSink + ?Sized> PredictionSink for Arc<T> {
    fn save_prediction(
        &self,
        user_id: Uuid,
        prediction: &PredictionSet,
    ) -> Result<(), StoreError> {
        (**self).save_prediction(user_id, prediction)
    }
}
