use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::StoreError;
use crate::models::{
    BackupKind, BackupRecord, CycleRecord, PredictionSet, StoreData, StoredCycle, SymptomRecord,
    UserProfile, UserSettings,
};

impl StoreData {
    pub(crate) fn create_user(&mut self, settings: UserSettings, now: DateTime<Utc>) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            settings,
        };
        self.users.push(profile.clone());
        profile
    }

    pub(crate) fn user(&self, user_id: Uuid) -> Result<&UserProfile, StoreError> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::UnknownUser(user_id))
    }

    pub(crate) fn update_settings(
        &mut self,
        user_id: Uuid,
        settings: UserSettings,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, StoreError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::UnknownUser(user_id))?;
        user.settings = settings;
        user.updated_at = now;
        Ok(user.clone())
    }

    pub(crate) fn add_cycle(
        &mut self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<StoredCycle, StoreError> {
        self.user(user_id)?;

        if let Some(end_date) = end_date {
            if end_date < start_date {
                return Err(StoreError::EndBeforeStart {
                    start_date,
                    end_date,
                });
            }
        }

        if self
            .cycles
            .iter()
            .any(|c| c.user_id == user_id && c.start_date == start_date)
        {
            return Err(StoreError::DuplicateStartDate { start_date });
        }

        let id = Uuid::new_v4();
        self.cycles.push(StoredCycle {
            id,
            user_id,
            start_date,
            end_date,
            actual_length: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        });
        self.relink_lengths(user_id, now);

        self.cycles
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StoreError::UnknownCycle(id))
    }

    /// Remove one of `user_id`'s cycles along with its day logs.
    pub(crate) fn delete_cycle(
        &mut self,
        user_id: Uuid,
        cycle_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let pos = self
            .cycles
            .iter()
            .position(|c| c.id == cycle_id && c.user_id == user_id)
            .ok_or(StoreError::UnknownCycle(cycle_id))?;
        self.cycles.remove(pos);
        self.symptoms.retain(|s| s.cycle_id != cycle_id);
        self.relink_lengths(user_id, now);
        Ok(())
    }

    pub(crate) fn update_cycle_notes(
        &mut self,
        user_id: Uuid,
        cycle_id: Uuid,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<StoredCycle, StoreError> {
        let cycle = self
            .cycles
            .iter_mut()
            .find(|c| c.id == cycle_id && c.user_id == user_id)
            .ok_or(StoreError::UnknownCycle(cycle_id))?;
        cycle.notes = notes;
        cycle.updated_at = now;
        Ok(cycle.clone())
    }

    /// Each cycle's length is the gap to the next start; the newest stays open.
    fn relink_lengths(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        let mut indices: Vec<usize> = self
            .cycles
            .iter()
            .enumerate()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(i, _)| i)
            .collect();
        indices.sort_by_key(|&i| self.cycles[i].start_date);

        for (n, &i) in indices.iter().enumerate() {
            let length = indices
                .get(n + 1)
                .map(|&next| (self.cycles[next].start_date - self.cycles[i].start_date).num_days());
            let cycle = &mut self.cycles[i];
            if cycle.actual_length != length {
                cycle.actual_length = length;
                cycle.updated_at = now;
            }
        }
    }

    pub(crate) fn cycles_newest_first(&self, user_id: Uuid) -> Vec<StoredCycle> {
        let mut cycles: Vec<StoredCycle> = self
            .cycles
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        cycles
    }

    /// Cycles starting within `from..=to`, newest first.
    pub(crate) fn cycles_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<StoredCycle> {
        let mut cycles = self.cycles_newest_first(user_id);
        cycles.retain(|c| (from..=to).contains(&c.start_date));
        cycles
    }

    pub(crate) fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Vec<CycleRecord> {
        self.cycles_newest_first(user_id)
            .iter()
            .take(limit)
            .map(StoredCycle::to_record)
            .collect()
    }

    pub(crate) fn save_prediction(&mut self, user_id: Uuid, prediction: PredictionSet) {
        self.predictions.insert(user_id, prediction);
    }

    /// Forget the stored prediction; true if there was one.
    pub(crate) fn clear_prediction(&mut self, user_id: Uuid) -> bool {
        self.predictions.remove(&user_id).is_some()
    }

    pub(crate) fn create_backup(
        &mut self,
        user_id: Uuid,
        kind: BackupKind,
        now: DateTime<Utc>,
    ) -> Result<BackupRecord, StoreError> {
        let settings = self.user(user_id)?.settings.clone();
        let cycles = self.cycles_newest_first(user_id);
        let symptoms: Vec<SymptomRecord> = self
            .symptoms
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        let size = serde_json::to_vec(&(&cycles, &symptoms, &settings))?.len();

        let backup = BackupRecord {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            kind,
            cycles,
            symptoms,
            settings,
            size,
        };
        self.backups.push(backup.clone());
        Ok(backup)
    }

    pub(crate) fn backups_newest_first(&self, user_id: Uuid, limit: usize) -> Vec<BackupRecord> {
        let mut backups: Vec<BackupRecord> = self
            .backups
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        backups.truncate(limit);
        backups
    }

    pub(crate) fn delete_backup(&mut self, user_id: Uuid, backup_id: Uuid) -> Result<(), StoreError> {
        let pos = self
            .backups
            .iter()
            .position(|b| b.id == backup_id && b.user_id == user_id)
            .ok_or(StoreError::UnknownBackup(backup_id))?;
        self.backups.remove(pos);
        Ok(())
    }

    pub(crate) fn delete_user_data(&mut self, user_id: Uuid) {
        self.users.retain(|u| u.id != user_id);
        self.cycles.retain(|c| c.user_id != user_id);
        self.symptoms.retain(|s| s.user_id != user_id);
        self.predictions.remove(&user_id);
        self.backups.retain(|b| b.user_id != user_id);
    }
}
