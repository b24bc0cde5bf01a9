use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::StoreError;
use crate::models::{StoreData, StoredCycle, SymptomEntry, SymptomRecord};

const MOOD_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
const SEVERITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

fn check_range(
    field: &'static str,
    value: u8,
    range: &std::ops::RangeInclusive<u8>,
) -> Result<(), StoreError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(StoreError::OutOfRange { field, value })
    }
}

fn validate(entry: &SymptomEntry) -> Result<(), StoreError> {
    check_range("mood", entry.mood, &MOOD_RANGE)?;
    check_range("energy", entry.energy, &MOOD_RANGE)?;
    for symptom in &entry.symptoms {
        check_range("severity", symptom.severity, &SEVERITY_RANGE)?;
    }
    Ok(())
}

impl StoreData {
    fn owned_cycle(&self, user_id: Uuid, cycle_id: Uuid) -> Result<&StoredCycle, StoreError> {
        self.cycles
            .iter()
            .find(|c| c.id == cycle_id && c.user_id == user_id)
            .ok_or(StoreError::UnknownCycle(cycle_id))
    }

    pub(crate) fn add_symptom(
        &mut self,
        user_id: Uuid,
        cycle_id: Uuid,
        entry: SymptomEntry,
        now: DateTime<Utc>,
    ) -> Result<SymptomRecord, StoreError> {
        self.owned_cycle(user_id, cycle_id)?;
        validate(&entry)?;

        let record = SymptomRecord {
            id: Uuid::new_v4(),
            user_id,
            cycle_id,
            entry,
            updated_at: now,
        };
        self.symptoms.push(record.clone());
        Ok(record)
    }

    /// Day logs of one cycle, oldest first.
    pub(crate) fn symptoms_of(
        &self,
        user_id: Uuid,
        cycle_id: Uuid,
    ) -> Result<Vec<SymptomRecord>, StoreError> {
        self.owned_cycle(user_id, cycle_id)?;
        let mut records: Vec<SymptomRecord> = self
            .symptoms
            .iter()
            .filter(|s| s.cycle_id == cycle_id)
            .cloned()
            .collect();
        records.sort_by_key(|s| s.entry.date);
        Ok(records)
    }

    pub(crate) fn symptoms_between(
        &self,
        user_id: Uuid,
        cycle_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SymptomRecord>, StoreError> {
        let mut records = self.symptoms_of(user_id, cycle_id)?;
        records.retain(|s| (from..=to).contains(&s.entry.date));
        Ok(records)
    }

    pub(crate) fn update_symptom(
        &mut self,
        user_id: Uuid,
        symptom_id: Uuid,
        entry: SymptomEntry,
        now: DateTime<Utc>,
    ) -> Result<SymptomRecord, StoreError> {
        validate(&entry)?;
        let record = self
            .symptoms
            .iter_mut()
            .find(|s| s.id == symptom_id && s.user_id == user_id)
            .ok_or(StoreError::UnknownSymptom(symptom_id))?;
        record.entry = entry;
        record.updated_at = now;
        Ok(record.clone())
    }

    pub(crate) fn delete_symptom(&mut self, user_id: Uuid, symptom_id: Uuid) -> Result<(), StoreError> {
        let pos = self
            .symptoms
            .iter()
            .position(|s| s.id == symptom_id && s.user_id == user_id)
            .ok_or(StoreError::UnknownSymptom(symptom_id))?;
        self.symptoms.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowLevel, Symptom, SymptomKind, UserSettings};
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn entry(day: &str, mood: u8, energy: u8) -> SymptomEntry {
        SymptomEntry {
            date: date(day),
            mood,
            energy,
            flow: Some(FlowLevel::Medium),
            symptoms: vec![Symptom {
                kind: SymptomKind::Cramps,
                severity: 3,
            }],
            notes: String::new(),
        }
    }

    fn seeded() -> (StoreData, Uuid, Uuid) {
        let mut data = StoreData::default();
        let user = data.create_user(UserSettings::default(), now());
        let cycle = data.add_cycle(user.id, date("2024-01-20"), None, now()).unwrap();
        (data, user.id, cycle.id)
    }

    #[test]
    fn day_logs_come_back_in_date_order() {
        let (mut data, user, cycle) = seeded();
        data.add_symptom(user, cycle, entry("2024-01-22", 6, 5), now()).unwrap();
        data.add_symptom(user, cycle, entry("2024-01-20", 4, 3), now()).unwrap();
        data.add_symptom(user, cycle, entry("2024-01-25", 7, 8), now()).unwrap();

        let all = data.symptoms_of(user, cycle).unwrap();
        let dates: Vec<NaiveDate> = all.iter().map(|s| s.entry.date).collect();
        assert_eq!(dates, vec![date("2024-01-20"), date("2024-01-22"), date("2024-01-25")]);

        let middle = data
            .symptoms_between(user, cycle, date("2024-01-21"), date("2024-01-25"))
            .unwrap();
        assert_eq!(middle.len(), 2);
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let (mut data, user, cycle) = seeded();
        assert!(matches!(
            data.add_symptom(user, cycle, entry("2024-01-21", 0, 5), now()),
            Err(StoreError::OutOfRange { field: "mood", value: 0 })
        ));
        assert!(matches!(
            data.add_symptom(user, cycle, entry("2024-01-21", 5, 11), now()),
            Err(StoreError::OutOfRange { field: "energy", value: 11 })
        ));

        let mut bad = entry("2024-01-21", 5, 5);
        bad.symptoms[0].severity = 6;
        assert!(data.add_symptom(user, cycle, bad, now()).is_err());
        assert!(data.symptoms.is_empty());
    }

    #[test]
    fn update_and_delete_are_scoped_to_the_owner() {
        let (mut data, user, cycle) = seeded();
        let stranger = data.create_user(UserSettings::default(), now()).id;
        let log = data.add_symptom(user, cycle, entry("2024-01-21", 5, 5), now()).unwrap();

        assert!(matches!(
            data.update_symptom(stranger, log.id, entry("2024-01-21", 9, 9), now()),
            Err(StoreError::UnknownSymptom(_))
        ));
        assert!(data.delete_symptom(stranger, log.id).is_err());
        assert!(data.symptoms_of(stranger, cycle).is_err());

        let updated = data
            .update_symptom(user, log.id, entry("2024-01-21", 9, 2), now())
            .unwrap();
        assert_eq!((updated.entry.mood, updated.entry.energy), (9, 2));

        data.delete_symptom(user, log.id).unwrap();
        assert!(data.symptoms_of(user, cycle).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_cycle_drops_its_day_logs() {
        let (mut data, user, cycle) = seeded();
        data.add_symptom(user, cycle, entry("2024-01-21", 5, 5), now()).unwrap();

        data.delete_cycle(user, cycle, now()).unwrap();
        assert!(data.symptoms.is_empty());
    }

    #[test]
    fn backups_carry_day_logs_and_user_wipe_removes_them() {
        let (mut data, user, cycle) = seeded();
        data.add_symptom(user, cycle, entry("2024-01-21", 5, 5), now()).unwrap();

        let backup = data
            .create_backup(user, crate::models::BackupKind::Export, now())
            .unwrap();
        assert_eq!(backup.symptoms.len(), 1);

        data.delete_user_data(user);
        assert!(data.symptoms.is_empty());
    }
}
