use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::StoreError;
use crate::crypto::{self, KdfParams};
use crate::models::StoreData;

const DATA_FILE: &str = "data.femcycle";

/// Encrypted single-file store.
///
/// The whole [`StoreData`] document is held in memory and re-sealed to disk
/// after every mutation.
pub struct FileStore {
    path: PathBuf,
    passphrase: Zeroizing<String>,
    kdf: KdfParams,
    data: Mutex<StoreData>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Default location of the data file under the platform's local data directory.
pub fn default_path() -> Result<PathBuf, StoreError> {
    let dir = dirs::data_local_dir()
        .ok_or(StoreError::NoDataDir)?
        .join("femcycle");
    Ok(dir.join(DATA_FILE))
}

/// Path of the data file inside `dir`.
pub fn path_in(dir: &Path) -> PathBuf {
    dir.join(DATA_FILE)
}

impl FileStore {
    /// Open the store at `path`, creating an empty one if none exists.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StoreError> {
        Self::open_with(path, passphrase, KdfParams::default())
    }

    pub fn open_with(
        path: impl Into<PathBuf>,
        passphrase: &str,
        kdf: KdfParams,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let passphrase = Zeroizing::new(passphrase.to_owned());

        let data = if path.exists() {
            let sealed = fs::read(&path)?;
            // The file's own header says how its key was derived; `kdf` only
            // applies to the next seal.
            let plain = Zeroizing::new(crypto::open(&passphrase, &sealed)?);
            let data: StoreData = serde_json::from_slice(&plain)?;
            debug!(path = %path.display(), cycles = data.cycles.len(), "store loaded");
            data
        } else {
            info!(path = %path.display(), "creating new store");
            StoreData::default()
        };

        let store = Self {
            path,
            passphrase,
            kdf,
            data: Mutex::new(data),
        };
        if !store.path.exists() {
            store.read(|data| store.persist(data))?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the data file permanently.
    pub fn wipe(path: &Path) -> Result<(), StoreError> {
        if path.exists() {
            fs::remove_file(path)?;
            info!(path = %path.display(), "store wiped");
        }
        Ok(())
    }

    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let plain = Zeroizing::new(serde_json::to_vec(data)?);
        let sealed = crypto::seal(&self.kdf, &self.passphrase, &plain)?;

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, sealed)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "store saved");
        Ok(())
    }

    fn read<R>(
        &self,
        f: impl FnOnce(&StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        f(&data)
    }

    /// Apply `f` and persist. On failure the in-memory copy is left untouched.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        let mut staged = data.clone();
        let out = f(&mut staged)?;
        self.persist(&staged)?;
        *data = staged;
        Ok(out)
    }
}

record_store_impl!(FileStore);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::models::UserSettings;
    use crate::store::{CycleSource, RecordStore};
    use chrono::NaiveDate;

    fn cheap() -> KdfParams {
        KdfParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn open_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());

        let store = FileStore::open_with(&path, "pass", cheap()).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());

        let user_id = {
            let store = FileStore::open_with(&path, "pass", cheap()).unwrap();
            let user = store.create_user(UserSettings::default()).unwrap();
            store.add_cycle(user.id, date("2024-01-20"), None).unwrap();
            store.add_cycle(user.id, date("2024-02-17"), None).unwrap();
            user.id
        };

        let store = FileStore::open_with(&path, "pass", cheap()).unwrap();
        let cycles = store.recent_cycles(user_id, 12).unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1].actual_length, Some(28));
    }

    #[test]
    fn wrong_passphrase_is_a_crypto_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());
        FileStore::open_with(&path, "right", cheap()).unwrap();

        let err = FileStore::open_with(&path, "wrong", cheap()).unwrap_err();
        assert!(matches!(err, StoreError::Crypto(CryptoError::Decryption)));
    }

    #[test]
    fn changed_kdf_cost_still_opens_and_applies_on_next_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());
        let user_id = {
            let store = FileStore::open_with(&path, "pass", cheap()).unwrap();
            store.create_user(UserSettings::default()).unwrap().id
        };

        let stronger = KdfParams {
            iterations: 2,
            ..cheap()
        };
        let store = FileStore::open_with(&path, "pass", stronger).unwrap();
        assert!(store.user(user_id).is_ok());
        assert_eq!(crypto::sealed_params(&fs::read(&path).unwrap()).unwrap(), cheap());

        store.add_cycle(user_id, date("2024-01-20"), None).unwrap();
        assert_eq!(crypto::sealed_params(&fs::read(&path).unwrap()).unwrap(), stronger);
    }

    #[test]
    fn failed_mutation_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());
        let store = FileStore::open_with(&path, "pass", cheap()).unwrap();
        let user = store.create_user(UserSettings::default()).unwrap();
        store.add_cycle(user.id, date("2024-01-20"), None).unwrap();

        assert!(store.add_cycle(user.id, date("2024-01-20"), None).is_err());
        assert_eq!(store.cycles(user.id).unwrap().len(), 1);
    }

    #[test]
    fn wipe_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(dir.path());
        FileStore::open_with(&path, "pass", cheap()).unwrap();

        FileStore::wipe(&path).unwrap();
        assert!(!path.exists());
        FileStore::wipe(&path).unwrap();
    }
}
