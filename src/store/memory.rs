use std::sync::Mutex;

use super::StoreError;
use crate::models::StoreData;

/// Store kept entirely in memory. Used for fixtures and as an alternate source.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoreData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<StoreData, StoreError> {
        self.read(|data| Ok(data.clone()))
    }

    fn read<R>(
        &self,
        f: impl FnOnce(&StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        f(&data)
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut data = self.data.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut data)
    }
}

record_store_impl!(MemoryStore);
