use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use super::{CycleSource, StoreError};
use crate::models::CycleRecord;

/// Default freshness window for cached reads.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

struct Entry {
    fetched_at: Instant,
    cycles: Vec<CycleRecord>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<(Uuid, usize), Entry>,
    /// Bumped by every invalidation; a read only lands if its user's
    /// generation is unchanged since the read began.
    generations: HashMap<Uuid, u64>,
}

impl CacheState {
    fn generation(&self, user_id: Uuid) -> u64 {
        self.generations.get(&user_id).copied().unwrap_or(0)
    }
}

/// Caches reads of any [`CycleSource`] for a fixed freshness window.
///
/// Entries are keyed by user and limit. Empty results are never cached.
pub struct CachedSource<S> {
    inner: S,
    freshness: Duration,
    state: Mutex<CacheState>,
}

impl<S: CycleSource> CachedSource<S> {
    pub fn new(inner: S, freshness: Duration) -> Self {
        Self {
            inner,
            freshness,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Read as of `now`; a hit requires an entry younger than the freshness window.
    pub fn recent_cycles_at(
        &self,
        user_id: Uuid,
        limit: usize,
        now: Instant,
    ) -> Result<Vec<CycleRecord>, StoreError> {
        let key = (user_id, limit);
        let generation = {
            let state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
            if let Some(entry) = state.entries.get(&key) {
                if self.is_fresh(entry, now) {
                    debug!(%user_id, limit, "cycle cache hit");
                    return Ok(entry.cycles.clone());
                }
            }
            state.generation(user_id)
        };

        let cycles = self.inner.recent_cycles(user_id, limit)?;
        self.remember(key, generation, &cycles, now)?;
        Ok(cycles)
    }

    /// Store a read taken at `generation`, unless the user was invalidated since.
    fn remember(
        &self,
        key: (Uuid, usize),
        generation: u64,
        cycles: &[CycleRecord],
        now: Instant,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.entries.retain(|_, entry| self.is_fresh(entry, now));

        if cycles.is_empty() {
            state.entries.remove(&key);
        } else if state.generation(key.0) == generation {
            state.entries.insert(
                key,
                Entry {
                    fetched_at: now,
                    cycles: cycles.to_vec(),
                },
            );
        } else {
            debug!(user_id = %key.0, "discarding read that raced an invalidation");
        }
        Ok(())
    }

    fn is_fresh(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.fetched_at) < self.freshness
    }

    /// Drop every cached read for `user_id`, e.g. after a new cycle is logged.
    pub fn invalidate(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.entries.retain(|(user, _), _| *user != user_id);
        *state.generations.entry(user_id).or_insert(0) += 1;
        Ok(())
    }
}

impl<S: CycleSource> CycleSource for CachedSource<S> {
    fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Result<Vec<CycleRecord>, StoreError> {
        self.recent_cycles_at(user_id, limit, Instant::now())
    }
}
