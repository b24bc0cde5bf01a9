use tracing::warn;
use uuid::Uuid;

use super::{CycleSource, StoreError};
use crate::models::CycleRecord;

/// Reads from `primary`, switching to `alternate` when the primary fails.
pub struct FallbackSource<P, A> {
    primary: P,
    alternate: A,
}

impl<P, A> FallbackSource<P, A> {
    pub fn new(primary: P, alternate: A) -> Self {
        Self { primary, alternate }
    }
}

impl<P: CycleSource, A: CycleSource> CycleSource for FallbackSource<P, A> {
    fn recent_cycles(&self, user_id: Uuid, limit: usize) -> Result<Vec<CycleRecord>, StoreError> {
        match self.primary.recent_cycles(user_id, limit) {
            Ok(cycles) => Ok(cycles),
            Err(err) => {
                warn!(%user_id, error = %err, "primary cycle source failed, using alternate");
                self.alternate.recent_cycles(user_id, limit)
            }
        }
    }
}
