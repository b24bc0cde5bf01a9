use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PredictionError;
use crate::models::{CycleStatistics, PredictionSet};
use crate::prediction;
use crate::statistics;
use crate::store::{CycleSource, PredictionSink, StoreError, RECENT_CYCLE_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Runs the prediction core between an injected read source and write sink.
pub struct PredictionService<S, W> {
    source: S,
    sink: W,
}

impl<S: CycleSource, W: PredictionSink> PredictionService<S, W> {
    pub fn new(source: S, sink: W) -> Self {
        Self { source, sink }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Recompute and persist the prediction for `user_id`.
    ///
    /// Nothing is written unless a full prediction was produced.
    pub fn refresh(
        &self,
        user_id: Uuid,
        luteal_phase_length_days: i64,
    ) -> Result<PredictionSet, ServiceError> {
        let cycles = self.source.recent_cycles(user_id, RECENT_CYCLE_LIMIT)?;

        let result = statistics::compute_statistics(&cycles)
            .and_then(|stats| prediction::predict(&cycles, &stats, luteal_phase_length_days));
        let prediction = match result {
            Ok(p) => p,
            Err(err) => {
                warn!(%user_id, cycles = cycles.len(), error = %err, "no prediction");
                return Err(err.into());
            }
        };

        self.sink.save_prediction(user_id, &prediction)?;
        info!(
            %user_id,
            next_period = %prediction.next_period_date,
            confidence = prediction.next_period_confidence,
            "prediction refreshed"
        );
        Ok(prediction)
    }

    /// Statistics over the same recent window a refresh would use.
    pub fn statistics(&self, user_id: Uuid) -> Result<CycleStatistics, ServiceError> {
        let cycles = self.source.recent_cycles(user_id, RECENT_CYCLE_LIMIT)?;
        Ok(statistics::compute_statistics(&cycles)?)
    }
}
