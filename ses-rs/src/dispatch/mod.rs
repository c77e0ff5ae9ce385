//! Send orchestration
//!
//! [`Dispatcher::send`] drives one request through its whole lifecycle:
//! validation, an optional synthetic failure, one quota entry per recipient
//! and finally the outcome counters. Every send ends in exactly one stats
//! update, success or error.

pub mod failure;

pub use failure::{
    FailureInjector, Randomness, ScriptedRandomness, SeededRandomness, ThreadRandomness,
    FAILURE_CATALOG,
};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ProviderError, Result, ServiceError, UNKNOWN_ERROR_CODE};
use crate::model::{EmailRequest, SendEmailResponse};
use crate::quota::QuotaTracker;
use crate::stats::{EmailStats, StatsAggregator};
use crate::storage::Stores;
use crate::validation::ValidationChain;

pub struct Dispatcher {
    chain: ValidationChain,
    failures: FailureInjector,
    tracker: Arc<QuotaTracker>,
    stats: StatsAggregator,
}

impl Dispatcher {
    pub fn new(
        chain: ValidationChain,
        failures: FailureInjector,
        tracker: Arc<QuotaTracker>,
        stats: StatsAggregator,
    ) -> Self {
        Self {
            chain,
            failures,
            tracker,
            stats,
        }
    }

    /// Wire the standard pipeline over the given stores
    pub fn from_config(config: &Config, stores: &Stores) -> Self {
        let tracker = Arc::new(QuotaTracker::new(stores.sends.clone(), config.quota.window()));
        let chain = ValidationChain::from_config(config, tracker.clone());
        info!("Validation chain: {}", chain.names().join(" -> "));

        Self::new(
            chain,
            FailureInjector::from_config(&config.failure),
            tracker,
            StatsAggregator::new(stores.counters.clone()),
        )
    }

    /// Send one email
    ///
    /// Rejections and synthetic failures are returned as provider errors
    /// after being counted. A store fault while recording quota entries is
    /// reported as a generic `InternalFailure`; entries already written for
    /// earlier recipients stay in place.
    pub async fn send(&self, request: &EmailRequest) -> Result<SendEmailResponse> {
        if let Err(e) = self.chain.validate(request).await {
            self.record_error(e.stat_code()).await;
            return Err(e);
        }

        if let Some(failure) = self.failures.roll() {
            self.record_error(failure.code().as_str()).await;
            return Err(failure.into());
        }

        let message_id = Uuid::new_v4().to_string();

        for (i, recipient) in request.destination.all().into_iter().enumerate() {
            let member = format!("{}:{}:{}", message_id, i, recipient);
            if let Err(e) = self.tracker.track_send(&member).await {
                error!("Failed to track send for message {}: {}", message_id, e);
                let err = ProviderError::internal();
                self.record_error(err.code().as_str()).await;
                return Err(err.into());
            }
        }

        // The send went through; a lost counter must not turn it into a failure
        if let Err(e) = self.stats.increment_success().await {
            warn!("Failed to record success for message {}: {}", message_id, e);
        }

        info!(
            "Sent message {} from {} to {} recipient(s)",
            message_id,
            request.source,
            request.destination.len()
        );

        Ok(SendEmailResponse { message_id })
    }

    /// [`send`](Self::send) bounded by `deadline`
    pub async fn send_with_deadline(
        &self,
        request: &EmailRequest,
        deadline: Duration,
    ) -> Result<SendEmailResponse> {
        match tokio::time::timeout(deadline, self.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Send from {} exceeded deadline of {:?}", request.source, deadline);
                if tokio::time::timeout(deadline, self.record_error(UNKNOWN_ERROR_CODE))
                    .await
                    .is_err()
                {
                    warn!("Timed out recording expired send");
                }
                Err(ServiceError::Timeout)
            }
        }
    }

    /// Current send statistics
    pub async fn stats(&self) -> Result<EmailStats> {
        self.stats.get_stats().await
    }

    async fn record_error(&self, code: &str) {
        if let Err(e) = self.stats.increment_error(code).await {
            warn!("Failed to record {} error: {}", code, e);
        }
    }
}
