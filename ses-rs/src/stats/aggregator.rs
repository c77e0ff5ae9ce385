use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::types::EmailStats;
use crate::error::{Result, ServiceError};
use crate::storage::CounterStore;

/// Store key of the stats hash
const STATS_KEY: &str = "email-stats";

const TOTAL_SENT_FIELD: &str = "totalEmailsSent";
const SUCCESS_FIELD: &str = "successCount";
const TOTAL_ERR_FIELD: &str = "totalErrCount";

/// Prefix of the per-code fields, e.g. `errors:MessageRejected`
const ERROR_FIELD_PREFIX: &str = "errors:";

/// Aggregates send outcomes into store-backed counters
pub struct StatsAggregator {
    store: Arc<dyn CounterStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Count one successful send
    pub async fn increment_success(&self) -> Result<()> {
        self.store
            .increment(STATS_KEY, &[TOTAL_SENT_FIELD, SUCCESS_FIELD])
            .await
    }

    /// Count one failed send under `error_code`
    pub async fn increment_error(&self, error_code: &str) -> Result<()> {
        let code_field = format!("{}{}", ERROR_FIELD_PREFIX, error_code);
        self.store
            .increment(STATS_KEY, &[TOTAL_SENT_FIELD, TOTAL_ERR_FIELD, &code_field])
            .await
    }

    /// Current counters; all zeros when nothing was recorded yet
    pub async fn get_stats(&self) -> Result<EmailStats> {
        let fields = self.store.get_all(STATS_KEY).await?;
        stats_from_fields(fields)
    }
}

fn to_count(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| ServiceError::Storage(format!("negative counter {}: {}", field, value)))
}

/// Bucket raw hash fields into a snapshot, independent of field order
fn stats_from_fields(fields: HashMap<String, i64>) -> Result<EmailStats> {
    let mut stats = EmailStats::default();

    for (field, value) in fields {
        let count = to_count(&field, value)?;
        match field.as_str() {
            TOTAL_SENT_FIELD => stats.total_emails_sent = count,
            SUCCESS_FIELD => stats.success_count = count,
            TOTAL_ERR_FIELD => stats.total_err_count = count,
            other => match other.strip_prefix(ERROR_FIELD_PREFIX) {
                Some(code) if !code.is_empty() => {
                    stats.errors.insert(code.to_string(), count);
                }
                _ => debug!("Ignoring unknown stats field {}", other),
            },
        }
    }

    Ok(stats)
}
