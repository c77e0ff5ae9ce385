//! Request validation
//!
//! An ordered, fail-fast list of independent checks. Callers only ever see
//! the first failure, so the order is part of the contract:
//!
//! 1. [`EmailFormatValidator`]: recipient address format
//! 2. [`MaxBodySizeValidator`]: body byte length
//! 3. [`MaxDestinationsValidator`]: recipient count
//! 4. [`SandboxValidator`]: allow-listed recipients only
//! 5. [`VerifiedSenderValidator`]: known source address
//! 6. [`QuotaValidator`]: trailing-window send count

pub mod validators;

pub use validators::{
    EmailFormatValidator, MaxBodySizeValidator, MaxDestinationsValidator, QuotaValidator,
    SandboxValidator, VerifiedSenderValidator,
};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::model::EmailRequest;
use crate::quota::WindowCounter;

/// A single check against an outgoing request
#[async_trait]
pub trait Validator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn validate(&self, request: &EmailRequest) -> Result<()>;
}

/// Fixed sequence of validators, run in order
pub struct ValidationChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationChain {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Build the standard chain from configuration
    pub fn from_config(config: &Config, counter: Arc<dyn WindowCounter>) -> Self {
        Self::new(vec![
            Box::new(EmailFormatValidator::new()),
            Box::new(MaxBodySizeValidator::new(config.limits.max_body_bytes)),
            Box::new(MaxDestinationsValidator::new(config.limits.max_destinations)),
            Box::new(SandboxValidator::new(
                config.sandbox.enabled,
                config.sandbox.allowed_destinations.clone(),
            )),
            Box::new(VerifiedSenderValidator::new(
                config.identity.verified_senders.clone(),
            )),
            Box::new(QuotaValidator::new(counter, config.quota.max_sends)),
        ])
    }

    /// Run every validator until one fails
    pub async fn validate(&self, request: &EmailRequest) -> Result<()> {
        for validator in &self.validators {
            if let Err(e) = validator.validate(request).await {
                debug!("Validator {} rejected request: {}", validator.name(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Validator names in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ServiceError};
    use crate::model::Destination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counter stub that records how often it was asked
    struct CountingCounter {
        count: u64,
        calls: AtomicUsize,
    }

    impl CountingCounter {
        fn new(count: u64) -> Arc<Self> {
            Arc::new(Self {
                count,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WindowCounter for CountingCounter {
        async fn count_in_window(&self) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.count)
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.limits.max_destinations = 2;
        config.limits.max_body_bytes = 100;
        config.sandbox.enabled = true;
        config.sandbox.allowed_destinations =
            vec!["a@example.com".to_string(), "b@example.com".to_string()];
        config.identity.verified_senders = vec!["s@example.com".to_string()];
        config.quota.max_sends = 10;
        config
    }

    fn request(source: &str, to: &[&str]) -> EmailRequest {
        let mut req = EmailRequest {
            source: source.to_string(),
            destination: Destination {
                to: to.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        };
        req.message.body.text.data = "hello".to_string();
        req
    }

    fn code_of(result: Result<()>) -> ErrorCode {
        match result {
            Err(ServiceError::Provider(e)) => e.code(),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_chain_order() {
        let chain = ValidationChain::from_config(&config(), CountingCounter::new(0));
        assert_eq!(
            chain.names(),
            vec!["email_format", "max_body_size", "max_destinations", "sandbox", "verified_sender", "quota"]
        );
    }

    #[tokio::test]
    async fn test_valid_request_passes_and_queries_quota_once() {
        let counter = CountingCounter::new(0);
        let chain = ValidationChain::from_config(&config(), counter.clone());

        chain
            .validate(&request("s@example.com", &["a@example.com"]))
            .await
            .unwrap();
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test]
    async fn test_too_many_destinations_rejected_before_quota() {
        let counter = CountingCounter::new(0);
        let chain = ValidationChain::from_config(&config(), counter.clone());

        let req = request(
            "s@example.com",
            &["a@example.com", "b@example.com", "a@example.com"],
        );
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::LimitExceededException);
        assert_eq!(counter.calls(), 0);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let chain = ValidationChain::from_config(&config(), CountingCounter::new(100));

        // bad format, outside sandbox, unverified sender and over quota: format reported
        let req = request("nobody@example.com", &["invalid-email"]);
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::InvalidParameterValue);

        // outside sandbox and unverified: sandbox reported
        let req = request("nobody@example.com", &["c@example.com"]);
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::MessageRejected);

        // unverified and over quota: sender reported
        let req = request("nobody@example.com", &["a@example.com"]);
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::EmailAddressNotVerified);

        // only over quota
        let req = request("s@example.com", &["a@example.com"]);
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::LimitExceededException);
    }

    #[tokio::test]
    async fn test_unverified_sender_rejected_regardless_of_recipients() {
        let mut config = config();
        config.sandbox.enabled = false;
        let chain = ValidationChain::from_config(&config, CountingCounter::new(0));

        let req = request("s@x.com", &["anyone@example.org"]);
        assert_eq!(code_of(chain.validate(&req).await), ErrorCode::EmailAddressNotVerified);
    }

    #[tokio::test]
    async fn test_empty_chain_passes() {
        let chain = ValidationChain::new(Vec::new());
        assert!(chain.validate(&EmailRequest::default()).await.is_ok());
    }
}
