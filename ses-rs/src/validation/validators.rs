use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use super::Validator;
use crate::error::{ErrorCode, ProviderError, Result};
use crate::model::EmailRequest;
use crate::quota::WindowCounter;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Whether `address` looks like a deliverable email address
pub fn is_valid_email(address: &str) -> bool {
    email_regex().is_match(address)
}

fn reject(code: ErrorCode, message: &str) -> Result<()> {
    Err(ProviderError::new(code, message).into())
}

/// Every recipient must be a well-formed address
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFormatValidator;

impl EmailFormatValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for EmailFormatValidator {
    fn name(&self) -> &'static str {
        "email_format"
    }

    async fn validate(&self, request: &EmailRequest) -> Result<()> {
        if request
            .destination
            .all()
            .into_iter()
            .any(|address| !is_valid_email(address))
        {
            return reject(
                ErrorCode::InvalidParameterValue,
                "Invalid recipient email address",
            );
        }
        Ok(())
    }
}

/// Body text must fit in the configured number of bytes
#[derive(Debug, Clone, Copy)]
pub struct MaxBodySizeValidator {
    max_bytes: usize,
}

impl MaxBodySizeValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

#[async_trait]
impl Validator for MaxBodySizeValidator {
    fn name(&self) -> &'static str {
        "max_body_size"
    }

    async fn validate(&self, request: &EmailRequest) -> Result<()> {
        if request.body_text().len() > self.max_bytes {
            return reject(ErrorCode::MessageTooLong, "Email body exceeds maximum size");
        }
        Ok(())
    }
}

/// Recipient count (to + cc + bcc, duplicates included) must not exceed the maximum
#[derive(Debug, Clone, Copy)]
pub struct MaxDestinationsValidator {
    max_destinations: usize,
}

impl MaxDestinationsValidator {
    pub fn new(max_destinations: usize) -> Self {
        Self { max_destinations }
    }
}

#[async_trait]
impl Validator for MaxDestinationsValidator {
    fn name(&self) -> &'static str {
        "max_destinations"
    }

    async fn validate(&self, request: &EmailRequest) -> Result<()> {
        if request.destination.len() > self.max_destinations {
            return reject(ErrorCode::LimitExceededException, "Too many recipients");
        }
        Ok(())
    }
}

/// In sandbox mode only allow-listed recipients may receive mail
#[derive(Debug, Clone)]
pub struct SandboxValidator {
    enabled: bool,
    allowed: HashSet<String>,
}

impl SandboxValidator {
    pub fn new(enabled: bool, allowed_destinations: Vec<String>) -> Self {
        Self {
            enabled,
            allowed: allowed_destinations.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Validator for SandboxValidator {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn validate(&self, request: &EmailRequest) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if request
            .destination
            .all()
            .into_iter()
            .any(|address| !self.allowed.contains(address))
        {
            return reject(ErrorCode::MessageRejected, "Cannot send emails outside sandbox");
        }
        Ok(())
    }
}

/// Source address must be verified (exact, case-sensitive match)
#[derive(Debug, Clone)]
pub struct VerifiedSenderValidator {
    verified: HashSet<String>,
}

impl VerifiedSenderValidator {
    pub fn new(verified_senders: Vec<String>) -> Self {
        Self {
            verified: verified_senders.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Validator for VerifiedSenderValidator {
    fn name(&self) -> &'static str {
        "verified_sender"
    }

    async fn validate(&self, request: &EmailRequest) -> Result<()> {
        if !self.verified.contains(&request.source) {
            return reject(
                ErrorCode::EmailAddressNotVerified,
                "Email address is not verified",
            );
        }
        Ok(())
    }
}

/// Rejects once the trailing-window send count reaches the ceiling
///
/// Shares `LimitExceededException` with [`MaxDestinationsValidator`]; only
/// the message tells them apart.
pub struct QuotaValidator {
    counter: Arc<dyn WindowCounter>,
    max_sends: u64,
}

impl QuotaValidator {
    pub fn new(counter: Arc<dyn WindowCounter>, max_sends: u64) -> Self {
        Self { counter, max_sends }
    }
}

#[async_trait]
impl Validator for QuotaValidator {
    fn name(&self) -> &'static str {
        "quota"
    }

    async fn validate(&self, _request: &EmailRequest) -> Result<()> {
        // store errors propagate as-is
        let sent = self.counter.count_in_window().await?;
        if sent >= self.max_sends {
            return reject(ErrorCode::LimitExceededException, "Sending quota exceeded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::model::Destination;

    fn with_destination(to: &[&str], cc: &[&str], bcc: &[&str]) -> EmailRequest {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        EmailRequest {
            destination: Destination {
                to: owned(to),
                cc: owned(cc),
                bcc: owned(bcc),
            },
            ..Default::default()
        }
    }

    fn with_body(body: &str) -> EmailRequest {
        let mut req = EmailRequest::default();
        req.message.body.text.data = body.to_string();
        req
    }

    fn rejected_with(result: Result<()>) -> ProviderError {
        match result {
            Err(ServiceError::Provider(e)) => e,
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    struct FixedCounter(Result<u64>);

    #[async_trait]
    impl WindowCounter for FixedCounter {
        async fn count_in_window(&self) -> Result<u64> {
            match &self.0 {
                Ok(n) => Ok(*n),
                Err(e) => Err(ServiceError::Storage(e.to_string())),
            }
        }
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name+tag@example.co.uk"));
        assert!(!is_valid_email("invalid-email"));
        assert!(!is_valid_email("test@domain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@example.c"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn test_email_format() {
        let v = EmailFormatValidator::new();

        let ok = with_destination(&["valid@example.com"], &["cc@example.com"], &["bcc@example.com"]);
        assert!(v.validate(&ok).await.is_ok());

        let bad = with_destination(&["invalid-email"], &[], &[]);
        assert_eq!(rejected_with(v.validate(&bad).await).code(), ErrorCode::InvalidParameterValue);

        let bad_bcc = with_destination(&["valid@example.com"], &[], &["nope"]);
        assert!(v.validate(&bad_bcc).await.is_err());

        // nothing to check
        assert!(v.validate(&EmailRequest::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_max_body_size() {
        let v = MaxBodySizeValidator::new(10);

        assert!(v.validate(&with_body("")).await.is_ok());
        assert!(v.validate(&with_body("1234567890")).await.is_ok());

        let err = rejected_with(v.validate(&with_body("12345678901")).await);
        assert_eq!(err.code(), ErrorCode::MessageTooLong);

        // bytes, not characters: 4 x 3-byte chars
        assert!(v.validate(&with_body("€€€€")).await.is_err());
    }

    #[tokio::test]
    async fn test_max_destinations() {
        let v = MaxDestinationsValidator::new(3);

        let at_limit = with_destination(&["a@example.com"], &["b@example.com"], &["c@example.com"]);
        assert!(v.validate(&at_limit).await.is_ok());

        let over = with_destination(&["a@example.com", "b@example.com"], &["c@example.com"], &["d@example.com"]);
        let err = rejected_with(v.validate(&over).await);
        assert_eq!(err.code(), ErrorCode::LimitExceededException);
        assert_eq!(err.message(), "Too many recipients");

        // duplicates are counted
        let dupes = with_destination(&["a@example.com"; 4], &[], &[]);
        assert!(v.validate(&dupes).await.is_err());

        assert!(v.validate(&EmailRequest::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sandbox() {
        let allowed = vec!["allowed@example.com".to_string(), "test@example.com".to_string()];
        let v = SandboxValidator::new(true, allowed);

        assert!(v.validate(&with_destination(&["allowed@example.com"], &[], &[])).await.is_ok());

        let mixed = with_destination(&["allowed@example.com"], &["notallowed@example.com"], &[]);
        assert_eq!(rejected_with(v.validate(&mixed).await).code(), ErrorCode::MessageRejected);

        let empty_list = SandboxValidator::new(true, Vec::new());
        assert!(empty_list
            .validate(&with_destination(&["random@example.com"], &[], &[]))
            .await
            .is_err());

        let disabled = SandboxValidator::new(false, Vec::new());
        assert!(disabled
            .validate(&with_destination(&["random@example.com"], &[], &[]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_sandbox_scenario() {
        let v = SandboxValidator::new(true, vec!["a@x.com".to_string()]);
        let err = rejected_with(v.validate(&with_destination(&["b@x.com"], &[], &[])).await);
        assert_eq!(err.code(), ErrorCode::MessageRejected);
    }

    #[tokio::test]
    async fn test_verified_sender() {
        let v = VerifiedSenderValidator::new(vec!["verified@example.com".to_string()]);

        let mut req = EmailRequest::default();
        req.source = "verified@example.com".to_string();
        assert!(v.validate(&req).await.is_ok());

        req.source = "Verified@example.com".to_string();
        assert_eq!(
            rejected_with(v.validate(&req).await).code(),
            ErrorCode::EmailAddressNotVerified
        );

        req.source = "s@x.com".to_string();
        assert!(v.validate(&req).await.is_err());
    }

    #[tokio::test]
    async fn test_quota() {
        let cases = [(5, false), (9, false), (10, true), (11, true)];
        for (sent, rejected) in cases {
            let v = QuotaValidator::new(Arc::new(FixedCounter(Ok(sent))), 10);
            let result = v.validate(&EmailRequest::default()).await;
            assert_eq!(result.is_err(), rejected, "sent = {}", sent);
            if rejected {
                let err = rejected_with(result);
                assert_eq!(err.code(), ErrorCode::LimitExceededException);
                assert_eq!(err.message(), "Sending quota exceeded");
            }
        }
    }

    #[tokio::test]
    async fn test_quota_store_error_propagates() {
        let failing = FixedCounter(Err(ServiceError::Storage("down".to_string())));
        let v = QuotaValidator::new(Arc::new(failing), 10);

        let result = v.validate(&EmailRequest::default()).await;
        assert!(matches!(result, Err(ServiceError::Storage(_))));
    }

    #[tokio::test]
    async fn test_quota_and_destinations_share_code() {
        let quota = QuotaValidator::new(Arc::new(FixedCounter(Ok(1))), 1);
        let quota_err = rejected_with(quota.validate(&EmailRequest::default()).await);

        let dest = MaxDestinationsValidator::new(0);
        let dest_err = rejected_with(dest.validate(&with_destination(&["a@example.com"], &[], &[])).await);

        assert_eq!(quota_err.code(), dest_err.code());
        assert_ne!(quota_err.message(), dest_err.message());
    }
}
