use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::FailureConfig;
use crate::error::{ErrorCode, ProviderError};

/// Source of uniform draws in `0..bound`
pub trait Randomness: Send + Sync {
    fn below(&self, bound: u32) -> u32;
}

/// Per-thread generator, seeded from the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandomness;

impl Randomness for ThreadRandomness {
    fn below(&self, bound: u32) -> u32 {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Deterministic generator for reproducible runs
#[derive(Debug)]
pub struct SeededRandomness {
    rng: Mutex<StdRng>,
}

impl SeededRandomness {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Randomness for SeededRandomness {
    fn below(&self, bound: u32) -> u32 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..bound),
            Err(poisoned) => poisoned.into_inner().gen_range(0..bound),
        }
    }
}

/// Replays a fixed list of draws, wrapping each into `0..bound`.
/// Once the list runs out every draw returns `bound - 1`.
#[derive(Debug, Default)]
pub struct ScriptedRandomness {
    draws: Mutex<VecDeque<u32>>,
}

impl ScriptedRandomness {
    pub fn new(draws: impl IntoIterator<Item = u32>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
        }
    }
}

impl Randomness for ScriptedRandomness {
    fn below(&self, bound: u32) -> u32 {
        let next = match self.draws.lock() {
            Ok(mut draws) => draws.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        match next {
            Some(v) => v % bound,
            None => bound.saturating_sub(1),
        }
    }
}

/// Errors a synthetic failure can produce, each equally likely
pub const FAILURE_CATALOG: [(ErrorCode, &str); 7] = [
    (ErrorCode::InternalFailure, "Unexpected internal error occurred."),
    (ErrorCode::ThrottlingException, "Rate limit exceeded."),
    (
        ErrorCode::AccountSendingPausedException,
        "Email sending is disabled for your account.",
    ),
    (
        ErrorCode::AccessDeniedException,
        "You are not authorized to perform this action.",
    ),
    (ErrorCode::RequestExpired, "Request has expired."),
    (ErrorCode::MessageRejected, "Email address is on the suppression list."),
    (
        ErrorCode::ServiceUnavailable,
        "Service is temporarily unavailable.",
    ),
];

/// Decides whether a send fails synthetically, and how
pub struct FailureInjector {
    enabled: bool,
    percentage: u32,
    rng: Arc<dyn Randomness>,
}

impl FailureInjector {
    pub fn new(enabled: bool, percentage: u32, rng: Arc<dyn Randomness>) -> Self {
        Self {
            enabled,
            percentage: percentage.min(100),
            rng,
        }
    }

    /// Never fails
    pub fn disabled() -> Self {
        Self::new(false, 0, Arc::new(ThreadRandomness))
    }

    pub fn from_config(config: &FailureConfig) -> Self {
        let rng: Arc<dyn Randomness> = match config.seed {
            Some(seed) => Arc::new(SeededRandomness::new(seed)),
            None => Arc::new(ThreadRandomness),
        };
        Self::new(config.enabled, config.effective_percentage(), rng)
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    /// Roll once; `Some` means the send must fail with that error
    pub fn roll(&self) -> Option<ProviderError> {
        if !self.enabled {
            return None;
        }

        if self.rng.below(100) >= self.percentage {
            return None;
        }

        let (code, message) = FAILURE_CATALOG[self.rng.below(FAILURE_CATALOG.len() as u32) as usize];
        debug!("Injecting synthetic failure {}", code);
        Some(ProviderError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injector(enabled: bool, percentage: u32, draws: Vec<u32>) -> FailureInjector {
        FailureInjector::new(enabled, percentage, Arc::new(ScriptedRandomness::new(draws)))
    }

    #[test]
    fn test_disabled_never_fails() {
        let inj = injector(false, 100, vec![0, 0]);
        assert!(inj.roll().is_none());
    }

    #[test]
    fn test_roll_below_percentage_picks_catalog_entry() {
        // 29 < 30 fails, then index 1
        let inj = injector(true, 30, vec![29, 1]);
        let err = inj.roll().unwrap();
        assert_eq!(err.code(), ErrorCode::ThrottlingException);
        assert_eq!(err.message(), "Rate limit exceeded.");
    }

    #[test]
    fn test_roll_at_percentage_passes() {
        let inj = injector(true, 30, vec![30]);
        assert!(inj.roll().is_none());
    }

    #[test]
    fn test_zero_and_full_percentage() {
        let never = injector(true, 0, vec![0, 0, 0]);
        assert!(never.roll().is_none());

        let always = injector(true, 100, vec![99, 6]);
        assert_eq!(always.roll().unwrap().code(), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn test_percentage_capped() {
        assert_eq!(injector(true, 250, vec![]).percentage(), 100);
    }

    #[test]
    fn test_from_config_clamps_and_defaults() {
        let mut config = FailureConfig {
            enabled: true,
            percentage: Some(-5),
            seed: Some(7),
        };
        assert_eq!(FailureInjector::from_config(&config).percentage(), 0);

        config.percentage = Some(150);
        assert_eq!(FailureInjector::from_config(&config).percentage(), 100);

        config.percentage = None;
        assert_eq!(FailureInjector::from_config(&config).percentage(), 30);
    }

    #[test]
    fn test_seeded_sequences_repeat() {
        let a = SeededRandomness::new(42);
        let b = SeededRandomness::new(42);
        let first: Vec<u32> = (0..20).map(|_| a.below(100)).collect();
        let second: Vec<u32> = (0..20).map(|_| b.below(100)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|v| *v < 100));
    }

    #[test]
    fn test_every_catalog_entry_reachable() {
        for (i, (code, _)) in FAILURE_CATALOG.iter().enumerate() {
            let inj = injector(true, 100, vec![0, i as u32]);
            assert_eq!(inj.roll().unwrap().code(), *code);
        }
    }
}
