//! Randomized pacing between outbound actions.

use healer_core::DelayConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Produces the pauses inserted between actions.
pub trait DelaySource: Send + Sync {
    /// Pause between two actions on the same platform.
    fn random_delay(&self) -> Duration;

    /// Pause between two discovery platforms.
    fn between_platform_delay(&self) -> Duration;

    /// Pause between two outreach batches.
    fn email_batch_delay(&self) -> Duration;

    /// Pick an index in `0..len`. Returns 0 for empty ranges.
    fn pick(&self, len: usize) -> usize;
}

/// [`DelaySource`] backed by a `StdRng`, seeded from config or entropy.
#[derive(Debug)]
pub struct SeededDelays {
    config: DelayConfig,
    rng: Mutex<StdRng>,
}

impl SeededDelays {
    /// Build from the `[delays]` config section.
    #[must_use]
    pub fn new(config: DelayConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    fn uniform(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(low..=high),
            Err(poisoned) => poisoned.into_inner().gen_range(low..=high),
        }
    }
}

impl DelaySource for SeededDelays {
    fn random_delay(&self) -> Duration {
        Duration::from_secs(self.uniform(self.config.min_secs, self.config.max_secs))
    }

    fn between_platform_delay(&self) -> Duration {
        let jitter = self.uniform(0, self.config.between_platforms_jitter_secs);
        Duration::from_secs(self.config.between_platforms_secs + jitter)
    }

    fn email_batch_delay(&self) -> Duration {
        let jitter = self.uniform(0, self.config.email_batch_jitter_secs);
        Duration::from_secs(self.config.email_batch_gap_secs + jitter)
    }

    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let last = u64::try_from(len - 1).unwrap_or(u64::MAX);
        usize::try_from(self.uniform(0, last)).unwrap_or(0)
    }
}

/// Sleep for `delay`, logging non-trivial pauses.
pub async fn pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    tracing::debug!(secs = delay.as_secs(), "pausing");
    tokio::time::sleep(delay).await;
}
