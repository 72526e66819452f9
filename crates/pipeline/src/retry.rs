use std::time::Duration;

/// Backoff curve for the pipeline's retry stage. Deterministic jitter
/// avoids pulling in a random-number crate for what is just spreading
/// concurrent retries across a window.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    Exponential { base: Duration, max: Duration, multiplier: f64, jitter: bool },
    Constant { delay: Duration },
}

impl RetryStrategy {
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { base, max, multiplier, jitter } => {
                let base_secs = base.as_secs_f64();
                #[allow(clippy::cast_possible_wrap)]
                let raw = base_secs * multiplier.powi(attempt as i32);

                let adjusted = if *jitter {
                    let jitter_factor = 1.0 + 0.1 * f64::from(attempt % 5);
                    raw * jitter_factor
                } else {
                    raw
                };

                Duration::from_secs_f64(adjusted.min(max.as_secs_f64()))
            }
            Self::Constant { delay } => *delay,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_no_jitter_doubles_each_attempt() {
        let strategy =
            RetryStrategy::Exponential { base: Duration::from_millis(100), max: Duration::from_secs(60), multiplier: 2.0, jitter: false };
        assert_eq!(strategy.delay_for(0), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(400));
    }

    #[test]
    fn exponential_clamps_to_max() {
        let strategy =
            RetryStrategy::Exponential { base: Duration::from_secs(1), max: Duration::from_secs(5), multiplier: 3.0, jitter: false };
        assert_eq!(strategy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn constant_ignores_attempt() {
        let strategy = RetryStrategy::Constant { delay: Duration::from_millis(250) };
        assert_eq!(strategy.delay_for(0), strategy.delay_for(9));
    }
}
