//! Contention backoff.

use std::time::Duration;

use rand::Rng;

/// Randomized exponential backoff between fixed bounds.
///
/// Each step doubles the ceiling up to `max` and sleeps a uniformly random
/// duration between `min` and the current ceiling, so contenders spread out
/// instead of retrying in lockstep.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    min: Duration,
    max: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub(crate) fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            ceiling: min,
        }
    }

    /// Next sleep duration; grows the ceiling for the following step.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling;
        self.ceiling = (self.ceiling * 2).min(self.max);

        if ceiling <= self.min {
            return self.min;
        }
        let span = (ceiling - self.min).as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=span);
        self.min + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_stay_within_bounds() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(100);
        let mut backoff = Backoff::new(min, max);
        for _ in 0..20 {
            let delay = backoff.next_delay();
            assert!(delay >= min, "delay {:?} below min", delay);
            assert!(delay <= max, "delay {:?} above max", delay);
        }
    }

    #[test]
    fn ceiling_grows_and_saturates() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(80));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.ceiling, Duration::from_millis(80));
    }
}
