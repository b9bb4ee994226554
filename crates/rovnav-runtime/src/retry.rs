//! [`RetryPolicy`] – bounded hardware polling.
//!
//! At the start of every cycle the hardware is polled until it reports
//! success or the number of consecutive failures reaches the fail limit.
//! The limit is inclusive: exactly `fail_limit` failures already exhausts
//! the policy, and no further poll is attempted after that.
//!
//! Each call to [`RetryPolicy::poll`] starts from a fresh failure count.
//!
//! # Example
//!
//! ```rust
//! use rovnav_hal::SimRobot;
//! use rovnav_runtime::retry::{PollOutcome, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3).unwrap();
//!
//! let mut flaky = SimRobot::new().with_failures(2);
//! assert_eq!(policy.poll(&mut flaky), PollOutcome::Ready { attempts: 3 });
//!
//! let mut dead = SimRobot::new().with_failures(3);
//! assert_eq!(policy.poll(&mut dead), PollOutcome::Exhausted { failures: 3 });
//! assert_eq!(dead.poll_count(), 3);
//! ```

use rovnav_hal::RobotInterface;
use rovnav_types::NavError;
use tracing::{debug, warn};

/// Result of one bounded poll sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The hardware reported success on poll number `attempts`.
    Ready { attempts: u32 },
    /// `failures` consecutive polls failed and the limit was reached.
    Exhausted { failures: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// Polls the hardware at most `fail_limit` times per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    fail_limit: u32,
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns [`NavError::InvalidConfig`] for a limit of zero, which would
    /// fail every cycle without ever polling.
    pub fn new(fail_limit: u32) -> Result<Self, NavError> {
        if fail_limit == 0 {
            return Err(NavError::InvalidConfig(
                "fail_limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { fail_limit })
    }

    pub fn fail_limit(&self) -> u32 {
        self.fail_limit
    }

    /// Poll `hardware` until it succeeds or `fail_limit` consecutive polls
    /// have failed.
    pub fn poll<H: RobotInterface + ?Sized>(&self, hardware: &mut H) -> PollOutcome {
        let mut failures = 0;
        loop {
            match hardware.poll() {
                Ok(()) => {
                    return PollOutcome::Ready {
                        attempts: failures + 1,
                    };
                }
                Err(e) => {
                    failures += 1;
                    debug!(failures, error = %e, "hardware poll failed");
                    if failures >= self.fail_limit {
                        warn!(failures, "hardware poll fail limit reached");
                        return PollOutcome::Exhausted { failures };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rovnav_hal::SimRobot;

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(RetryPolicy::new(0), Err(NavError::InvalidConfig(_))));
    }

    #[test]
    fn immediate_success_takes_one_attempt() {
        let policy = RetryPolicy::new(5).unwrap();
        let mut robot = SimRobot::new();
        assert_eq!(policy.poll(&mut robot), PollOutcome::Ready { attempts: 1 });
        assert_eq!(robot.poll_count(), 1);
    }

    #[test]
    fn exactly_limit_failures_is_exhausted() {
        let policy = RetryPolicy::new(5).unwrap();
        let mut robot = SimRobot::new().with_failures(5);
        let outcome = policy.poll(&mut robot);
        assert_eq!(outcome, PollOutcome::Exhausted { failures: 5 });
        assert!(!outcome.is_ready());
        // The poll that would have succeeded is never issued.
        assert_eq!(robot.poll_count(), 5);
    }

    #[test]
    fn one_below_limit_still_succeeds() {
        let policy = RetryPolicy::new(5).unwrap();
        let mut robot = SimRobot::new().with_failures(4);
        assert_eq!(policy.poll(&mut robot), PollOutcome::Ready { attempts: 5 });
    }

    #[test]
    fn limit_of_one_gives_a_single_try() {
        let policy = RetryPolicy::new(1).unwrap();
        let mut robot = SimRobot::new().with_failures(1);
        assert_eq!(policy.poll(&mut robot), PollOutcome::Exhausted { failures: 1 });
        assert_eq!(robot.poll_count(), 1);
    }

    #[test]
    fn failure_count_is_fresh_per_call() {
        let policy = RetryPolicy::new(3).unwrap();
        let mut robot = SimRobot::new().with_poll_script([false, false, true, false, false, true]);
        assert_eq!(policy.poll(&mut robot), PollOutcome::Ready { attempts: 3 });
        assert_eq!(policy.poll(&mut robot), PollOutcome::Ready { attempts: 3 });
    }

    #[test]
    fn works_through_a_trait_object() {
        let policy = RetryPolicy::new(2).unwrap();
        let mut robot: Box<dyn RobotInterface> = Box::new(SimRobot::new().with_failures(1));
        assert!(policy.poll(robot.as_mut()).is_ready());
    }
}
