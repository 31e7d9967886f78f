//! Retry policy for transient search failures.
//!
//! The retry loop is an explicit state machine so timing and termination can
//! be tested without a clock:
//!
//! ```text
//! Attempting(n) --ok--------------------------> Succeeded
//! Attempting(n) --transient, n <= max_retries--> BackingOff(n, delay) --resume--> Attempting(n+1)
//! Attempting(n) --permanent or n > max_retries-> GivenUp
//! ```
//!
//! Backoff before retry `n` is `base * 2^(n-1)`, capped at `cap`.
//!
//! | Retry | Delay (base = 1 s, cap = 10 s) |
//! |-------|--------------------------------|
//! | 1     | 1 s                            |
//! | 2     | 2 s                            |
//! | 3     | 4 s                            |
//! | 5     | 10 s (capped)                  |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to send attempt `attempt` (1-based).
    Attempting { attempt: u32 },
    /// Attempt `attempt` failed transiently; wait `delay` before the next one.
    BackingOff { attempt: u32, delay: Duration },
    GivenUp { attempts: u32 },
    Succeeded { attempts: u32 },
}

/// Per-request retry bookkeeping driven by the caller's outcomes.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryMachine {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Attempting { attempt: 1 },
        }
    }

    #[must_use]
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Records a successful attempt. Only meaningful while attempting.
    pub fn succeed(&mut self) -> RetryState {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = RetryState::Succeeded { attempts: attempt };
        }
        self.state
    }

    /// Records a failed attempt and decides between backing off and giving up.
    pub fn fail(&mut self, transient: bool) -> RetryState {
        self.fail_after(transient, None)
    }

    /// Like [`fail`](Self::fail), but the backoff is at least `hint` (a
    /// server-requested wait), still capped at the policy's `backoff_cap`.
    pub fn fail_after(&mut self, transient: bool, hint: Option<Duration>) -> RetryState {
        if let RetryState::Attempting { attempt } = self.state {
            self.state = if transient && attempt <= self.policy.max_retries {
                let backoff = self.policy.delay_for(attempt);
                let delay = hint.map_or(backoff, |h| h.max(backoff).min(self.policy.backoff_cap));
                RetryState::BackingOff { attempt, delay }
            } else {
                RetryState::GivenUp { attempts: attempt }
            };
        }
        self.state
    }

    /// Leaves the backoff state once the delay has elapsed.
    pub fn resume(&mut self) -> RetryState {
        if let RetryState::BackingOff { attempt, .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: attempt + 1,
            };
        }
        self.state
    }
}

/// Blocking waits on the fetch path (backoff, cooldown, token activation,
/// throttling). Injected so tests can observe delays without sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Real waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(10),
        }
    }

    #[test]
    fn delays_double_then_cap() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(4), Duration::from_secs(8));
        assert_eq!(p.delay_for(5), Duration::from_secs(10));
        assert_eq!(p.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn success_on_first_attempt() {
        let mut m = RetryMachine::new(policy());
        assert_eq!(m.state(), RetryState::Attempting { attempt: 1 });
        assert_eq!(m.succeed(), RetryState::Succeeded { attempts: 1 });
    }

    #[test]
    fn transient_failures_back_off_until_retries_run_out() {
        let mut m = RetryMachine::new(policy());
        let mut delays = Vec::new();
        loop {
            match m.fail(true) {
                RetryState::BackingOff { delay, .. } => {
                    delays.push(delay);
                    m.resume();
                }
                RetryState::GivenUp { attempts } => {
                    assert_eq!(attempts, 4, "1 initial try + 3 retries");
                    break;
                }
                other => panic!("unexpected state {other:?}"),
            }
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn permanent_failure_gives_up_immediately() {
        let mut m = RetryMachine::new(policy());
        assert_eq!(m.fail(false), RetryState::GivenUp { attempts: 1 });
    }

    #[test]
    fn zero_retries_gives_up_after_one_transient_failure() {
        let mut m = RetryMachine::new(RetryPolicy {
            max_retries: 0,
            ..policy()
        });
        assert_eq!(m.fail(true), RetryState::GivenUp { attempts: 1 });
    }

    #[test]
    fn recovery_after_backoff_succeeds() {
        let mut m = RetryMachine::new(policy());
        m.fail(true);
        assert_eq!(m.resume(), RetryState::Attempting { attempt: 2 });
        assert_eq!(m.succeed(), RetryState::Succeeded { attempts: 2 });
    }

    #[test]
    fn server_hint_lengthens_backoff_up_to_cap() {
        let mut m = RetryMachine::new(policy());
        assert_eq!(
            m.fail_after(true, Some(Duration::from_secs(3))),
            RetryState::BackingOff {
                attempt: 1,
                delay: Duration::from_secs(3)
            }
        );
        m.resume();
        assert_eq!(
            m.fail_after(true, Some(Duration::from_secs(30))),
            RetryState::BackingOff {
                attempt: 2,
                delay: Duration::from_secs(10)
            }
        );
    }

    #[test]
    fn short_server_hint_keeps_exponential_delay() {
        let mut m = RetryMachine::new(policy());
        m.fail(true);
        m.resume();
        assert_eq!(
            m.fail_after(true, Some(Duration::from_millis(100))),
            RetryState::BackingOff {
                attempt: 2,
                delay: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn terminal_states_ignore_further_events() {
        let mut m = RetryMachine::new(policy());
        m.fail(false);
        assert_eq!(m.resume(), RetryState::GivenUp { attempts: 1 });
        assert_eq!(m.succeed(), RetryState::GivenUp { attempts: 1 });
    }
}
