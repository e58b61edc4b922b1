//! Bounded retry for CAS-based reference updates.
//!
//! A unit of work reads the current reference state, computes a proposed
//! new state, and attempts a compare-and-swap. On a CAS conflict the
//! whole read-compute-CAS cycle is re-run against the freshly observed
//! state, up to a configured attempt budget. Conflicts are signaled
//! through the explicit [`Attempt`] result type, not an exception-like
//! mechanism; any other error aborts immediately and is never retried.

use tracing::debug;

use catena_types::ObjId;

/// Configuration for the retry loop.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts before giving up. Must be at least 1.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Outcome of one attempt of a CAS-based work unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The work completed; stop retrying.
    Complete(T),
    /// The CAS lost a race; `observed` is the head the winner installed.
    /// The work will be re-run from scratch.
    Retry { observed: ObjId },
}

/// Error from [`with_retry`].
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt conflicted; the caller may retry the whole operation.
    #[error("retry budget exhausted after {attempts} conflicting attempts")]
    Exhausted { attempts: u32 },

    /// The work unit failed with a non-retryable error.
    #[error(transparent)]
    Inner(E),
}

/// Run `work` until it completes, retrying on CAS conflicts up to the
/// configured attempt budget.
///
/// `work` receives the 1-based attempt number. It must be a pure function
/// of freshly-read state plus the operation's original inputs, so that
/// re-running it under a different head is safe; it must not reuse state
/// observed by a previous attempt.
pub fn with_retry<T, E, F>(config: &RetryConfig, mut work: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Result<Attempt<T>, E>,
{
    for attempt in 1..=config.max_attempts.max(1) {
        match work(attempt).map_err(RetryError::Inner)? {
            Attempt::Complete(value) => return Ok(value),
            Attempt::Retry { observed } => {
                debug!(
                    attempt,
                    observed = %observed.short_hex(),
                    "CAS conflict, re-running work unit"
                );
            }
        }
    }
    Err(RetryError::Exhausted {
        attempts: config.max_attempts.max(1),
    })
}
