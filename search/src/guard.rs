//! Oracle guard: retry, timeout accounting, result validation.
//!
//! [`GuardedOracle`] wraps a raw [`ScoringOracle`] so the search loop only
//! ever sees validated scores, exact permutations, or a typed degradation.
//! Applying the fallback is the caller's job; the guard only reports why one
//! is needed.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::context::{OracleContext, RankRequest};
use crate::node::Score;
use crate::oracle::{OracleError, ScoringOracle};
use crate::policy::RetryPolicyV1;

/// Waits between retry attempts.
pub trait Backoff: Send + Sync {
    fn wait(&self, delay: Duration);
}

/// Blocks the calling thread for the full delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Backoff for ThreadSleep {
    fn wait(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Skips the delay entirely. For tests and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn wait(&self, _delay: Duration) {}
}

/// Which oracle capability a degradation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleStageV1 {
    Evaluate,
    Rank,
    RankBatch,
}

impl OracleStageV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Evaluate => "evaluate_batch",
            Self::Rank => "rank_actions",
            Self::RankBatch => "rank_batch",
        }
    }
}

/// An oracle response that broke the result contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedResultV1 {
    WrongLength { expected: u64, actual: u64 },
    /// `raw` is the offending value rendered with `{:?}` (covers NaN).
    ScoreOutOfRange { index: u64, raw: String },
    /// The ranking omitted, duplicated, or invented actions.
    NotAPermutation { expected: u64, actual: u64 },
    Undecodable { detail: String },
}

/// Why the guard could not produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradationKindV1 {
    RetriesExhausted { attempts: u32, last_error: String },
    Rejected { detail: String },
    Unsupported { capability: &'static str },
    Panicked,
    Malformed(MalformedResultV1),
}

/// Outcome of one guarded call plus how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedCall<T> {
    pub result: Result<T, DegradationKindV1>,
    pub attempts: u32,
}

impl<T> GuardedCall<T> {
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry/validation wrapper around a borrowed oracle.
pub struct GuardedOracle<'a, S, A, G> {
    inner: &'a dyn ScoringOracle<S, A, G>,
    retry: &'a RetryPolicyV1,
    backoff: &'a dyn Backoff,
}

impl<'a, S, A, G> GuardedOracle<'a, S, A, G> {
    #[must_use]
    pub fn new(
        inner: &'a dyn ScoringOracle<S, A, G>,
        retry: &'a RetryPolicyV1,
        backoff: &'a dyn Backoff,
    ) -> Self {
        Self {
            inner,
            retry,
            backoff,
        }
    }

    #[must_use]
    pub fn oracle_id(&self) -> &str {
        self.inner.oracle_id()
    }

    /// Score `states`, validating length and range. `contexts` holds one
    /// entry per state.
    pub fn evaluate(
        &self,
        states: &[S],
        contexts: &[OracleContext<'_, A>],
        goal: &G,
    ) -> GuardedCall<Vec<Score>> {
        debug_assert_eq!(states.len(), contexts.len());
        self.call(
            || self.inner.evaluate_with_context(states, contexts, goal),
            |raw| validate_scores(&raw, states.len()),
        )
    }

    /// Rank `actions`, validating that the answer is an exact permutation.
    pub fn rank(
        &self,
        state: &S,
        actions: &[A],
        context: &OracleContext<'_, A>,
        goal: &G,
    ) -> GuardedCall<Vec<A>>
    where
        A: Eq + Hash,
    {
        self.call(
            || self.inner.rank_with_context(state, actions, context, goal),
            |ranked| validate_permutation(ranked, actions),
        )
    }

    /// Rank several action lists in one call. The answer must hold one exact
    /// permutation per request, in request order.
    pub fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        goal: &G,
    ) -> GuardedCall<Vec<Vec<A>>>
    where
        A: Eq + Hash,
    {
        self.call(
            || self.inner.rank_batch(requests, goal),
            |rankings| validate_rankings(rankings, requests),
        )
    }

    fn call<R, T>(
        &self,
        invoke: impl Fn() -> Result<R, OracleError>,
        validate: impl FnOnce(R) -> Result<T, MalformedResultV1>,
    ) -> GuardedCall<T> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(&invoke));
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let error = match outcome {
                Err(_) => {
                    return GuardedCall {
                        result: Err(DegradationKindV1::Panicked),
                        attempts,
                    }
                }
                Ok(Ok(_)) if self.exceeded_timeout(elapsed_ms) => {
                    OracleError::Timeout { elapsed_ms }
                }
                Ok(Ok(raw)) => {
                    return GuardedCall {
                        result: validate(raw).map_err(DegradationKindV1::Malformed),
                        attempts,
                    }
                }
                Ok(Err(e)) => e,
            };

            if !error.is_transient() {
                return GuardedCall {
                    result: Err(permanent_degradation(error)),
                    attempts,
                };
            }
            if attempts >= self.retry.max_attempts {
                return GuardedCall {
                    result: Err(DegradationKindV1::RetriesExhausted {
                        attempts,
                        last_error: error.to_string(),
                    }),
                    attempts,
                };
            }
            self.backoff
                .wait(Duration::from_millis(self.retry.backoff_ms(attempts)));
        }
    }

    fn exceeded_timeout(&self, elapsed_ms: u64) -> bool {
        self.retry
            .call_timeout_ms
            .is_some_and(|limit| elapsed_ms > limit)
    }
}

fn permanent_degradation(error: OracleError) -> DegradationKindV1 {
    let rendered = error.to_string();
    match error {
        OracleError::Malformed { detail } => {
            DegradationKindV1::Malformed(MalformedResultV1::Undecodable { detail })
        }
        OracleError::Rejected { detail } => DegradationKindV1::Rejected { detail },
        OracleError::Unsupported { capability } => DegradationKindV1::Unsupported { capability },
        // Transient kinds are retried before reaching here.
        OracleError::Timeout { .. } | OracleError::Transient { .. } => {
            DegradationKindV1::RetriesExhausted {
                attempts: 0,
                last_error: rendered,
            }
        }
    }
}

fn validate_scores(raw: &[f64], expected: usize) -> Result<Vec<Score>, MalformedResultV1> {
    if raw.len() != expected {
        return Err(MalformedResultV1::WrongLength {
            expected: expected as u64,
            actual: raw.len() as u64,
        });
    }
    raw.iter()
        .enumerate()
        .map(|(i, &value)| {
            Score::new(value).ok_or_else(|| MalformedResultV1::ScoreOutOfRange {
                index: i as u64,
                raw: format!("{value:?}"),
            })
        })
        .collect()
}

fn validate_permutation<A: Eq + Hash>(
    ranked: Vec<A>,
    actions: &[A],
) -> Result<Vec<A>, MalformedResultV1> {
    let not_permutation = || MalformedResultV1::NotAPermutation {
        expected: actions.len() as u64,
        actual: ranked.len() as u64,
    };
    if ranked.len() != actions.len() {
        return Err(not_permutation());
    }
    let mut remaining: HashMap<&A, usize> = HashMap::new();
    for action in actions {
        *remaining.entry(action).or_insert(0) += 1;
    }
    for action in &ranked {
        match remaining.get_mut(action) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return Err(not_permutation()),
        }
    }
    Ok(ranked)
}

fn validate_rankings<S, A: Eq + Hash>(
    rankings: Vec<Vec<A>>,
    requests: &[RankRequest<'_, S, A>],
) -> Result<Vec<Vec<A>>, MalformedResultV1> {
    if rankings.len() != requests.len() {
        return Err(MalformedResultV1::WrongLength {
            expected: requests.len() as u64,
            actual: rankings.len() as u64,
        });
    }
    rankings
        .into_iter()
        .zip(requests)
        .map(|(ranked, request)| validate_permutation(ranked, request.actions))
        .collect()
}
