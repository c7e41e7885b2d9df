//! Beam policy: the engine's configuration surface.

use beamline_kernel::proof::canon::canonical_json_bytes;
use beamline_kernel::proof::hash::{canonical_hash, ContentHash};
use beamline_kernel::proof::hash_domain::HashDomain;

use crate::error::SearchError;

/// What happens to candidates whose oracle call failed or returned garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicyV1 {
    /// Score every affected candidate `0.0`. They stay eligible, equally and
    /// minimally promising.
    NeutralScore,
    /// Drop the affected candidates from this round.
    Exclude,
}

impl FallbackPolicyV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NeutralScore => "neutral_score",
            Self::Exclude => "exclude",
        }
    }
}

/// Retry, backoff, and timeout settings for oracle calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicyV1 {
    /// Total attempts per call, including the first. At least 1.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    /// Backoff growth factor per retry. At least 1.
    pub backoff_multiplier: u32,
    pub max_backoff_ms: u64,
    /// Calls that take longer than this are treated as timed out.
    pub call_timeout_ms: Option<u64>,
}

impl RetryPolicyV1 {
    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    #[must_use]
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

impl Default for RetryPolicyV1 {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            backoff_multiplier: 2,
            max_backoff_ms: 1_000,
            call_timeout_ms: None,
        }
    }
}

/// Beam search configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamPolicyV1 {
    /// Maximum nodes carried from one round to the next.
    pub beam_width: usize,
    /// Maximum number of expansion rounds.
    pub max_depth: u32,
    /// Capacity of the recovery pool. 0 disables recovery.
    pub backup_pool_size: usize,
    /// Cap on actions applied per expanded node (after ranking).
    pub per_node_expansion_limit: Option<usize>,
    /// Reorder each node's actions with `rank_actions` before applying.
    pub use_ranking: bool,
    /// Rank every beam node's actions in one `rank_batch` call per round
    /// instead of one call per node. Requires `use_ranking`.
    pub batch_ranking: bool,
    /// Score candidates with `evaluate_batch`. When off, candidates stay
    /// unscored and keep admission order.
    pub use_evaluation: bool,
    /// Split each round's evaluation into chunks of at most this many states.
    pub max_batch_size: Option<usize>,
    /// Expand beam nodes on the rayon pool.
    pub parallel_expansion: bool,
    /// Most evaluation records passed to the oracle per state.
    pub history_limit: usize,
    pub fallback: FallbackPolicyV1,
    pub retry: RetryPolicyV1,
}

impl BeamPolicyV1 {
    /// Default pool size for a given width: five beams' worth of discards.
    #[must_use]
    pub fn default_backup_pool_size(beam_width: usize) -> usize {
        beam_width.saturating_mul(5)
    }

    /// Policy with the given width and the matching default pool size.
    #[must_use]
    pub fn with_beam_width(beam_width: usize) -> Self {
        Self {
            beam_width,
            backup_pool_size: Self::default_backup_pool_size(beam_width),
            ..Self::default()
        }
    }

    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |detail: &str| {
            Err(SearchError::InvalidPolicy {
                detail: detail.into(),
            })
        };
        if self.beam_width == 0 {
            return invalid("beam_width must be positive");
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be positive");
        }
        if self.per_node_expansion_limit == Some(0) {
            return invalid("per_node_expansion_limit must be positive when set");
        }
        if self.max_batch_size == Some(0) {
            return invalid("max_batch_size must be positive when set");
        }
        if self.batch_ranking && !self.use_ranking {
            return invalid("batch_ranking requires use_ranking");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.backoff_multiplier == 0 {
            return invalid("retry.backoff_multiplier must be at least 1");
        }
        if self.retry.call_timeout_ms == Some(0) {
            return invalid("retry.call_timeout_ms must be positive when set");
        }
        Ok(())
    }

    /// Canonical JSON echo of this policy.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "backup_pool_size": self.backup_pool_size as u64,
            "batch_ranking": self.batch_ranking,
            "beam_width": self.beam_width as u64,
            "fallback": self.fallback.as_str(),
            "history_limit": self.history_limit as u64,
            "max_batch_size": self.max_batch_size.map(|n| n as u64),
            "max_depth": self.max_depth,
            "parallel_expansion": self.parallel_expansion,
            "per_node_expansion_limit": self.per_node_expansion_limit.map(|n| n as u64),
            "retry": {
                "backoff_multiplier": self.retry.backoff_multiplier,
                "call_timeout_ms": self.retry.call_timeout_ms,
                "initial_backoff_ms": self.retry.initial_backoff_ms,
                "max_attempts": self.retry.max_attempts,
                "max_backoff_ms": self.retry.max_backoff_ms,
            },
            "schema_version": "beam_policy.v1",
            "use_evaluation": self.use_evaluation,
            "use_ranking": self.use_ranking,
        })
    }

    /// Canonical bytes of [`Self::to_json_value`].
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::StateEncoding`] if canonicalization fails.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, SearchError> {
        canonical_json_bytes(&self.to_json_value()).map_err(|e| SearchError::StateEncoding {
            detail: e.to_string(),
        })
    }

    /// Content digest of the policy echo.
    ///
    /// # Errors
    ///
    /// Same as [`Self::to_canonical_json_bytes`].
    pub fn digest(&self) -> Result<ContentHash, SearchError> {
        let bytes = self.to_canonical_json_bytes()?;
        Ok(canonical_hash(HashDomain::BeamPolicy, &bytes))
    }
}

impl Default for BeamPolicyV1 {
    fn default() -> Self {
        Self {
            beam_width: 3,
            max_depth: 50,
            backup_pool_size: Self::default_backup_pool_size(3),
            per_node_expansion_limit: None,
            use_ranking: false,
            batch_ranking: false,
            use_evaluation: true,
            max_batch_size: None,
            parallel_expansion: false,
            history_limit: 10,
            fallback: FallbackPolicyV1::NeutralScore,
            retry: RetryPolicyV1::default(),
        }
    }
}
