use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use catena_types::{ObjId, StoreKey};

/// How a key's change is merged when source and target touched it
/// concurrently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeType {
    /// Apply the source change if the target did not diverge; a divergent
    /// concurrent change is a conflict.
    #[default]
    Normal,
    /// Always take the source side, even over a divergent target change.
    Force,
    /// Never apply the source change; the target side is kept. Not a
    /// conflict.
    Drop,
}

/// Per-key outcome of one merge/transplant/squash operation.
///
/// Derived data: details never outlive the operation that produced them
/// and are never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDetails {
    /// The merge type resolved for this key (override or the operation
    /// default).
    pub merge_type: MergeType,
    /// Whether the source change was applied to the result.
    pub applied: bool,
    /// Whether the key diverged concurrently without an override.
    pub conflict: bool,
}

/// The result of a merge/transplant/squash operation.
#[derive(Clone, Debug)]
pub struct MergeResult {
    /// The resulting head: the new commit's id on success, or the
    /// unchanged target head for dry runs, no-ops, and conflicts.
    pub new_head: ObjId,
    /// Whether this was a dry run (nothing persisted, no reference
    /// advance).
    pub dry_run: bool,
    /// Per-key details; keys unique, ordered ascending (= diff order).
    pub details: BTreeMap<StoreKey, KeyDetails>,
}

impl MergeResult {
    /// Returns `true` if any key conflicted.
    pub fn has_conflicts(&self) -> bool {
        self.details.values().any(|d| d.conflict)
    }

    /// The keys that conflicted, in key order.
    pub fn conflicting_keys(&self) -> impl Iterator<Item = &StoreKey> {
        self.details
            .iter()
            .filter(|(_, d)| d.conflict)
            .map(|(k, _)| k)
    }
}

/// Terminal outcome of a merge/transplant/squash operation.
///
/// `Conflict` is data, not an error: it carries the full per-key report
/// and guarantees no reference advance happened.
#[derive(Clone, Debug)]
pub enum MergeOutcome {
    /// The operation succeeded (possibly as a no-op or dry run).
    Success(MergeResult),
    /// At least one key could not be merged under the given policy.
    Conflict(MergeResult),
}

impl MergeOutcome {
    /// The result carried by either outcome.
    pub fn result(&self) -> &MergeResult {
        match self {
            Self::Success(result) | Self::Conflict(result) => result,
        }
    }

    /// Returns `true` for the success outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
