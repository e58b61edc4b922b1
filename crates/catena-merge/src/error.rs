use catena_commit::CommitError;
use catena_refs::RefError;
use catena_types::ObjId;

/// Errors from merge, transplant, and squash operations.
///
/// Per-key conflicts are NOT errors; they are reported through
/// [`MergeOutcome::Conflict`]. These variants are hard failures: structural
/// problems are surfaced immediately and never retried, and
/// `RetryExhausted` is the transient failure left when the CAS loop runs
/// out of attempts.
///
/// [`MergeOutcome::Conflict`]: crate::types::MergeOutcome::Conflict
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The named target reference does not exist.
    #[error("reference not found: {name}")]
    ReferenceNotFound { name: String },

    /// Source and target histories share no common ancestor.
    #[error("no common ancestor between target {target} and source {source_id}")]
    UnrelatedHistories { target: ObjId, source_id: ObjId },

    /// The caller-supplied expected head no longer matches the reference.
    /// Distinct from internal CAS races, which are retried transparently.
    #[error("expected head {expected} does not match current head {actual}")]
    StaleExpectedHead { expected: ObjId, actual: ObjId },

    /// A transplant source sequence is not a contiguous parent chain.
    #[error("transplant source is not a contiguous chain at commit {commit}")]
    NonContiguousSource { commit: ObjId },

    /// The CAS retry budget was exhausted under sustained contention.
    /// The caller may retry the entire operation.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// Error from commit logic (missing commits, index objects, storage).
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Error from the reference store.
    #[error(transparent)]
    Ref(#[from] RefError),
}
