use catena_store::StoreError;
use catena_types::ObjId;

/// Errors from commit logic operations.
///
/// These are structural errors: they indicate missing or inconsistent
/// data, not contention, and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// A commit referenced by id could not be located.
    #[error("commit not found: {0}")]
    CommitNotFound(ObjId),

    /// An index or segment object referenced by a commit is missing.
    #[error("index object not found: {0}")]
    IndexNotFound(ObjId),

    /// A commit references a parent that is not present in the object
    /// store. Parents must be persisted before their children.
    #[error("commit {commit} references missing parent {parent}")]
    MissingParent { commit: ObjId, parent: ObjId },

    /// The primary-parent chain revisited a commit id.
    #[error("commit chain cycle detected at {0}")]
    CycleDetected(ObjId),

    /// Error from the underlying object store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for commit logic operations.
pub type CommitResult<T> = Result<T, CommitError>;
