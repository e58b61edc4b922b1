use serde::{Deserialize, Serialize};

use catena_types::ObjId;

/// A named, mutable pointer to a commit.
///
/// The head is updated exclusively via [`RefStore::compare_and_set`];
/// a persisted reference always names a commit that exists in the object
/// store (writers persist the commit before advancing the reference).
///
/// [`RefStore::compare_and_set`]: crate::traits::RefStore::compare_and_set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The reference name (e.g. "main", "feature/ingest").
    pub name: String,
    /// Id of the commit this reference currently points to.
    pub head: ObjId,
}

impl Reference {
    /// Create a reference value.
    pub fn new(name: impl Into<String>, head: ObjId) -> Self {
        Self {
            name: name.into(),
            head,
        }
    }
}

/// Outcome of a compare-and-swap on a reference.
///
/// `Conflict` carries the observed current head so the caller can decide
/// whether to retry the whole read-compute-CAS cycle or abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasOutcome {
    /// The swap was applied: the reference now points at the new head.
    Committed,
    /// The reference did not match the expected head; nothing was changed.
    Conflict {
        /// The head that was actually observed.
        actual: ObjId,
    },
}

impl CasOutcome {
    /// Returns `true` if the swap was applied.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}
