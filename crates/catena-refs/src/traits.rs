//! The [`RefStore`] trait defining the reference storage interface.
//!
//! Any backend (in-memory, database, cloud KV) implements this trait to
//! provide named reference management for Catena. The head of a reference
//! is the only mutable shared cell in the system, and it is guarded
//! exclusively by compare-and-swap.

use catena_types::ObjId;

use crate::error::RefResult;
use crate::types::{CasOutcome, Reference};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make
/// `compare_and_set` atomic with respect to concurrent calls on the same
/// name: of N writers racing from the same expected head, exactly one
/// succeeds and the rest observe a conflict carrying the winning head.
pub trait RefStore: Send + Sync {
    /// Read a reference by name.
    ///
    /// Returns `Ok(None)` if the reference does not exist.
    fn read_ref(&self, name: &str) -> RefResult<Option<Reference>>;

    /// Create a reference pointing at `head`.
    ///
    /// Fails with `AlreadyExists` if the name is taken. Creation is not a
    /// blind overwrite either.
    fn create_ref(&self, name: &str, head: ObjId) -> RefResult<Reference>;

    /// Atomically set the reference to `new` iff it currently points at
    /// `expected`.
    ///
    /// This is the sole update path for references. On mismatch the
    /// returned [`CasOutcome::Conflict`] carries the observed head.
    fn compare_and_set(
        &self,
        name: &str,
        expected: &ObjId,
        new: &ObjId,
    ) -> RefResult<CasOutcome>;

    /// Delete the reference iff it currently points at `expected`.
    ///
    /// Deletion races with concurrent updates the same way `compare_and_set`
    /// does.
    fn delete_ref(&self, name: &str, expected: &ObjId) -> RefResult<CasOutcome>;

    /// List all references whose name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list everything.
    fn list_refs(&self, prefix: &str) -> RefResult<Vec<Reference>>;
}
