use catena_types::ObjId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Outcome of an idempotent `put`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    /// The content-addressed id of the object.
    pub id: ObjId,
    /// `true` if the object was newly written; `false` if content-identical
    /// data was already present and the write collapsed into a no-op.
    pub created: bool,
}

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees
///   this: the same data always produces the same ID.
/// - `put` is idempotent: writing content that already exists is a no-op
///   that reports `created = false` rather than duplicating storage.
/// - Concurrent reads and unsynchronized concurrent writes are safe
///   (duplicate writes of equal content collapse).
/// - Object contents are opaque to the store; interpretation happens in
///   the layers above.
/// - No ordering guarantee exists across unrelated objects, and no
///   transactional grouping beyond what commit logic layers on top.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn get(&self, id: &ObjId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID together with
    /// whether the object was newly created.
    fn put(&self, object: &StoredObject) -> StoreResult<PutOutcome>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjId) -> StoreResult<bool>;

    /// Read multiple objects in a batch.
    ///
    /// Default implementation calls `get()` for each ID. Backends may
    /// override for fewer I/O round-trips.
    fn get_batch(&self, ids: &[ObjId]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }
}
