//! Content-addressed object storage for Catena.
//!
//! This crate defines the unit of storage ([`StoredObject`]), the typed
//! objects layered on top of it (commits, index roots, index segments,
//! value payloads), the [`ObjectStore`] backend contract, and an in-memory
//! implementation for tests and embedding.
//!
//! The store is append-only in practice: objects are immutable and keyed
//! by content hash, so duplicate writes of equal content collapse and
//! concurrent unsynchronized writers are safe.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    CommitObj, IndexEntry, IndexObj, IndexSegmentObj, ObjectKind, StoredObject, ValueObj,
};
pub use traits::{ObjectStore, PutOutcome};
