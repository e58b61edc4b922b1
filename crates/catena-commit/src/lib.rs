//! Commit logic for Catena.
//!
//! This crate builds, stores, deduplicates, and walks commit objects on
//! top of the [`catena_store::ObjectStore`] contract:
//!
//! - [`CreateCommit`] — mutable builder accumulating parent, headers, and
//!   index operations, finalized into an immutable commit
//! - [`CommitLogic`] — store/fetch commits, materialize index state,
//!   compute paged key-ordered diffs, walk the primary-parent chain, and
//!   find merge bases
//! - [`retry`] — the bounded CAS retry controller

pub mod create;
pub mod diff;
pub mod error;
pub mod logic;
pub mod retry;

mod index;

pub use create::{CreateCommit, IndexOp};
pub use diff::{DiffEntry, DiffIter, DiffKind, DiffPage, DiffToken};
pub use error::{CommitError, CommitResult};
pub use logic::{BuiltCommit, CommitChain, CommitLogic};
pub use retry::{with_retry, Attempt, RetryConfig, RetryError};
