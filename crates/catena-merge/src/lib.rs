//! Merge engine for Catena.
//!
//! Implements the three history-rewriting operations over the commit and
//! reference layers:
//!
//! - **merge** — one merge commit layering the source branch's changes
//!   onto the target head, recording the source head as a secondary parent
//! - **transplant** — a caller-named sequence of commits re-applied one by
//!   one on top of the target head, preserving per-commit boundaries
//! - **squash** — the source range collapsed into a single commit, with an
//!   optional merge-from id recorded as a secondary parent for
//!   reachability
//!
//! All three share the same shape: resolve the target head, compute the
//! source commits and their parent, classify every touched key against the
//! caller's merge-type policy, build and persist candidate commits, and
//! CAS-advance the reference under the bounded retry loop. Conflicts are a
//! normal terminal outcome carried in the result, not an error.

pub mod engine;
pub mod error;
pub mod rewriter;
pub mod source;
pub mod types;

pub use engine::{MergeParams, Merger, SquashParams, TransplantParams};
pub use error::MergeError;
pub use rewriter::{KeepOriginal, MetadataRewriter};
pub use source::SourceCommitsAndParent;
pub use types::{KeyDetails, MergeOutcome, MergeResult, MergeType};
