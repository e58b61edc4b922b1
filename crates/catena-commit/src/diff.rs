//! Key-ordered diffs between two commit states.
//!
//! A diff is produced in `StoreKey`-ascending order, in bounded pages
//! with a continuation token, so consumers can pause between pages
//! (or resume after a failure) without holding anything open.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use catena_types::{ObjId, StoreKey};

/// One row of a diff between two commit states.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// The content key that changed.
    pub key: StoreKey,
    /// The value on the "from" side; `None` for an add.
    pub from: Option<ObjId>,
    /// The value on the "to" side; `None` for a remove.
    pub to: Option<ObjId>,
}

impl DiffEntry {
    /// Classify this entry as add, remove, or modify.
    pub fn kind(&self) -> DiffKind {
        match (&self.from, &self.to) {
            (None, Some(_)) => DiffKind::Add,
            (Some(_), None) => DiffKind::Remove,
            _ => DiffKind::Modify,
        }
    }

    /// Swap the from/to sides (the reverse diff entry).
    pub fn reversed(self) -> Self {
        Self {
            key: self.key,
            from: self.to,
            to: self.from,
        }
    }
}

/// The kind of change a [`DiffEntry`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    Add,
    Remove,
    Modify,
}

/// Opaque continuation token: the diff resumes strictly after this key.
///
/// Serializable so callers can hand it across a request boundary and
/// resume later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffToken(pub(crate) StoreKey);

/// One bounded page of diff entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiffPage {
    /// Entries in `StoreKey`-ascending order.
    pub entries: Vec<DiffEntry>,
    /// Token for the next page; `None` when the diff is exhausted.
    pub next: Option<DiffToken>,
}

/// Compute one page of the diff between two materialized states.
///
/// Entries are keys whose values differ, in ascending key order, starting
/// strictly after `token` (from the beginning when `token` is `None`).
pub(crate) fn diff_page(
    from: &BTreeMap<StoreKey, ObjId>,
    to: &BTreeMap<StoreKey, ObjId>,
    page_size: usize,
    token: Option<&DiffToken>,
) -> DiffPage {
    // A zero page size would never make progress.
    let page_size = page_size.max(1);
    let mut entries = Vec::new();
    let mut next = None;

    for (key, from_value, to_value) in merged_changes(from, to, token) {
        if entries.len() == page_size {
            // One more change exists beyond the page; resume after the
            // last emitted key.
            next = entries.last().map(|e: &DiffEntry| DiffToken(e.key.clone()));
            break;
        }
        entries.push(DiffEntry {
            key,
            from: from_value,
            to: to_value,
        });
    }

    DiffPage { entries, next }
}

/// Iterate all changed keys of both maps past `token`, in ascending order.
fn merged_changes<'a>(
    from: &'a BTreeMap<StoreKey, ObjId>,
    to: &'a BTreeMap<StoreKey, ObjId>,
    token: Option<&DiffToken>,
) -> impl Iterator<Item = (StoreKey, Option<ObjId>, Option<ObjId>)> + 'a {
    let range = match token {
        Some(DiffToken(key)) => (Bound::Excluded(key.clone()), Bound::Unbounded),
        None => (Bound::Unbounded, Bound::Unbounded),
    };

    let mut keys: Vec<&StoreKey> = from
        .range(range.clone())
        .map(|(k, _)| k)
        .chain(to.range(range).map(|(k, _)| k))
        .collect();
    keys.sort();
    keys.dedup();

    keys.into_iter().filter_map(move |key| {
        let from_value = from.get(key).copied();
        let to_value = to.get(key).copied();
        if from_value == to_value {
            None
        } else {
            Some((key.clone(), from_value, to_value))
        }
    })
}

/// Lazy adapter draining a full diff entry-by-entry.
///
/// Produced by [`CommitLogic::diff_iter`]; the underlying states are
/// materialized once and the entries are yielded on demand.
///
/// [`CommitLogic::diff_iter`]: crate::logic::CommitLogic::diff_iter
pub struct DiffIter {
    entries: std::vec::IntoIter<DiffEntry>,
}

impl DiffIter {
    pub(crate) fn new(
        from: &BTreeMap<StoreKey, ObjId>,
        to: &BTreeMap<StoreKey, ObjId>,
    ) -> Self {
        let entries: Vec<DiffEntry> = merged_changes(from, to, None)
            .map(|(key, from_value, to_value)| DiffEntry {
                key,
                from: from_value,
                to: to_value,
            })
            .collect();
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for DiffIter {
    type Item = DiffEntry;

    fn next(&mut self) -> Option<DiffEntry> {
        self.entries.next()
    }
}
