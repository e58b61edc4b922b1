//! Index materialization and content-defined segment chunking.
//!
//! A commit's full key -> value state is stored as an index root plus a
//! list of segment objects. Segment boundaries are decided by a hash of
//! the boundary key (with a hard cap on segment length), so an edit
//! re-chunks only the neighborhood of the changed keys and unchanged
//! segments keep their content hash, collapsing in the object store.

use std::collections::BTreeMap;

use catena_store::{
    IndexEntry, IndexObj, IndexSegmentObj, ObjectStore, StoreResult, StoredObject,
};
use catena_types::{ContentHasher, ObjId, StoreKey};

use crate::error::{CommitError, CommitResult};

/// Hard cap on entries per segment, for keys that rarely hash to a
/// boundary.
const MAX_SEGMENT_ENTRIES: usize = 64;

/// A key closes its segment when the low bits of its boundary hash are
/// zero; with a 3-bit mask segments average 8 entries.
const BOUNDARY_MASK: u8 = 0x07;

const BOUNDARY_HASHER: ContentHasher = ContentHasher::new("catena-boundary-v1");

fn is_boundary(key: &StoreKey) -> bool {
    BOUNDARY_HASHER.hash(key.canonical().as_bytes()).as_bytes()[0] & BOUNDARY_MASK == 0
}

/// A materialized index ready to persist: the root id plus every object
/// (segments, then root) that must be stored together with the commit.
pub(crate) struct BuiltIndex {
    pub root_id: ObjId,
    pub objects: Vec<StoredObject>,
}

/// Chunk a full state map into segments and an index root.
pub(crate) fn build_index(state: &BTreeMap<StoreKey, ObjId>) -> StoreResult<BuiltIndex> {
    fn flush(
        pending: &mut Vec<IndexEntry>,
        objects: &mut Vec<StoredObject>,
        segment_ids: &mut Vec<ObjId>,
    ) -> StoreResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let segment = IndexSegmentObj::new(std::mem::take(pending));
        let stored = segment.to_stored_object()?;
        segment_ids.push(stored.compute_id());
        objects.push(stored);
        Ok(())
    }

    let mut objects = Vec::new();
    let mut segment_ids = Vec::new();
    let mut pending: Vec<IndexEntry> = Vec::new();

    for (key, value) in state {
        pending.push(IndexEntry {
            key: key.clone(),
            value: *value,
        });
        if pending.len() >= MAX_SEGMENT_ENTRIES || is_boundary(key) {
            flush(&mut pending, &mut objects, &mut segment_ids)?;
        }
    }
    flush(&mut pending, &mut objects, &mut segment_ids)?;

    let root = IndexObj::new(segment_ids);
    let stored_root = root.to_stored_object()?;
    let root_id = stored_root.compute_id();
    objects.push(stored_root);

    Ok(BuiltIndex { root_id, objects })
}

/// Load and materialize the full state map behind an index root.
pub(crate) fn load_index(
    store: &dyn ObjectStore,
    index_id: &ObjId,
) -> CommitResult<BTreeMap<StoreKey, ObjId>> {
    let root_obj = store
        .get(index_id)?
        .ok_or(CommitError::IndexNotFound(*index_id))?;
    let root = IndexObj::from_stored_object(&root_obj)?;

    let mut state = BTreeMap::new();
    for segment_id in &root.segments {
        let segment_obj = store
            .get(segment_id)?
            .ok_or(CommitError::IndexNotFound(*segment_id))?;
        let segment = IndexSegmentObj::from_stored_object(&segment_obj)?;
        for entry in segment.entries {
            state.insert(entry.key, entry.value);
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_store::InMemoryObjectStore;

    fn state_of(n: usize) -> BTreeMap<StoreKey, ObjId> {
        (0..n)
            .map(|i| {
                (
                    StoreKey::from_path(&format!("ns/table-{i:04}")).unwrap(),
                    ContentHasher::VALUE.hash(format!("value-{i}").as_bytes()),
                )
            })
            .collect()
    }

    fn persist(store: &InMemoryObjectStore, built: &BuiltIndex) {
        for obj in &built.objects {
            store.put(obj).unwrap();
        }
    }

    #[test]
    fn roundtrip_through_store() {
        let store = InMemoryObjectStore::new();
        let state = state_of(100);
        let built = build_index(&state).unwrap();
        persist(&store, &built);

        let loaded = load_index(&store, &built.root_id).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn empty_state_builds_empty_index() {
        let store = InMemoryObjectStore::new();
        let built = build_index(&BTreeMap::new()).unwrap();
        persist(&store, &built);

        let loaded = load_index(&store, &built.root_id).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn chunking_is_deterministic() {
        let state = state_of(100);
        let a = build_index(&state).unwrap();
        let b = build_index(&state).unwrap();
        assert_eq!(a.root_id, b.root_id);
    }

    #[test]
    fn segments_respect_hard_cap() {
        let state = state_of(1000);
        let built = build_index(&state).unwrap();
        // Last object is the root; all others are segments.
        for obj in &built.objects[..built.objects.len() - 1] {
            let segment = IndexSegmentObj::from_stored_object(obj).unwrap();
            assert!(segment.entries.len() <= MAX_SEGMENT_ENTRIES);
        }
    }

    #[test]
    fn single_key_edit_shares_most_segments() {
        let store = InMemoryObjectStore::new();
        let mut state = state_of(200);
        let first = build_index(&state).unwrap();
        persist(&store, &first);
        let objects_after_first = store.len();

        // Change one value; re-chunk and persist. Only the touched
        // segment and the root should be new.
        let key = StoreKey::from_path("ns/table-0100").unwrap();
        state.insert(key, ContentHasher::VALUE.hash(b"changed"));
        let second = build_index(&state).unwrap();
        persist(&store, &second);

        let new_objects = store.len() - objects_after_first;
        assert!(
            new_objects < first.objects.len() / 2,
            "expected structural sharing, got {new_objects} new objects \
             out of {} segments",
            first.objects.len()
        );
    }

    #[test]
    fn missing_segment_is_reported() {
        let store = InMemoryObjectStore::new();
        let built = build_index(&state_of(50)).unwrap();
        // Persist only the root, not the segments.
        store.put(built.objects.last().unwrap()).unwrap();

        let err = load_index(&store, &built.root_id).unwrap_err();
        assert!(matches!(err, CommitError::IndexNotFound(_)));
    }
}
