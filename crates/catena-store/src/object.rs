use serde::{Deserialize, Serialize};

use catena_types::{CommitHeaders, ContentHasher, ObjId, StoreKey};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// An immutable commit node.
    Commit,
    /// An index root: the list of segment ids making up a commit's state.
    Index,
    /// An index segment: a sorted run of key -> value-id entries.
    Segment,
    /// Raw content payload (a catalog entry body).
    Value,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Index => write!(f, "index"),
            Self::Segment => write!(f, "segment"),
            Self::Value => write!(f, "value"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. The store treats the data as an
/// opaque byte payload keyed by its content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The serialized bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// Uses the domain-separated hasher matching the object kind, so equal
    /// bytes of different kinds never collide.
    pub fn compute_id(&self) -> ObjId {
        let hasher = match self.kind {
            ObjectKind::Commit => &ContentHasher::COMMIT,
            ObjectKind::Index => &ContentHasher::INDEX,
            ObjectKind::Segment => &ContentHasher::SEGMENT,
            ObjectKind::Value => &ContentHasher::VALUE,
        };
        hasher.hash(&self.data)
    }
}

// ---------------------------------------------------------------------------
// CommitObj
// ---------------------------------------------------------------------------

/// An immutable commit node.
///
/// `id` is derived from the serialized content and is never serialized
/// itself; decoding recomputes it. Once stored, a commit is never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitObj {
    /// Content-derived id of this commit.
    #[serde(skip)]
    pub id: ObjId,
    /// Primary predecessor. `None` only for a root commit.
    pub parent: Option<ObjId>,
    /// Ordered "other side" parents of merges. Recorded for reachability
    /// but not part of the primary ancestry walk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_parents: Vec<ObjId>,
    /// Commit metadata.
    pub headers: CommitHeaders,
    /// Id of the [`IndexObj`] describing the full key -> value state at
    /// this commit.
    pub index: ObjId,
}

impl CommitObj {
    /// Build a commit and derive its content id.
    pub fn new(
        parent: Option<ObjId>,
        secondary_parents: Vec<ObjId>,
        headers: CommitHeaders,
        index: ObjId,
    ) -> StoreResult<Self> {
        let mut commit = Self {
            id: ObjId::null(),
            parent,
            secondary_parents,
            headers,
            index,
        };
        commit.id = commit.to_stored_object()?.compute_id();
        Ok(commit)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    /// Decode from a `StoredObject`, recomputing the content id.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Commit {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected commit, got {}", obj.kind),
            });
        }
        let mut commit: Self = serde_json::from_slice(&obj.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        commit.id = obj.compute_id();
        Ok(commit)
    }

    /// Returns `true` if this commit has no primary parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ---------------------------------------------------------------------------
// Index objects
// ---------------------------------------------------------------------------

/// One key -> value-id entry in an index segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The content key.
    pub key: StoreKey,
    /// Id of the value object the key maps to.
    pub value: ObjId,
}

/// A sorted run of index entries.
///
/// Segments are the unit of structural sharing: two commits whose state
/// agrees over a segment's key range store that segment once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSegmentObj {
    /// Entries, sorted by key.
    pub entries: Vec<IndexEntry>,
}

impl IndexSegmentObj {
    /// Create a segment. Entries are sorted by key for deterministic
    /// hashing.
    pub fn new(mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self { entries }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Segment, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Segment {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected segment, got {}", obj.kind),
            });
        }
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// An index root: the ordered list of segment ids making up the full
/// key -> value state of one commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexObj {
    /// Segment ids, ordered by their key ranges.
    pub segments: Vec<ObjId>,
}

impl IndexObj {
    /// Create an index root over the given segments.
    pub fn new(segments: Vec<ObjId>) -> Self {
        Self { segments }
    }

    /// An index with no entries.
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Index, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Index {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected index, got {}", obj.kind),
            });
        }
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ValueObj
// ---------------------------------------------------------------------------

/// Raw content payload: the body of one catalog entry.
///
/// The engine treats values as opaque; only their ids participate in
/// diffs and merges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueObj {
    pub payload: Vec<u8>,
}

impl ValueObj {
    /// Create a value from raw bytes.
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Value, self.payload.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Value {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected value, got {}", obj.kind),
            });
        }
        Ok(Self {
            payload: obj.data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> CommitHeaders {
        CommitHeaders::new("alice", "initial", 1_700_000_000_000_000)
    }

    #[test]
    fn value_roundtrip() {
        let value = ValueObj::new(b"table schema".to_vec());
        let stored = value.to_stored_object();
        let decoded = ValueObj::from_stored_object(&stored).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn value_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Index, b"not an index".to_vec());
        let err = ValueObj::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn commit_id_is_content_derived() {
        let index = ContentHasher::INDEX.hash(b"idx");
        let c1 = CommitObj::new(None, Vec::new(), headers(), index).unwrap();
        let c2 = CommitObj::new(None, Vec::new(), headers(), index).unwrap();
        assert_eq!(c1.id, c2.id);
        assert!(!c1.id.is_null());
    }

    #[test]
    fn commit_id_changes_with_headers() {
        let index = ContentHasher::INDEX.hash(b"idx");
        let c1 = CommitObj::new(None, Vec::new(), headers(), index).unwrap();
        let other = CommitHeaders::new("bob", "different", 7);
        let c2 = CommitObj::new(None, Vec::new(), other, index).unwrap();
        assert_ne!(c1.id, c2.id);
    }

    #[test]
    fn commit_roundtrip_restores_id() {
        let index = ContentHasher::INDEX.hash(b"idx");
        let parent = ContentHasher::COMMIT.hash(b"parent");
        let commit = CommitObj::new(Some(parent), vec![], headers(), index).unwrap();
        let stored = commit.to_stored_object().unwrap();
        let decoded = CommitObj::from_stored_object(&stored).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.id, commit.id);
    }

    #[test]
    fn commit_records_secondary_parents_in_order() {
        let index = ContentHasher::INDEX.hash(b"idx");
        let s1 = ContentHasher::COMMIT.hash(b"s1");
        let s2 = ContentHasher::COMMIT.hash(b"s2");
        let commit = CommitObj::new(None, vec![s1, s2], headers(), index).unwrap();
        let decoded = CommitObj::from_stored_object(&commit.to_stored_object().unwrap()).unwrap();
        assert_eq!(decoded.secondary_parents, vec![s1, s2]);
    }

    #[test]
    fn root_commit_has_no_parent() {
        let index = ContentHasher::INDEX.hash(b"idx");
        let commit = CommitObj::new(None, Vec::new(), headers(), index).unwrap();
        assert!(commit.is_root());
    }

    #[test]
    fn segment_entries_sorted() {
        let v = ContentHasher::VALUE.hash(b"v");
        let segment = IndexSegmentObj::new(vec![
            IndexEntry {
                key: StoreKey::from_path("b").unwrap(),
                value: v,
            },
            IndexEntry {
                key: StoreKey::from_path("a").unwrap(),
                value: v,
            },
        ]);
        assert_eq!(segment.entries[0].key.canonical(), "a");
        assert_eq!(segment.entries[1].key.canonical(), "b");
    }

    #[test]
    fn segment_roundtrip() {
        let segment = IndexSegmentObj::new(vec![IndexEntry {
            key: StoreKey::from_path("ns/table").unwrap(),
            value: ContentHasher::VALUE.hash(b"v"),
        }]);
        let stored = segment.to_stored_object().unwrap();
        let decoded = IndexSegmentObj::from_stored_object(&stored).unwrap();
        assert_eq!(segment, decoded);
    }

    #[test]
    fn index_roundtrip() {
        let index = IndexObj::new(vec![
            ContentHasher::SEGMENT.hash(b"s1"),
            ContentHasher::SEGMENT.hash(b"s2"),
        ]);
        let stored = index.to_stored_object().unwrap();
        let decoded = IndexObj::from_stored_object(&stored).unwrap();
        assert_eq!(index, decoded);
    }

    #[test]
    fn stored_object_id_deterministic() {
        let obj = StoredObject::new(ObjectKind::Value, b"deterministic".to_vec());
        assert_eq!(obj.compute_id(), obj.compute_id());
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let commit = StoredObject::new(ObjectKind::Commit, data.clone());
        let index = StoredObject::new(ObjectKind::Index, data.clone());
        let value = StoredObject::new(ObjectKind::Value, data);
        assert_ne!(commit.compute_id(), index.compute_id());
        assert_ne!(commit.compute_id(), value.compute_id());
    }

    #[test]
    fn object_kind_display() {
        assert_eq!(format!("{}", ObjectKind::Commit), "commit");
        assert_eq!(format!("{}", ObjectKind::Index), "index");
        assert_eq!(format!("{}", ObjectKind::Segment), "segment");
        assert_eq!(format!("{}", ObjectKind::Value), "value");
    }
}
