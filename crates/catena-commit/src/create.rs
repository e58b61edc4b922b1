use catena_types::{CommitHeaders, ObjId, StoreKey};

/// One pending mutation of the content index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexOp {
    /// Set `key` to point at `value` (add or modify).
    Put { key: StoreKey, value: ObjId },
    /// Remove `key` from the index.
    Remove { key: StoreKey },
}

impl IndexOp {
    /// The key this operation touches.
    pub fn key(&self) -> &StoreKey {
        match self {
            Self::Put { key, .. } => key,
            Self::Remove { key } => key,
        }
    }
}

/// Mutable builder for a new commit.
///
/// Accumulates the parent, secondary parents, headers, and pending index
/// mutations, and is finalized into an immutable commit by
/// [`CommitLogic::build_commit`]. When several operations touch the same
/// key, the last one wins.
///
/// [`CommitLogic::build_commit`]: crate::logic::CommitLogic::build_commit
#[derive(Clone, Debug)]
pub struct CreateCommit {
    parent: Option<ObjId>,
    secondary_parents: Vec<ObjId>,
    headers: CommitHeaders,
    ops: Vec<IndexOp>,
}

impl CreateCommit {
    /// Start a commit on top of `parent` (`None` for a root commit).
    pub fn new(parent: Option<ObjId>, headers: CommitHeaders) -> Self {
        Self {
            parent,
            secondary_parents: Vec::new(),
            headers,
            ops: Vec::new(),
        }
    }

    /// Record a secondary parent (the "other side" of a merge).
    pub fn secondary_parent(&mut self, id: ObjId) {
        self.secondary_parents.push(id);
    }

    /// Queue setting `key` to `value`.
    pub fn put(&mut self, key: StoreKey, value: ObjId) {
        self.ops.push(IndexOp::Put { key, value });
    }

    /// Queue removing `key`.
    pub fn remove(&mut self, key: StoreKey) {
        self.ops.push(IndexOp::Remove { key });
    }

    /// The primary parent this commit will be built on.
    pub fn parent(&self) -> Option<&ObjId> {
        self.parent.as_ref()
    }

    /// The secondary parents recorded so far.
    pub fn secondary_parents(&self) -> &[ObjId] {
        &self.secondary_parents
    }

    /// The commit headers.
    pub fn headers(&self) -> &CommitHeaders {
        &self.headers
    }

    /// The pending index operations, in insertion order.
    pub fn ops(&self) -> &[IndexOp] {
        &self.ops
    }

    pub(crate) fn into_parts(self) -> (Option<ObjId>, Vec<ObjId>, CommitHeaders, Vec<IndexOp>) {
        (self.parent, self.secondary_parents, self.headers, self.ops)
    }
}
