use catena_store::CommitObj;
use catena_types::ObjId;

/// The source commits of one merge/transplant/squash, plus their common
/// parent.
///
/// Transient working value: built once per operation (per retry attempt)
/// and consumed by the engine, never persisted.
#[derive(Clone, Debug)]
pub struct SourceCommitsAndParent {
    /// Source commits, oldest to newest.
    pub commits: Vec<CommitObj>,
    /// Parent of the oldest source commit; `None` when the chain starts
    /// at a root commit.
    pub parent: Option<ObjId>,
}

impl SourceCommitsAndParent {
    /// The most recent source commit, if any.
    pub fn most_recent(&self) -> Option<&CommitObj> {
        self.commits.last()
    }

    /// Returns `true` if there is nothing to merge.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Number of source commits.
    pub fn len(&self) -> usize {
        self.commits.len()
    }
}
