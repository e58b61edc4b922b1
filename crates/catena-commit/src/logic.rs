//! Commit construction, persistence, and history traversal.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use catena_store::{CommitObj, ObjectStore, StoredObject};
use catena_types::{ObjId, StoreKey};

use crate::create::{CreateCommit, IndexOp};
use crate::diff::{diff_page, DiffEntry, DiffIter, DiffPage, DiffToken};
use crate::error::{CommitError, CommitResult};
use crate::index::{build_index, load_index};

/// A finalized commit together with the co-dependent objects (index
/// segments and root) that must be persisted with it.
#[derive(Debug)]
pub struct BuiltCommit {
    /// The immutable commit value.
    pub commit: CommitObj,
    /// Index objects the commit references; persisted by
    /// [`CommitLogic::store_commit`] before the commit itself.
    pub objects: Vec<StoredObject>,
}

/// Builds, stores, deduplicates, and walks commit objects.
///
/// `CommitLogic` depends only on the abstract [`ObjectStore`] contract;
/// any backend satisfying it works underneath.
#[derive(Clone)]
pub struct CommitLogic {
    store: Arc<dyn ObjectStore>,
}

impl CommitLogic {
    /// Create commit logic over an object store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying object store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ---------------------------------------------------------------
    // Fetch / state
    // ---------------------------------------------------------------

    /// Fetch a commit by id.
    pub fn fetch_commit(&self, id: &ObjId) -> CommitResult<CommitObj> {
        let obj = self
            .store
            .get(id)?
            .ok_or(CommitError::CommitNotFound(*id))?;
        Ok(CommitObj::from_stored_object(&obj)?)
    }

    /// Materialize the full key -> value state behind an index root.
    pub fn read_index(&self, index_id: &ObjId) -> CommitResult<BTreeMap<StoreKey, ObjId>> {
        load_index(self.store.as_ref(), index_id)
    }

    /// Materialize the state at a commit; `None` is the empty pre-root
    /// state.
    pub fn state_at(&self, commit_id: Option<&ObjId>) -> CommitResult<BTreeMap<StoreKey, ObjId>> {
        match commit_id {
            None => Ok(BTreeMap::new()),
            Some(id) => {
                let commit = self.fetch_commit(id)?;
                self.read_index(&commit.index)
            }
        }
    }

    // ---------------------------------------------------------------
    // Build / store
    // ---------------------------------------------------------------

    /// Finalize a [`CreateCommit`] into an immutable commit, loading the
    /// parent's state from the store.
    pub fn build_commit(&self, create: CreateCommit) -> CommitResult<BuiltCommit> {
        let parent_state = self.state_at(create.parent())?;
        self.build_commit_on(create, &parent_state)
    }

    /// Finalize a [`CreateCommit`] against an already-materialized parent
    /// state.
    ///
    /// Used when the caller is building a chain of commits whose
    /// intermediate states only exist in memory (e.g. a transplant).
    pub fn build_commit_on(
        &self,
        create: CreateCommit,
        parent_state: &BTreeMap<StoreKey, ObjId>,
    ) -> CommitResult<BuiltCommit> {
        let (parent, secondary_parents, headers, ops) = create.into_parts();

        let mut state = parent_state.clone();
        for op in ops {
            match op {
                IndexOp::Put { key, value } => {
                    state.insert(key, value);
                }
                IndexOp::Remove { key } => {
                    state.remove(&key);
                }
            }
        }

        let index = build_index(&state)?;
        let commit = CommitObj::new(parent, secondary_parents, headers, index.root_id)?;
        Ok(BuiltCommit {
            commit,
            objects: index.objects,
        })
    }

    /// Persist a commit and its co-dependent objects.
    ///
    /// Every parent the commit references (primary and secondary) must
    /// already exist in the store. Returns `false` if a content-identical
    /// commit was already present.
    ///
    /// `false` does NOT mean the commit is already part of any particular
    /// reference's history: an identical commit may have been created
    /// independently by a concurrent, unrelated request. Callers must not
    /// infer a fast-forward from this flag; the new head is always the
    /// candidate commit's own id.
    pub fn store_commit(
        &self,
        commit: &CommitObj,
        additional: &[StoredObject],
    ) -> CommitResult<bool> {
        let parents = commit.parent.iter().chain(commit.secondary_parents.iter());
        for parent in parents {
            if !self.store.exists(parent)? {
                return Err(CommitError::MissingParent {
                    commit: commit.id,
                    parent: *parent,
                });
            }
        }

        for obj in additional {
            self.store.put(obj)?;
        }
        let outcome = self.store.put(&commit.to_stored_object()?)?;
        debug!(
            commit = %commit.id.short_hex(),
            created = outcome.created,
            "stored commit"
        );
        Ok(outcome.created)
    }

    /// Build and persist a commit in one step.
    pub fn commit(&self, create: CreateCommit) -> CommitResult<CommitObj> {
        let built = self.build_commit(create)?;
        self.store_commit(&built.commit, &built.objects)?;
        Ok(built.commit)
    }

    // ---------------------------------------------------------------
    // Diff
    // ---------------------------------------------------------------

    /// Compute one page of the diff between the states at two commits
    /// (`None` = the empty state), in `StoreKey`-ascending order.
    ///
    /// Pass the returned token back in to resume strictly after the last
    /// entry; the sequence is finite and restartable.
    pub fn diff(
        &self,
        from: Option<&ObjId>,
        to: Option<&ObjId>,
        page_size: usize,
        token: Option<&DiffToken>,
    ) -> CommitResult<DiffPage> {
        let from_state = self.state_at(from)?;
        let to_state = self.state_at(to)?;
        Ok(diff_page(&from_state, &to_state, page_size, token))
    }

    /// Lazily iterate the complete diff between the states at two commits.
    pub fn diff_iter(&self, from: Option<&ObjId>, to: Option<&ObjId>) -> CommitResult<DiffIter> {
        let from_state = self.state_at(from)?;
        let to_state = self.state_at(to)?;
        Ok(DiffIter::new(&from_state, &to_state))
    }

    /// Fold diff entries into a commit builder, preserving
    /// add/remove/modify semantics per entry.
    pub fn diff_to_create_commit<I>(&self, entries: I, create: &mut CreateCommit)
    where
        I: IntoIterator<Item = DiffEntry>,
    {
        for entry in entries {
            match entry.to {
                Some(value) => create.put(entry.key, value),
                None => create.remove(entry.key),
            }
        }
    }

    // ---------------------------------------------------------------
    // History walks
    // ---------------------------------------------------------------

    /// Walk the commit chain from `head`, newest to oldest, following
    /// primary parents only. Secondary parents are not traversed.
    pub fn commit_chain(&self, head: ObjId) -> CommitChain<'_> {
        CommitChain {
            logic: self,
            next: Some(head),
            seen: HashSet::new(),
        }
    }

    /// Find the nearest common ancestor of two commits over their
    /// primary-parent chains.
    ///
    /// Returns `Ok(None)` when the histories are unrelated.
    pub fn common_ancestor(&self, a: &ObjId, b: &ObjId) -> CommitResult<Option<ObjId>> {
        let mut ancestors_of_a = HashSet::new();
        for commit in self.commit_chain(*a) {
            ancestors_of_a.insert(commit?.id);
        }
        for commit in self.commit_chain(*b) {
            let id = commit?.id;
            if ancestors_of_a.contains(&id) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for CommitLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLogic").finish_non_exhaustive()
    }
}

/// Lazy newest-to-oldest walk over a primary-parent chain.
///
/// Yields an error (and then stops) if a commit in the chain is missing
/// or if an id repeats.
pub struct CommitChain<'a> {
    logic: &'a CommitLogic,
    next: Option<ObjId>,
    seen: HashSet<ObjId>,
}

impl Iterator for CommitChain<'_> {
    type Item = CommitResult<CommitObj>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return Some(Err(CommitError::CycleDetected(id)));
        }
        match self.logic.fetch_commit(&id) {
            Ok(commit) => {
                self.next = commit.parent;
                Some(Ok(commit))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_store::InMemoryObjectStore;
    use catena_types::{CommitHeaders, ContentHasher};

    fn logic() -> CommitLogic {
        CommitLogic::new(Arc::new(InMemoryObjectStore::new()))
    }

    fn key(path: &str) -> StoreKey {
        StoreKey::from_path(path).unwrap()
    }

    fn value(content: &str) -> ObjId {
        ContentHasher::VALUE.hash(content.as_bytes())
    }

    fn headers(message: &str) -> CommitHeaders {
        CommitHeaders::new("tester", message, 1_000)
    }

    /// Commit `pairs` on top of `parent` and return the new commit.
    fn commit_pairs(
        logic: &CommitLogic,
        parent: Option<ObjId>,
        message: &str,
        pairs: &[(&str, &str)],
    ) -> CommitObj {
        let mut create = CreateCommit::new(parent, headers(message));
        for (k, v) in pairs {
            create.put(key(k), value(v));
        }
        logic.commit(create).unwrap()
    }

    // ---------------------------------------------------------------
    // Build / store
    // ---------------------------------------------------------------

    #[test]
    fn build_and_store_root_commit() {
        let logic = logic();
        let root = commit_pairs(&logic, None, "root", &[("ns/t1", "v1")]);
        assert!(root.is_root());

        let fetched = logic.fetch_commit(&root.id).unwrap();
        assert_eq!(fetched, root);

        let state = logic.state_at(Some(&root.id)).unwrap();
        assert_eq!(state.get(&key("ns/t1")), Some(&value("v1")));
    }

    #[test]
    fn child_commit_layers_on_parent_state() {
        let logic = logic();
        let root = commit_pairs(&logic, None, "root", &[("a", "1"), ("b", "2")]);
        let mut create = CreateCommit::new(Some(root.id), headers("child"));
        create.put(key("b"), value("2'"));
        create.remove(key("a"));
        create.put(key("c"), value("3"));
        let child = logic.commit(create).unwrap();

        let state = logic.state_at(Some(&child.id)).unwrap();
        assert_eq!(state.get(&key("a")), None);
        assert_eq!(state.get(&key("b")), Some(&value("2'")));
        assert_eq!(state.get(&key("c")), Some(&value("3")));
    }

    #[test]
    fn storing_identical_commit_twice_reports_existed() {
        let logic = logic();
        let mut create = CreateCommit::new(None, headers("same"));
        create.put(key("k"), value("v"));
        let built_a = logic.build_commit(create.clone()).unwrap();
        let built_b = logic.build_commit(create).unwrap();
        assert_eq!(built_a.commit.id, built_b.commit.id);

        let first = logic.store_commit(&built_a.commit, &built_a.objects).unwrap();
        let second = logic.store_commit(&built_b.commit, &built_b.objects).unwrap();
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn store_commit_rejects_missing_parent() {
        let logic = logic();
        let ghost = ObjId::from_hash([0xfe; 32]);
        let built = logic
            .build_commit_on(
                CreateCommit::new(Some(ghost), headers("orphan")),
                &BTreeMap::new(),
            )
            .unwrap();
        let err = logic.store_commit(&built.commit, &built.objects).unwrap_err();
        assert!(matches!(err, CommitError::MissingParent { .. }));
    }

    #[test]
    fn store_commit_rejects_missing_secondary_parent() {
        let logic = logic();
        let root = commit_pairs(&logic, None, "root", &[]);
        let mut create = CreateCommit::new(Some(root.id), headers("merge"));
        create.secondary_parent(ObjId::from_hash([0xfd; 32]));
        let built = logic.build_commit(create).unwrap();
        let err = logic.store_commit(&built.commit, &built.objects).unwrap_err();
        assert!(matches!(err, CommitError::MissingParent { .. }));
    }

    #[test]
    fn fetch_missing_commit_fails() {
        let logic = logic();
        let err = logic.fetch_commit(&ObjId::from_hash([9; 32])).unwrap_err();
        assert!(matches!(err, CommitError::CommitNotFound(_)));
    }

    #[test]
    fn consecutive_commits_share_index_segments() {
        let store = Arc::new(InMemoryObjectStore::new());
        let logic = CommitLogic::new(store.clone() as Arc<dyn ObjectStore>);

        let pairs: Vec<(String, String)> = (0..200)
            .map(|i| (format!("ns/table-{i:04}"), format!("v{i}")))
            .collect();
        let mut create = CreateCommit::new(None, headers("bulk"));
        for (k, v) in &pairs {
            create.put(key(k), value(v));
        }
        let root = logic.commit(create).unwrap();
        let objects_after_root = store.len();

        let mut create = CreateCommit::new(Some(root.id), headers("edit"));
        create.put(key("ns/table-0100"), value("changed"));
        logic.commit(create).unwrap();

        let added = store.len() - objects_after_root;
        assert!(
            added < objects_after_root / 2,
            "one-key edit added {added} objects to a store of {objects_after_root}"
        );
    }

    // ---------------------------------------------------------------
    // Diff
    // ---------------------------------------------------------------

    #[test]
    fn diff_between_commits() {
        let logic = logic();
        let base = commit_pairs(&logic, None, "base", &[("a", "1"), ("b", "2")]);
        let tip = commit_pairs(
            &logic,
            Some(base.id),
            "tip",
            &[("b", "2'"), ("c", "3")],
        );

        let page = logic.diff(Some(&base.id), Some(&tip.id), 100, None).unwrap();
        let keys: Vec<String> = page.entries.iter().map(|e| e.key.canonical()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn diff_from_empty_state_lists_everything() {
        let logic = logic();
        let root = commit_pairs(&logic, None, "root", &[("a", "1"), ("b", "2")]);
        let page = logic.diff(None, Some(&root.id), 100, None).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert!(page.entries.iter().all(|e| e.from.is_none()));
    }

    #[test]
    fn paged_diff_resumes_with_token() {
        let logic = logic();
        let pairs: Vec<(String, String)> =
            (0..10).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        let pair_refs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let root = commit_pairs(&logic, None, "root", &pair_refs);

        let mut collected = Vec::new();
        let mut token = None;
        loop {
            let page = logic
                .diff(None, Some(&root.id), 3, token.as_ref())
                .unwrap();
            collected.extend(page.entries);
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(collected.len(), 10);

        let full = logic.diff(None, Some(&root.id), 100, None).unwrap();
        assert_eq!(collected, full.entries);
    }

    #[test]
    fn diff_to_create_commit_replays_changes() {
        let logic = logic();
        let base = commit_pairs(&logic, None, "base", &[("a", "1"), ("b", "2")]);
        let mut create = CreateCommit::new(Some(base.id), headers("evolve"));
        create.put(key("b"), value("2'"));
        create.remove(key("a"));
        create.put(key("c"), value("3"));
        let tip = logic.commit(create).unwrap();

        // Replay the base->tip diff onto base; the result must equal tip's
        // state.
        let entries: Vec<DiffEntry> =
            logic.diff_iter(Some(&base.id), Some(&tip.id)).unwrap().collect();
        let mut replay = CreateCommit::new(Some(base.id), headers("replay"));
        logic.diff_to_create_commit(entries, &mut replay);
        let replayed = logic.commit(replay).unwrap();

        assert_eq!(
            logic.state_at(Some(&replayed.id)).unwrap(),
            logic.state_at(Some(&tip.id)).unwrap()
        );
    }

    // ---------------------------------------------------------------
    // History walks
    // ---------------------------------------------------------------

    #[test]
    fn commit_chain_walks_newest_to_oldest() {
        let logic = logic();
        let c1 = commit_pairs(&logic, None, "one", &[("a", "1")]);
        let c2 = commit_pairs(&logic, Some(c1.id), "two", &[("a", "2")]);
        let c3 = commit_pairs(&logic, Some(c2.id), "three", &[("a", "3")]);

        let chain: Vec<CommitObj> = logic
            .commit_chain(c3.id)
            .collect::<CommitResult<_>>()
            .unwrap();
        let ids: Vec<ObjId> = chain.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c3.id, c2.id, c1.id]);
    }

    #[test]
    fn commit_chain_does_not_follow_secondary_parents() {
        let logic = logic();
        let main_root = commit_pairs(&logic, None, "main root", &[("a", "1")]);
        let side = commit_pairs(&logic, None, "side root", &[("b", "2")]);

        let mut create = CreateCommit::new(Some(main_root.id), headers("merge"));
        create.secondary_parent(side.id);
        let merged = logic.commit(create).unwrap();

        let ids: Vec<ObjId> = logic
            .commit_chain(merged.id)
            .map(|c| c.unwrap().id)
            .collect();
        assert_eq!(ids, vec![merged.id, main_root.id]);
    }

    #[test]
    fn chain_surfaces_missing_commit() {
        let logic = logic();
        let err = logic
            .commit_chain(ObjId::from_hash([5; 32]))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, CommitError::CommitNotFound(_)));
    }

    #[test]
    fn common_ancestor_of_diverged_branches() {
        let logic = logic();
        let base = commit_pairs(&logic, None, "base", &[("a", "1")]);
        let left = commit_pairs(&logic, Some(base.id), "left", &[("a", "2")]);
        let right = commit_pairs(&logic, Some(base.id), "right", &[("a", "3")]);

        let ancestor = logic.common_ancestor(&left.id, &right.id).unwrap();
        assert_eq!(ancestor, Some(base.id));
    }

    #[test]
    fn common_ancestor_when_one_contains_other() {
        let logic = logic();
        let base = commit_pairs(&logic, None, "base", &[("a", "1")]);
        let tip = commit_pairs(&logic, Some(base.id), "tip", &[("a", "2")]);

        assert_eq!(
            logic.common_ancestor(&tip.id, &base.id).unwrap(),
            Some(base.id)
        );
    }

    #[test]
    fn unrelated_histories_have_no_common_ancestor() {
        let logic = logic();
        let a = commit_pairs(&logic, None, "a", &[("x", "1")]);
        let b = commit_pairs(&logic, None, "b", &[("y", "2")]);
        assert_eq!(logic.common_ancestor(&a.id, &b.id).unwrap(), None);
    }
}
