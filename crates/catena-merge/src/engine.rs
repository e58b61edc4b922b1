//! The merge/transplant/squash engine.
//!
//! All three operations run the same cycle: resolve the target head,
//! compute the source commits and their parent, classify every touched
//! key, build the candidate commit(s), persist them, and CAS-advance the
//! target reference. A CAS conflict restarts the entire cycle against the
//! freshly observed head, under the bounded retry controller.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use catena_commit::{
    with_retry, Attempt, BuiltCommit, CommitLogic, CreateCommit, DiffEntry, RetryConfig,
    RetryError,
};
use catena_refs::{CasOutcome, RefStore};
use catena_store::{CommitObj, ObjectStore};
use catena_types::{ObjId, StoreKey};

use crate::error::MergeError;
use crate::rewriter::MetadataRewriter;
use crate::source::SourceCommitsAndParent;
use crate::types::{KeyDetails, MergeOutcome, MergeResult, MergeType};

/// Parameters of a merge: fold the source branch's changes since the
/// merge base into one merge commit on the target.
#[derive(Clone, Debug)]
pub struct MergeParams {
    /// The branch to merge into.
    pub target_branch: String,
    /// If set, the operation fails unless the branch still points here.
    pub expected_head: Option<ObjId>,
    /// Head commit of the branch being merged in.
    pub source_head: ObjId,
    /// Compute the what-if result without persisting or advancing.
    pub dry_run: bool,
    /// Stop classifying at the first conflicting key.
    pub fail_fast: bool,
    /// Merge type for keys without an override.
    pub default_merge_type: MergeType,
    /// Per-key merge type overrides.
    pub key_merge_types: BTreeMap<StoreKey, MergeType>,
}

impl MergeParams {
    /// Merge `source_head` into `target_branch` with default policy.
    pub fn new(target_branch: impl Into<String>, source_head: ObjId) -> Self {
        Self {
            target_branch: target_branch.into(),
            expected_head: None,
            source_head,
            dry_run: false,
            fail_fast: false,
            default_merge_type: MergeType::Normal,
            key_merge_types: BTreeMap::new(),
        }
    }
}

/// Parameters of a squash: collapse the source range into one commit,
/// optionally recording the squashed branch tip as a secondary parent.
#[derive(Clone, Debug)]
pub struct SquashParams {
    pub target_branch: String,
    pub expected_head: Option<ObjId>,
    /// Head commit of the range being squashed.
    pub source_head: ObjId,
    /// When squashing a merge of a named branch: the source branch tip,
    /// recorded as a secondary parent so it stays reachable.
    pub merge_from: Option<ObjId>,
    pub dry_run: bool,
    pub fail_fast: bool,
    pub default_merge_type: MergeType,
    pub key_merge_types: BTreeMap<StoreKey, MergeType>,
}

impl SquashParams {
    /// Squash the range behind `source_head` onto `target_branch`.
    pub fn new(target_branch: impl Into<String>, source_head: ObjId) -> Self {
        Self {
            target_branch: target_branch.into(),
            expected_head: None,
            source_head,
            merge_from: None,
            dry_run: false,
            fail_fast: false,
            default_merge_type: MergeType::Normal,
            key_merge_types: BTreeMap::new(),
        }
    }
}

/// Parameters of a transplant: re-apply an exact sequence of commits on
/// top of the target head, preserving per-commit boundaries.
#[derive(Clone, Debug)]
pub struct TransplantParams {
    pub target_branch: String,
    pub expected_head: Option<ObjId>,
    /// The commits to re-apply, oldest to newest. Must form a contiguous
    /// parent chain.
    pub source_commits: Vec<ObjId>,
    pub dry_run: bool,
    pub fail_fast: bool,
    pub default_merge_type: MergeType,
    pub key_merge_types: BTreeMap<StoreKey, MergeType>,
}

impl TransplantParams {
    /// Transplant `source_commits` onto `target_branch`.
    pub fn new(target_branch: impl Into<String>, source_commits: Vec<ObjId>) -> Self {
        Self {
            target_branch: target_branch.into(),
            expected_head: None,
            source_commits,
            dry_run: false,
            fail_fast: false,
            default_merge_type: MergeType::Normal,
            key_merge_types: BTreeMap::new(),
        }
    }
}

/// Outcome of classifying one key.
struct Classified {
    applied: bool,
    conflict: bool,
}

/// The merge/transplant/squash engine.
///
/// Depends only on the two abstract store contracts; any backends
/// satisfying them work underneath.
pub struct Merger {
    logic: CommitLogic,
    refs: Arc<dyn RefStore>,
    retry: RetryConfig,
}

impl Merger {
    /// Create an engine over an object store and a reference store.
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self {
            logic: CommitLogic::new(objects),
            refs,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the CAS retry configuration.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The commit logic this engine operates through.
    pub fn commit_logic(&self) -> &CommitLogic {
        &self.logic
    }

    // ---------------------------------------------------------------
    // Public operations
    // ---------------------------------------------------------------

    /// Merge the source branch into the target branch.
    ///
    /// Builds a single merge commit whose primary parent is the target
    /// head and whose secondary parent is the source head; its content is
    /// the source range's diff layered onto the target.
    pub fn merge(
        &self,
        params: MergeParams,
        rewriter: &dyn MetadataRewriter,
    ) -> Result<MergeOutcome, MergeError> {
        let squash = SquashParams {
            target_branch: params.target_branch,
            expected_head: params.expected_head,
            source_head: params.source_head,
            merge_from: Some(params.source_head),
            dry_run: params.dry_run,
            fail_fast: params.fail_fast,
            default_merge_type: params.default_merge_type,
            key_merge_types: params.key_merge_types,
        };
        self.squash(squash, rewriter)
    }

    /// Squash the source range into one commit on the target branch.
    pub fn squash(
        &self,
        params: SquashParams,
        rewriter: &dyn MetadataRewriter,
    ) -> Result<MergeOutcome, MergeError> {
        debug!(
            branch = %params.target_branch,
            source = %params.source_head.short_hex(),
            dry_run = params.dry_run,
            "squash"
        );
        run_retry(&self.retry, |_| self.squash_attempt(&params, rewriter))
    }

    /// Re-apply a sequence of commits onto the target branch.
    pub fn transplant(
        &self,
        params: TransplantParams,
        rewriter: &dyn MetadataRewriter,
    ) -> Result<MergeOutcome, MergeError> {
        debug!(
            branch = %params.target_branch,
            commits = params.source_commits.len(),
            dry_run = params.dry_run,
            "transplant"
        );
        run_retry(&self.retry, |_| self.transplant_attempt(&params, rewriter))
    }

    // ---------------------------------------------------------------
    // One attempt of each operation
    // ---------------------------------------------------------------

    fn squash_attempt(
        &self,
        params: &SquashParams,
        rewriter: &dyn MetadataRewriter,
    ) -> Result<Attempt<MergeOutcome>, MergeError> {
        let head = self.resolve_target_head(&params.target_branch, params.expected_head)?;
        let source = self.source_since(&head, &params.source_head)?;
        let Some(tip) = source.most_recent() else {
            return Ok(Attempt::Complete(no_op(head, params.dry_run)));
        };
        let tip_id = tip.id;

        let source_headers: Vec<_> = source.commits.iter().map(|c| c.headers.clone()).collect();
        let mut create = CreateCommit::new(Some(head), rewriter.squash(&source_headers));
        if let Some(merge_from) = params.merge_from {
            create.secondary_parent(merge_from);
        }

        let mut target_state = self.logic.state_at(Some(&head))?;
        let mut details = BTreeMap::new();
        let mut any_conflict = false;

        for entry in self.logic.diff_iter(source.parent.as_ref(), Some(&tip_id))? {
            let resolved = resolve_type(params, &entry.key);
            let outcome = classify(resolved, &entry, target_state.get(&entry.key));
            if outcome.applied {
                apply_entry(&mut create, &mut target_state, &entry);
            }
            if outcome.conflict {
                any_conflict = true;
            }
            details.insert(
                entry.key.clone(),
                KeyDetails {
                    merge_type: resolved,
                    applied: outcome.applied,
                    conflict: outcome.conflict,
                },
            );
            if any_conflict && params.fail_fast {
                break;
            }
        }

        if any_conflict {
            return Ok(Attempt::Complete(MergeOutcome::Conflict(MergeResult {
                new_head: head,
                dry_run: params.dry_run,
                details,
            })));
        }

        let built = self.logic.build_commit_on(create, &target_state)?;
        self.finish(params.dry_run, &params.target_branch, head, vec![built], details)
    }

    fn transplant_attempt(
        &self,
        params: &TransplantParams,
        rewriter: &dyn MetadataRewriter,
    ) -> Result<Attempt<MergeOutcome>, MergeError> {
        let head = self.resolve_target_head(&params.target_branch, params.expected_head)?;
        let source = self.source_sequence(&params.source_commits)?;
        if source.is_empty() {
            return Ok(Attempt::Complete(no_op(head, params.dry_run)));
        }

        let mut target_state = self.logic.state_at(Some(&head))?;
        let mut details = BTreeMap::new();
        let mut any_conflict = false;
        let mut current_head = head;
        let mut built: Vec<BuiltCommit> = Vec::new();

        'commits: for commit in &source.commits {
            let mut create =
                CreateCommit::new(Some(current_head), rewriter.rewrite_single(&commit.headers));
            let state_before = target_state.clone();

            for entry in self
                .logic
                .diff_iter(commit.parent.as_ref(), Some(&commit.id))?
            {
                let resolved = resolve_type(params, &entry.key);
                let outcome = classify(resolved, &entry, target_state.get(&entry.key));
                if outcome.applied {
                    apply_entry(&mut create, &mut target_state, &entry);
                }
                if outcome.conflict {
                    any_conflict = true;
                }
                // Keys are unique in the details; when several source
                // commits touch the same key the later verdict wins, as it
                // was classified against the already-advanced state.
                details.insert(
                    entry.key.clone(),
                    KeyDetails {
                        merge_type: resolved,
                        applied: outcome.applied,
                        conflict: outcome.conflict,
                    },
                );
                if any_conflict && params.fail_fast {
                    break 'commits;
                }
            }

            if !any_conflict {
                let built_commit = self.logic.build_commit_on(create, &state_before)?;
                current_head = built_commit.commit.id;
                built.push(built_commit);
            }
        }

        if any_conflict {
            return Ok(Attempt::Complete(MergeOutcome::Conflict(MergeResult {
                new_head: head,
                dry_run: params.dry_run,
                details,
            })));
        }

        self.finish(params.dry_run, &params.target_branch, head, built, details)
    }

    /// Steps 5-7 shared by both attempt shapes: persist the candidates,
    /// CAS-advance the reference, and report.
    fn finish(
        &self,
        dry_run: bool,
        branch: &str,
        resolved_head: ObjId,
        built: Vec<BuiltCommit>,
        details: BTreeMap<StoreKey, KeyDetails>,
    ) -> Result<Attempt<MergeOutcome>, MergeError> {
        if dry_run {
            // Candidates were constructed in memory for the what-if
            // report; nothing is persisted and the head stays put.
            return Ok(Attempt::Complete(MergeOutcome::Success(MergeResult {
                new_head: resolved_head,
                dry_run: true,
                details,
            })));
        }

        let mut new_head = resolved_head;
        for candidate in &built {
            // A `false` return means a content-identical commit already
            // existed. That is NOT evidence of a fast-forward: the equal
            // commit may have been created by a concurrent, unrelated
            // request and need not be part of this reference's history.
            // The candidate's own id is the new head either way.
            let _stored = self
                .logic
                .store_commit(&candidate.commit, &candidate.objects)?;
            new_head = candidate.commit.id;
        }

        match self
            .refs
            .compare_and_set(branch, &resolved_head, &new_head)?
        {
            CasOutcome::Committed => Ok(Attempt::Complete(MergeOutcome::Success(MergeResult {
                new_head,
                dry_run: false,
                details,
            }))),
            CasOutcome::Conflict { actual } => Ok(Attempt::Retry { observed: actual }),
        }
    }

    // ---------------------------------------------------------------
    // Preconditions
    // ---------------------------------------------------------------

    /// Read the target head; a caller-supplied expected head must match.
    fn resolve_target_head(
        &self,
        branch: &str,
        expected: Option<ObjId>,
    ) -> Result<ObjId, MergeError> {
        let reference =
            self.refs
                .read_ref(branch)?
                .ok_or_else(|| MergeError::ReferenceNotFound {
                    name: branch.to_string(),
                })?;
        if let Some(expected) = expected {
            if expected != reference.head {
                return Err(MergeError::StaleExpectedHead {
                    expected,
                    actual: reference.head,
                });
            }
        }
        Ok(reference.head)
    }

    /// The commits unique to the source since the merge base with the
    /// target, oldest to newest.
    fn source_since(
        &self,
        target_head: &ObjId,
        source_head: &ObjId,
    ) -> Result<SourceCommitsAndParent, MergeError> {
        let base = self
            .logic
            .common_ancestor(target_head, source_head)?
            .ok_or(MergeError::UnrelatedHistories {
                target: *target_head,
                source_id: *source_head,
            })?;

        let mut commits = Vec::new();
        if base != *source_head {
            for commit in self.logic.commit_chain(*source_head) {
                let commit = commit?;
                if commit.id == base {
                    break;
                }
                commits.push(commit);
            }
            commits.reverse();
        }
        Ok(SourceCommitsAndParent {
            commits,
            parent: Some(base),
        })
    }

    /// Fetch and validate a caller-named transplant sequence.
    fn source_sequence(&self, ids: &[ObjId]) -> Result<SourceCommitsAndParent, MergeError> {
        let mut commits = Vec::with_capacity(ids.len());
        for id in ids {
            let commit = self.logic.fetch_commit(id)?;
            if let Some(previous) = commits.last() {
                let previous: &CommitObj = previous;
                if commit.parent != Some(previous.id) {
                    return Err(MergeError::NonContiguousSource { commit: commit.id });
                }
            }
            commits.push(commit);
        }
        let parent = commits.first().and_then(|c| c.parent);
        Ok(SourceCommitsAndParent { commits, parent })
    }
}

impl std::fmt::Debug for Merger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger").field("retry", &self.retry).finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------
// Free helpers
// -------------------------------------------------------------------

fn run_retry<F>(config: &RetryConfig, work: F) -> Result<MergeOutcome, MergeError>
where
    F: FnMut(u32) -> Result<Attempt<MergeOutcome>, MergeError>,
{
    with_retry(config, work).map_err(|err| match err {
        RetryError::Exhausted { attempts } => MergeError::RetryExhausted { attempts },
        RetryError::Inner(inner) => inner,
    })
}

fn no_op(head: ObjId, dry_run: bool) -> MergeOutcome {
    MergeOutcome::Success(MergeResult {
        new_head: head,
        dry_run,
        details: BTreeMap::new(),
    })
}

trait KeyPolicy {
    fn default_merge_type(&self) -> MergeType;
    fn overrides(&self) -> &BTreeMap<StoreKey, MergeType>;
}

impl KeyPolicy for SquashParams {
    fn default_merge_type(&self) -> MergeType {
        self.default_merge_type
    }
    fn overrides(&self) -> &BTreeMap<StoreKey, MergeType> {
        &self.key_merge_types
    }
}

impl KeyPolicy for TransplantParams {
    fn default_merge_type(&self) -> MergeType {
        self.default_merge_type
    }
    fn overrides(&self) -> &BTreeMap<StoreKey, MergeType> {
        &self.key_merge_types
    }
}

fn resolve_type(policy: &impl KeyPolicy, key: &StoreKey) -> MergeType {
    policy
        .overrides()
        .get(key)
        .copied()
        .unwrap_or(policy.default_merge_type())
}

/// Three-way classification of one diff entry against the target state.
///
/// `entry.from` is the value at the common base; `target_value` is what
/// the target currently holds for the key.
fn classify(resolved: MergeType, entry: &DiffEntry, target_value: Option<&ObjId>) -> Classified {
    match resolved {
        MergeType::Drop => Classified {
            applied: false,
            conflict: false,
        },
        MergeType::Force => Classified {
            applied: true,
            conflict: false,
        },
        MergeType::Normal => {
            if target_value == entry.from.as_ref() {
                // Target untouched since the base: apply cleanly.
                Classified {
                    applied: true,
                    conflict: false,
                }
            } else if target_value == entry.to.as_ref() {
                // Both sides made the same change; nothing left to do.
                Classified {
                    applied: true,
                    conflict: false,
                }
            } else {
                Classified {
                    applied: false,
                    conflict: true,
                }
            }
        }
    }
}

fn apply_entry(
    create: &mut CreateCommit,
    state: &mut BTreeMap<StoreKey, ObjId>,
    entry: &DiffEntry,
) {
    match entry.to {
        Some(value) => {
            create.put(entry.key.clone(), value);
            state.insert(entry.key.clone(), value);
        }
        None => {
            create.remove(entry.key.clone());
            state.remove(&entry.key);
        }
    }
}
