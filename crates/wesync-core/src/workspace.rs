//! The commit store: an immutable value of commits plus branch pointers.
//!
//! A [`Workspace`] never changes after construction. [`Workspace::add_commit`]
//! and [`Workspace::set_branches`] return a new value that shares all
//! unaffected structure with the old one (`im` persistent maps), so keeping
//! old workspaces around is cheap and always safe.
//!
//! ## Integrity
//!
//! ```text
//! add_commit(c):
//!   c.hash already stored          → DuplicateCommit
//!   c is Initial, store non-empty  → DuplicateInitial
//!   any parent of c missing        → MissingParent
//!   c is Revert, target missing    → MissingRevertTarget
//!
//! set_branches(b):
//!   any head not stored            → DanglingBranch
//! ```
//!
//! Together these guarantee every stored commit can be replayed.
//!
//! ## State evaluation
//!
//! [`Workspace::get_state`] resolves a hash to a state with an explicit
//! stack rather than recursion, so histories of any depth evaluate in bounded
//! stack space. Results are memoized in a bounded cache shared by every
//! workspace derived from the same [`Workspace::empty`] call; states are a
//! pure function of the commit hash, so the cache never needs invalidation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quick_cache::sync::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::action::Action;
use crate::branches::{Branch, BranchError, BranchKind, Branches, MAIN_BRANCH};
use crate::commit::{Commit, CommitError, Derivation, InitialCommit};
use crate::hash::CommitHash;

/// Default number of states memoized per workspace lineage.
pub const DEFAULT_STATE_CACHE_CAPACITY: usize = 4096;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Integrity violations and lookups against a [`Workspace`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// The hash is not in the store.
    #[error("commit {hash} not found in workspace")]
    CommitNotFound {
        /// The missing hash.
        hash: CommitHash,
    },

    /// The commit is already stored.
    #[error("commit {hash} already exists in workspace")]
    DuplicateCommit {
        /// The repeated hash.
        hash: CommitHash,
    },

    /// A second initial commit was offered.
    #[error("workspace already has initial commit {existing}; refusing initial commit {hash}")]
    DuplicateInitial {
        /// The stored root.
        existing: CommitHash,
        /// The rejected root.
        hash: CommitHash,
    },

    /// A commit arrived before one of its parents.
    #[error("commit {hash} references missing parent {parent}")]
    MissingParent {
        /// The rejected commit.
        hash: CommitHash,
        /// The parent that is not stored.
        parent: CommitHash,
    },

    /// A revert arrived before the commit it toggles.
    #[error("revert {hash} targets missing commit {target}")]
    MissingRevertTarget {
        /// The rejected revert.
        hash: CommitHash,
        /// The target that is not stored.
        target: CommitHash,
    },

    /// A branch would point at a commit that is not stored.
    #[error("{kind} branch '{name}' points at missing commit {head}")]
    DanglingBranch {
        /// Namespace.
        kind: BranchKind,
        /// Branch name.
        name: String,
        /// The missing head.
        head: CommitHash,
    },

    /// Branch lookup failed.
    #[error(transparent)]
    Branch(#[from] BranchError),

    /// A commit could not be built or replayed.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

// ---------------------------------------------------------------------------
// WorkspaceId
// ---------------------------------------------------------------------------

/// Identity of a workspace lineage.
///
/// Assigned once by [`Workspace::empty`] and carried unchanged by every
/// workspace derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(u128);

impl WorkspaceId {
    /// A fresh random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<u128>())
    }

    /// Wrap a known value.
    #[must_use]
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = std::num::ParseIntError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        u128::from_str_radix(&s, 16).map(Self)
    }
}

impl From<WorkspaceId> for String {
    fn from(id: WorkspaceId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// WorkspaceSettings
// ---------------------------------------------------------------------------

/// Tunables fixed when a workspace lineage is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// How many evaluated states to keep per lineage.
    pub state_cache_capacity: usize,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            state_cache_capacity: DEFAULT_STATE_CACHE_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// An immutable commit store with its branch registry.
pub struct Workspace<A: Action> {
    id: WorkspaceId,
    commits: im::HashMap<CommitHash, Arc<Commit<A>>>,
    initial: Option<CommitHash>,
    branches: Branches,
    states: Arc<Cache<CommitHash, A::State>>,
}

impl<A: Action> Clone for Workspace<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            commits: self.commits.clone(),
            initial: self.initial.clone(),
            branches: self.branches.clone(),
            states: Arc::clone(&self.states),
        }
    }
}

impl<A: Action> fmt::Debug for Workspace<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("commits", &self.commits.len())
            .field("initial", &self.initial)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

impl<A: Action> Workspace<A> {
    /// An empty store with default settings and a fresh identity.
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with(&WorkspaceSettings::default())
    }

    /// An empty store with explicit settings.
    #[must_use]
    pub fn empty_with(settings: &WorkspaceSettings) -> Self {
        Self::with_identity(WorkspaceId::random(), settings)
    }

    pub(crate) fn with_identity(id: WorkspaceId, settings: &WorkspaceSettings) -> Self {
        Self {
            id,
            commits: im::HashMap::new(),
            initial: None,
            branches: Branches::new(),
            states: Arc::new(Cache::new(settings.state_cache_capacity.max(1))),
        }
    }

    /// A store holding one initial commit for `state`, with a local
    /// [`MAIN_BRANCH`] pointing at it.
    ///
    /// # Errors
    /// Returns [`CommitError::Serialize`] if the state cannot be hashed.
    pub fn new(state: A::State) -> Result<Self, WorkspaceError> {
        Self::new_with(state, &WorkspaceSettings::default())
    }

    /// Like [`Workspace::new`] with explicit settings.
    ///
    /// # Errors
    /// Returns [`CommitError::Serialize`] if the state cannot be hashed.
    pub fn new_with(state: A::State, settings: &WorkspaceSettings) -> Result<Self, WorkspaceError> {
        let initial = InitialCommit::new(state)?;
        let head = initial.hash().clone();
        let ws = Self::empty_with(settings).add_commit(Commit::Initial(initial))?;
        let branches = ws.branches.upsert(Branch::local(MAIN_BRANCH, head));
        ws.set_branches(branches)
    }

    /// Lineage identity.
    #[must_use]
    pub const fn id(&self) -> WorkspaceId {
        self.id
    }

    /// The branch registry.
    #[must_use]
    pub const fn branches(&self) -> &Branches {
        &self.branches
    }

    /// Hash of the root commit, if any commit has been added.
    #[must_use]
    pub const fn initial_hash(&self) -> Option<&CommitHash> {
        self.initial.as_ref()
    }

    /// Number of stored commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Returns `true` if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Every stored commit, in no particular order.
    pub fn commits(&self) -> impl Iterator<Item = &Arc<Commit<A>>> {
        self.commits.values()
    }

    /// Every stored hash, in no particular order.
    pub fn hashes(&self) -> impl Iterator<Item = &CommitHash> {
        self.commits.keys()
    }

    /// Returns `true` if `hash` is stored.
    #[must_use]
    pub fn has_commit(&self, hash: &CommitHash) -> bool {
        self.commits.contains_key(hash)
    }

    /// Fetch a stored commit.
    ///
    /// # Errors
    /// [`WorkspaceError::CommitNotFound`] if absent.
    pub fn get_commit(&self, hash: &CommitHash) -> Result<Arc<Commit<A>>, WorkspaceError> {
        self.commits
            .get(hash)
            .cloned()
            .ok_or_else(|| WorkspaceError::CommitNotFound { hash: hash.clone() })
    }

    /// Head of a local branch.
    ///
    /// # Errors
    /// [`BranchError::NotFound`] if the branch does not exist.
    pub fn head(&self, branch: &str) -> Result<&CommitHash, WorkspaceError> {
        Ok(&self.branches.get_local(branch)?.head)
    }

    /// A new workspace with `commit` appended.
    ///
    /// # Errors
    /// Any of the integrity violations listed in the module docs.
    pub fn add_commit(&self, commit: impl Into<Arc<Commit<A>>>) -> Result<Self, WorkspaceError> {
        let commit = commit.into();
        let hash = commit.hash().clone();

        if self.has_commit(&hash) {
            return Err(WorkspaceError::DuplicateCommit { hash });
        }
        if commit.is_initial() {
            if let Some(existing) = &self.initial {
                return Err(WorkspaceError::DuplicateInitial {
                    existing: existing.clone(),
                    hash,
                });
            }
        } else {
            for parent in commit.parents() {
                if !self.has_commit(parent) {
                    return Err(WorkspaceError::MissingParent {
                        hash,
                        parent: parent.clone(),
                    });
                }
            }
            if let Some(revert) = commit.as_revert()
                && !self.has_commit(revert.target())
            {
                return Err(WorkspaceError::MissingRevertTarget {
                    hash,
                    target: revert.target().clone(),
                });
            }
        }

        trace!(commit = %hash.short(), kind = commit.kind(), "adding commit");

        let mut next = self.clone();
        if commit.is_initial() {
            next.initial = Some(hash.clone());
        }
        next.commits.insert(hash, commit);
        Ok(next)
    }

    /// Append commits left to right.
    ///
    /// Either every commit is added or the first failure is returned; no
    /// partially advanced workspace escapes.
    ///
    /// # Errors
    /// The first integrity violation encountered.
    pub fn add_commits<I, C>(&self, commits: I) -> Result<Self, WorkspaceError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Arc<Commit<A>>>,
    {
        commits
            .into_iter()
            .try_fold(self.clone(), |ws, commit| ws.add_commit(commit))
    }

    /// A new workspace with `branches` installed.
    ///
    /// # Errors
    /// [`WorkspaceError::DanglingBranch`] if any head is not stored.
    pub fn set_branches(&self, branches: Branches) -> Result<Self, WorkspaceError> {
        if let Some(dangling) = branches.iter().find(|b| !self.has_commit(&b.head)) {
            return Err(WorkspaceError::DanglingBranch {
                kind: dangling.kind,
                name: dangling.name.clone(),
                head: dangling.head.clone(),
            });
        }
        let mut next = self.clone();
        next.branches = branches;
        Ok(next)
    }

    /// Upsert a single branch.
    ///
    /// # Errors
    /// [`WorkspaceError::DanglingBranch`] if its head is not stored.
    pub fn with_branch(&self, branch: Branch) -> Result<Self, WorkspaceError> {
        self.set_branches(self.branches.upsert(branch))
    }

    /// The state at `hash`.
    ///
    /// # Errors
    /// [`WorkspaceError::CommitNotFound`] if `hash` (or anything it depends
    /// on) is absent; [`CommitError::RevertRoot`] if a revert targets the root.
    pub fn get_state(&self, hash: &CommitHash) -> Result<A::State, WorkspaceError> {
        // The cache is shared with sibling workspaces of the lineage, so a hit
        // only counts for commits this store holds.
        if !self.has_commit(hash) {
            return Err(WorkspaceError::CommitNotFound { hash: hash.clone() });
        }
        if let Some(state) = self.states.get(hash) {
            return Ok(state);
        }

        // Resolved states for this call. The shared cache is bounded and may
        // evict under us; this map may not.
        let mut resolved: HashMap<CommitHash, A::State> = HashMap::new();
        let mut pending = vec![hash.clone()];

        while let Some(current) = pending.last().cloned() {
            if resolved.contains_key(&current) {
                pending.pop();
                continue;
            }

            let commit = self.get_commit(&current)?;
            let outcome = match commit.derivation(self)? {
                Derivation::Root(state) => Ok(state.clone()),
                Derivation::Apply { base, action } => self
                    .known_state(&resolved, base)
                    .map(|prev| action.apply(&prev))
                    .ok_or_else(|| base.clone()),
                Derivation::Alias(other) => self.known_state(&resolved, &other).ok_or(other),
            };

            match outcome {
                Ok(state) => {
                    self.states.insert(current.clone(), state.clone());
                    resolved.insert(current, state);
                    pending.pop();
                }
                Err(dependency) => pending.push(dependency),
            }
        }

        trace!(commit = %hash.short(), evaluated = resolved.len(), "state evaluated");

        resolved
            .remove(hash)
            .ok_or_else(|| WorkspaceError::CommitNotFound { hash: hash.clone() })
    }

    /// The state at a local branch head.
    ///
    /// # Errors
    /// Branch lookup failure, or the failures of [`Workspace::get_state`].
    pub fn branch_state(&self, branch: &str) -> Result<A::State, WorkspaceError> {
        self.get_state(self.head(branch)?)
    }

    fn known_state(
        &self,
        resolved: &HashMap<CommitHash, A::State>,
        hash: &CommitHash,
    ) -> Option<A::State> {
        resolved
            .get(hash)
            .cloned()
            .or_else(|| self.states.get(hash).filter(|_| self.has_commit(hash)))
    }
}

impl<A: Action> PartialEq for Workspace<A> {
    /// Same commit hashes and same branches. Identity is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.commits.len() == other.commits.len()
            && self.commits.keys().all(|h| other.commits.contains_key(h))
            && self.branches == other.branches
    }
}

impl<A: Action> Eq for Workspace<A> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
