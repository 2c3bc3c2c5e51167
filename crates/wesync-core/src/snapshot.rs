//! Plain serde representations of commits and workspaces.
//!
//! A [`CommitSnapshot`] carries `type`, `hash`, `parents` and the variant
//! payload. Restoring one recomputes the hash from the payload and refuses
//! the snapshot if it disagrees, so a store loaded from disk holds exactly
//! the commits that were saved.
//!
//! ```json
//! {"type":"revert","hash":"…","parents":["…"],"parent":"…","target":"…"}
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::branches::{Branch, Branches};
use crate::commit::{
    CommandCommit, Commit, CommitError, InitialCommit, MergeCommit, RevertCommit,
};
use crate::hash::CommitHash;
use crate::navigation::topological_order;
use crate::workspace::{Workspace, WorkspaceError, WorkspaceId, WorkspaceSettings};

// ---------------------------------------------------------------------------
// CommitSnapshot
// ---------------------------------------------------------------------------

/// Serializable form of a [`Commit`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", bound = "")]
pub enum CommitSnapshot<A: Action> {
    /// See [`InitialCommit`].
    Initial {
        /// Content hash.
        hash: CommitHash,
        /// Always empty.
        parents: Vec<CommitHash>,
        /// Root state.
        state: A::State,
    },
    /// See [`CommandCommit`].
    Command {
        /// Content hash.
        hash: CommitHash,
        /// `[parent]`.
        parents: Vec<CommitHash>,
        /// The recorded action.
        command: A,
    },
    /// See [`MergeCommit`].
    Merge {
        /// Content hash.
        hash: CommitHash,
        /// `[target, source]`.
        parents: Vec<CommitHash>,
        /// Branch merged into.
        target: CommitHash,
        /// Branch merged in.
        source: CommitHash,
        /// Winning side.
        selection: CommitHash,
    },
    /// See [`RevertCommit`].
    Revert {
        /// Content hash.
        hash: CommitHash,
        /// `[parent]`.
        parents: Vec<CommitHash>,
        /// Commit this revert sits after.
        parent: CommitHash,
        /// Commit being toggled.
        target: CommitHash,
    },
}

impl<A: Action> CommitSnapshot<A> {
    /// The hash the snapshot claims.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        match self {
            Self::Initial { hash, .. }
            | Self::Command { hash, .. }
            | Self::Merge { hash, .. }
            | Self::Revert { hash, .. } => hash,
        }
    }

    fn parents(&self) -> &[CommitHash] {
        match self {
            Self::Initial { parents, .. }
            | Self::Command { parents, .. }
            | Self::Merge { parents, .. }
            | Self::Revert { parents, .. } => parents,
        }
    }
}

impl<A: Action> Commit<A> {
    /// Capture this commit as a plain snapshot.
    #[must_use]
    pub fn to_snapshot(&self) -> CommitSnapshot<A> {
        let hash = self.hash().clone();
        let parents = self.parents().into_iter().cloned().collect();
        match self {
            Self::Initial(c) => CommitSnapshot::Initial {
                hash,
                parents,
                state: c.state().clone(),
            },
            Self::Command(c) => CommitSnapshot::Command {
                hash,
                parents,
                command: c.action().clone(),
            },
            Self::Merge(c) => CommitSnapshot::Merge {
                hash,
                parents,
                target: c.target().clone(),
                source: c.source().clone(),
                selection: c.selection().clone(),
            },
            Self::Revert(c) => CommitSnapshot::Revert {
                hash,
                parents,
                parent: c.parent().clone(),
                target: c.target().clone(),
            },
        }
    }

    /// Rebuild a commit from a snapshot, verifying its hash and parents.
    ///
    /// # Errors
    /// - [`CommitError::HashMismatch`] if the payload hashes differently.
    /// - [`CommitError::ParentMismatch`] if `parents` disagrees with the payload.
    /// - Any constructor error (e.g. an invalid merge).
    pub fn from_snapshot(snapshot: CommitSnapshot<A>) -> Result<Self, CommitError> {
        let claimed = snapshot.hash().clone();
        let listed = snapshot.parents().to_vec();

        let commit = match snapshot {
            CommitSnapshot::Initial { state, .. } => Self::Initial(InitialCommit::new(state)?),
            CommitSnapshot::Command {
                parents, command, ..
            } => {
                let parent = parents
                    .into_iter()
                    .next()
                    .ok_or_else(|| CommitError::ParentMismatch {
                        hash: claimed.clone(),
                    })?;
                Self::Command(CommandCommit::new(parent, command)?)
            }
            CommitSnapshot::Merge {
                target,
                source,
                selection,
                ..
            } => Self::Merge(MergeCommit::new(target, source, selection)?),
            CommitSnapshot::Revert { parent, target, .. } => {
                Self::Revert(RevertCommit::new(parent, target)?)
            }
        };

        if commit.hash() != &claimed {
            return Err(CommitError::HashMismatch {
                claimed,
                actual: commit.hash().clone(),
            });
        }
        if commit.parents().into_iter().ne(listed.iter()) {
            return Err(CommitError::ParentMismatch { hash: claimed });
        }
        Ok(commit)
    }
}

// ---------------------------------------------------------------------------
// WorkspaceSnapshot
// ---------------------------------------------------------------------------

/// Serializable form of a whole [`Workspace`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct WorkspaceSnapshot<A: Action> {
    /// Lineage identity.
    pub id: WorkspaceId,
    /// Every commit, parents before children.
    pub commits: Vec<CommitSnapshot<A>>,
    /// Local and remote branches.
    pub branches: Vec<Branch>,
}

impl<A: Action> Workspace<A> {
    /// Capture the whole store.
    ///
    /// # Errors
    /// Only fails if the store is internally inconsistent.
    pub fn to_snapshot(&self) -> Result<WorkspaceSnapshot<A>, WorkspaceError> {
        let all: BTreeSet<CommitHash> = self.hashes().cloned().collect();
        let commits = topological_order(self, &all)?
            .iter()
            .map(|c| c.to_snapshot())
            .collect();
        Ok(WorkspaceSnapshot {
            id: self.id(),
            commits,
            branches: self.branches().iter().cloned().collect(),
        })
    }

    /// Rebuild a store, re-running every integrity check.
    ///
    /// # Errors
    /// Any commit or workspace integrity failure in the snapshot.
    pub fn from_snapshot(snapshot: WorkspaceSnapshot<A>) -> Result<Self, WorkspaceError> {
        Self::from_snapshot_with(snapshot, &WorkspaceSettings::default())
    }

    /// Like [`Workspace::from_snapshot`] with explicit settings.
    ///
    /// # Errors
    /// Any commit or workspace integrity failure in the snapshot.
    pub fn from_snapshot_with(
        snapshot: WorkspaceSnapshot<A>,
        settings: &WorkspaceSettings,
    ) -> Result<Self, WorkspaceError> {
        let commits = snapshot
            .commits
            .into_iter()
            .map(Commit::from_snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        let branches: Branches = snapshot.branches.into_iter().collect();
        Self::with_identity(snapshot.id, settings)
            .add_commits(commits)?
            .set_branches(branches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
