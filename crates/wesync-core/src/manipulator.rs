//! Editing a branch: apply actions, commit, undo and redo.
//!
//! Undo and redo never rewind history. Both append a [`RevertCommit`] at the
//! branch head, so every replica sees the same linear record of what the
//! user did.
//!
//! ## Which commit is undone?
//!
//! A revert *toggles* its target. Reverting a revert toggles whatever that
//! revert toggled, so a chain `r2 → r1 → c` always resolves to the same
//! ultimate commit `c`. Whether `c` is currently undone is the parity of the
//! toggle chain found on the primary-parent line:
//!
//! ```text
//! head ─ r2(target r1) ─ r1(target c) ─ c ─ … ─ root
//!
//! toggles(c) = 1 (r1) + 1 (r2) = 2  →  even  →  c is in effect
//! ```
//!
//! - **undo** reverts the nearest commit on the line that is neither the
//!   root nor currently undone.
//! - **redo** looks only at the run of reverts directly below the head and
//!   reverts the nearest one whose ultimate target is currently undone. Any
//!   new non-revert commit ends that run, which is what discards redo
//!   history.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::action::Action;
use crate::branches::{Branch, MAIN_BRANCH};
use crate::commit::{Commit, CommandCommit, CommitError, MergeCommit, MergeSide, RevertCommit};
use crate::hash::CommitHash;
use crate::navigation::primary_parent_chain;
use crate::workspace::{Workspace, WorkspaceError};

/// Errors from [`WorkspaceManipulator`] operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ManipulatorError {
    /// Every commit on the branch is already undone (or is the root).
    #[error("nothing to undo on branch '{branch}'")]
    NothingToUndo {
        /// Branch that was inspected.
        branch: String,
    },

    /// No undo sits directly below the branch head.
    #[error("nothing to redo on branch '{branch}'")]
    NothingToRedo {
        /// Branch that was inspected.
        branch: String,
    },

    /// The workspace rejected the new commit or a lookup failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The new commit could not be built.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

type Chain<A> = [Arc<Commit<A>>];

/// The editing surface over one local branch of a [`Workspace`].
///
/// Every operation returns a new manipulator; the original, and the
/// workspace it wraps, are unchanged.
#[derive(Clone, Debug)]
pub struct WorkspaceManipulator<A: Action> {
    workspace: Workspace<A>,
    branch: String,
}

impl<A: Action> WorkspaceManipulator<A> {
    /// Edit [`MAIN_BRANCH`] of `workspace`.
    #[must_use]
    pub fn new(workspace: Workspace<A>) -> Self {
        Self {
            workspace,
            branch: MAIN_BRANCH.to_owned(),
        }
    }

    /// Edit `branch` instead.
    #[must_use]
    pub fn on_branch(self, branch: impl Into<String>) -> Self {
        Self {
            workspace: self.workspace,
            branch: branch.into(),
        }
    }

    /// The wrapped workspace.
    #[must_use]
    pub const fn workspace(&self) -> &Workspace<A> {
        &self.workspace
    }

    /// Unwrap the workspace.
    #[must_use]
    pub fn into_workspace(self) -> Workspace<A> {
        self.workspace
    }

    /// The branch being edited.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Current head of the branch.
    ///
    /// # Errors
    /// Fails if the local branch does not exist.
    pub fn head(&self) -> Result<&CommitHash, ManipulatorError> {
        Ok(self.workspace.head(&self.branch)?)
    }

    /// State at the branch head.
    ///
    /// # Errors
    /// Fails if the branch does not exist or its history cannot be replayed.
    pub fn state(&self) -> Result<A::State, ManipulatorError> {
        Ok(self.workspace.branch_state(&self.branch)?)
    }

    /// Record `action` on top of the branch head.
    ///
    /// # Errors
    /// Fails if the branch does not exist or the action cannot be hashed.
    pub fn apply(&self, action: A) -> Result<Self, ManipulatorError> {
        let commit = CommandCommit::new(self.head()?.clone(), action)?;
        self.commit(Commit::Command(commit))
    }

    /// Append `commit` and move the branch to it.
    ///
    /// # Errors
    /// Fails if the branch does not exist or the workspace rejects the commit.
    pub fn commit(&self, commit: impl Into<Arc<Commit<A>>>) -> Result<Self, ManipulatorError> {
        let commit = commit.into();
        let branches = self
            .workspace
            .branches()
            .update(Branch::local(self.branch.clone(), commit.hash().clone()))
            .map_err(WorkspaceError::from)?;
        let workspace = self.workspace.add_commit(commit)?.set_branches(branches)?;
        Ok(Self {
            workspace,
            branch: self.branch.clone(),
        })
    }

    /// Merge `source` into the branch head, keeping `side`'s state.
    ///
    /// # Errors
    /// Fails if `source` is the head itself or is not in the workspace.
    pub fn merge(&self, source: &CommitHash, side: MergeSide) -> Result<Self, ManipulatorError> {
        let merge = MergeCommit::selecting(self.head()?.clone(), source.clone(), side)?;
        debug!(branch = %self.branch, source = %source.short(), ?side, "merge");
        self.commit(Commit::Merge(merge))
    }

    /// Returns `true` if [`undo`](Self::undo) would succeed.
    ///
    /// # Errors
    /// Fails if the branch does not exist or its history is incomplete.
    pub fn can_undo(&self) -> Result<bool, ManipulatorError> {
        let chain = self.chain()?;
        Ok(self.find_undo_target(&chain)?.is_some())
    }

    /// Returns `true` if [`redo`](Self::redo) would succeed.
    ///
    /// # Errors
    /// Fails if the branch does not exist or its history is incomplete.
    pub fn can_redo(&self) -> Result<bool, ManipulatorError> {
        let chain = self.chain()?;
        Ok(self.find_redo_target(&chain)?.is_some())
    }

    /// Revert the most recent commit that is still in effect.
    ///
    /// # Errors
    /// [`ManipulatorError::NothingToUndo`] if there is none.
    pub fn undo(&self) -> Result<Self, ManipulatorError> {
        let chain = self.chain()?;
        let target = self
            .find_undo_target(&chain)?
            .ok_or_else(|| ManipulatorError::NothingToUndo {
                branch: self.branch.clone(),
            })?;
        debug!(branch = %self.branch, target = %target.hash().short(), "undo");
        self.revert_at_head(&target)
    }

    /// Re-apply the most recently undone commit.
    ///
    /// # Errors
    /// [`ManipulatorError::NothingToRedo`] if the head is not preceded by an
    /// undo.
    pub fn redo(&self) -> Result<Self, ManipulatorError> {
        let chain = self.chain()?;
        let target = self
            .find_redo_target(&chain)?
            .ok_or_else(|| ManipulatorError::NothingToRedo {
                branch: self.branch.clone(),
            })?;
        debug!(branch = %self.branch, target = %target.hash().short(), "redo");
        self.revert_at_head(&target)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn revert_at_head(&self, target: &Commit<A>) -> Result<Self, ManipulatorError> {
        let revert = RevertCommit::new(self.head()?.clone(), target.hash().clone())?;
        self.commit(Commit::Revert(revert))
    }

    fn chain(&self) -> Result<Vec<Arc<Commit<A>>>, ManipulatorError> {
        Ok(primary_parent_chain(&self.workspace, self.head()?, None)?)
    }

    fn find_undo_target(&self, chain: &Chain<A>) -> Result<Option<Arc<Commit<A>>>, WorkspaceError> {
        for commit in chain {
            if commit.is_initial() {
                continue;
            }
            if !self.is_undone(commit, chain)? {
                return Ok(Some(Arc::clone(commit)));
            }
        }
        Ok(None)
    }

    fn find_redo_target(&self, chain: &Chain<A>) -> Result<Option<Arc<Commit<A>>>, WorkspaceError> {
        for commit in chain.iter().take_while(|c| c.as_revert().is_some()) {
            if self.is_undone(commit, chain)? {
                return Ok(Some(Arc::clone(commit)));
            }
        }
        Ok(None)
    }

    /// Whether `commit`'s ultimate target is toggled off within `chain`.
    fn is_undone(&self, commit: &Arc<Commit<A>>, chain: &Chain<A>) -> Result<bool, WorkspaceError> {
        let target = self.ultimate_target(commit)?;
        Ok(toggles(target.hash(), chain) % 2 == 1)
    }

    /// Follow revert targets until reaching a non-revert commit.
    fn ultimate_target(&self, commit: &Arc<Commit<A>>) -> Result<Arc<Commit<A>>, WorkspaceError> {
        let mut current = Arc::clone(commit);
        while let Some(revert) = current.as_revert() {
            let next = self.workspace.get_commit(revert.target())?;
            current = next;
        }
        Ok(current)
    }
}

/// Length of the revert-of-revert chain in `chain` that starts at `target`.
fn toggles<A: Action>(target: &CommitHash, chain: &Chain<A>) -> usize {
    let mut count = 0;
    let mut current = target.clone();
    while let Some(revert) = chain
        .iter()
        .find(|c| c.as_revert().is_some_and(|r| r.target() == &current))
    {
        count += 1;
        current = revert.hash().clone();
    }
    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
