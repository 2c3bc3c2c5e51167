//! Commit variants and their replay contracts.
//!
//! Every commit is immutable and identified by a [`CommitHash`] over its
//! logical content. Four variants exist:
//!
//! | Variant   | Parents            | `apply(ws)`                    | `revert(ws)`            |
//! |-----------|--------------------|--------------------------------|-------------------------|
//! | Initial   | none               | its own state                  | error: root             |
//! | Command   | `parent`           | `action(state(parent))`        | `state(parent)`         |
//! | Merge     | `target`, `source` | `state(selection)`             | `state(target)`         |
//! | Revert    | `parent`           | `target.revert(ws)`            | `state(target)`         |
//!
//! The primary parent is the first one listed: `parent` for Command and
//! Revert, `target` for Merge. Undo/redo walks only primary parents.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::action::Action;
use crate::hash::CommitHash;
use crate::workspace::{Workspace, WorkspaceError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building or replaying a single commit.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitError {
    /// A merge named the same commit as both target and source.
    #[error("merge target and source are the same commit {hash}")]
    SelfMerge {
        /// The repeated hash.
        hash: CommitHash,
    },

    /// A merge selected a commit that is neither its target nor its source.
    #[error("merge selection {selection} is neither target {target} nor source {merge_source}")]
    InvalidSelection {
        /// Merge target.
        target: CommitHash,
        /// Merge source.
        merge_source: CommitHash,
        /// The rejected selection.
        selection: CommitHash,
    },

    /// Something asked for the state before the initial commit.
    #[error("cannot revert the root commit {hash}")]
    RevertRoot {
        /// Hash of the initial commit.
        hash: CommitHash,
    },

    /// The commit payload could not be turned into its canonical snapshot.
    #[error("failed to serialize commit payload: {message}")]
    Serialize {
        /// Serializer message.
        message: String,
    },

    /// A restored commit does not hash to the value it was stored under.
    #[error("commit snapshot claims hash {claimed} but its content hashes to {actual}")]
    HashMismatch {
        /// Hash recorded in the snapshot.
        claimed: CommitHash,
        /// Hash recomputed from the snapshot content.
        actual: CommitHash,
    },

    /// A restored commit lists parents that do not match its payload.
    #[error("commit snapshot {hash} lists parents that do not match its payload")]
    ParentMismatch {
        /// Hash of the offending commit.
        hash: CommitHash,
    },
}

// ---------------------------------------------------------------------------
// Fingerprint input
// ---------------------------------------------------------------------------

/// What gets hashed. The tag keeps variants from ever sharing input bytes.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Fingerprint<'a, S, C> {
    Initial {
        state: &'a S,
    },
    Command {
        parent: &'a CommitHash,
        command: &'a C,
    },
    Merge {
        target: &'a CommitHash,
        source: &'a CommitHash,
        selection: &'a CommitHash,
    },
    Revert {
        parent: &'a CommitHash,
        target: &'a CommitHash,
    },
}

fn fingerprint<S: Serialize, C: Serialize>(
    content: &Fingerprint<'_, S, C>,
) -> Result<CommitHash, CommitError> {
    CommitHash::of(content).map_err(|e| CommitError::Serialize {
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// The root of a history, carrying a full state value.
#[derive(Clone, Debug)]
pub struct InitialCommit<S> {
    hash: CommitHash,
    state: S,
}

impl<S: Serialize> InitialCommit<S> {
    /// Wrap `state` as a root commit.
    ///
    /// # Errors
    /// Returns [`CommitError::Serialize`] if the state cannot be snapshotted.
    pub fn new(state: S) -> Result<Self, CommitError> {
        let hash = fingerprint::<S, ()>(&Fingerprint::Initial { state: &state })?;
        Ok(Self { hash, state })
    }
}

impl<S> InitialCommit<S> {
    /// The commit hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// The wrapped state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }
}

/// A single action recorded on top of `parent`.
#[derive(Clone, Debug)]
pub struct CommandCommit<A> {
    hash: CommitHash,
    parent: CommitHash,
    action: A,
}

impl<A: Serialize> CommandCommit<A> {
    /// Record `action` as running after `parent`.
    ///
    /// # Errors
    /// Returns [`CommitError::Serialize`] if the action cannot be snapshotted.
    pub fn new(parent: CommitHash, action: A) -> Result<Self, CommitError> {
        let hash = fingerprint::<(), A>(&Fingerprint::Command {
            parent: &parent,
            command: &action,
        })?;
        Ok(Self {
            hash,
            parent,
            action,
        })
    }
}

impl<A> CommandCommit<A> {
    /// The commit hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// The commit this action runs after.
    #[must_use]
    pub const fn parent(&self) -> &CommitHash {
        &self.parent
    }

    /// The recorded action.
    #[must_use]
    pub const fn action(&self) -> &A {
        &self.action
    }
}

/// Which side of a merge wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeSide {
    /// Keep the target (the branch being merged into).
    Target,
    /// Take the source.
    Source,
}

/// Joins two histories, resolving to the state of one of them.
#[derive(Clone, Debug)]
pub struct MergeCommit {
    hash: CommitHash,
    target: CommitHash,
    source: CommitHash,
    selection: CommitHash,
}

impl MergeCommit {
    /// Build a merge of `source` into `target` whose state is `selection`'s.
    ///
    /// # Errors
    /// - [`CommitError::SelfMerge`] if `target == source`.
    /// - [`CommitError::InvalidSelection`] if `selection` is neither side.
    ///
    /// Both are checked before anything is hashed.
    pub fn new(
        target: CommitHash,
        source: CommitHash,
        selection: CommitHash,
    ) -> Result<Self, CommitError> {
        if target == source {
            return Err(CommitError::SelfMerge { hash: target });
        }
        if selection != target && selection != source {
            return Err(CommitError::InvalidSelection {
                target,
                merge_source: source,
                selection,
            });
        }
        let hash = fingerprint::<(), ()>(&Fingerprint::Merge {
            target: &target,
            source: &source,
            selection: &selection,
        })?;
        Ok(Self {
            hash,
            target,
            source,
            selection,
        })
    }

    /// Build a merge selecting one side by role rather than by hash.
    ///
    /// # Errors
    /// Same as [`MergeCommit::new`].
    pub fn selecting(
        target: CommitHash,
        source: CommitHash,
        side: MergeSide,
    ) -> Result<Self, CommitError> {
        let selection = match side {
            MergeSide::Target => target.clone(),
            MergeSide::Source => source.clone(),
        };
        Self::new(target, source, selection)
    }

    /// The commit hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// The branch being merged into (primary parent).
    #[must_use]
    pub const fn target(&self) -> &CommitHash {
        &self.target
    }

    /// The branch being merged in.
    #[must_use]
    pub const fn source(&self) -> &CommitHash {
        &self.source
    }

    /// The side whose state this merge resolves to.
    #[must_use]
    pub const fn selection(&self) -> &CommitHash {
        &self.selection
    }
}

/// Toggles `target` off (or back on, when `target` is itself a revert).
#[derive(Clone, Debug)]
pub struct RevertCommit {
    hash: CommitHash,
    parent: CommitHash,
    target: CommitHash,
}

impl RevertCommit {
    /// Build a revert of `target` placed after `parent`.
    ///
    /// # Errors
    /// Returns [`CommitError::Serialize`] only if hashing fails.
    pub fn new(parent: CommitHash, target: CommitHash) -> Result<Self, CommitError> {
        let hash = fingerprint::<(), ()>(&Fingerprint::Revert {
            parent: &parent,
            target: &target,
        })?;
        Ok(Self {
            hash,
            parent,
            target,
        })
    }

    /// The commit hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// The commit this revert sits after.
    #[must_use]
    pub const fn parent(&self) -> &CommitHash {
        &self.parent
    }

    /// The commit being toggled.
    #[must_use]
    pub const fn target(&self) -> &CommitHash {
        &self.target
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// One immutable, replayable unit of history.
#[derive(Clone, Debug)]
pub enum Commit<A: Action> {
    /// Root of the history.
    Initial(InitialCommit<A::State>),
    /// A recorded action.
    Command(CommandCommit<A>),
    /// A join of two histories.
    Merge(MergeCommit),
    /// An undo or redo.
    Revert(RevertCommit),
}

/// How the state at a commit is obtained from other states.
pub(crate) enum Derivation<'c, A: Action> {
    /// A literal state.
    Root(&'c A::State),
    /// Run `action` over the state at `base`.
    Apply { base: &'c CommitHash, action: &'c A },
    /// Exactly the state at another commit.
    Alias(CommitHash),
}

impl<A: Action> Commit<A> {
    /// The content hash.
    #[must_use]
    pub const fn hash(&self) -> &CommitHash {
        match self {
            Self::Initial(c) => c.hash(),
            Self::Command(c) => c.hash(),
            Self::Merge(c) => c.hash(),
            Self::Revert(c) => c.hash(),
        }
    }

    /// Parent hashes, primary parent first.
    #[must_use]
    pub fn parents(&self) -> Vec<&CommitHash> {
        match self {
            Self::Initial(_) => Vec::new(),
            Self::Command(c) => vec![c.parent()],
            Self::Merge(c) => vec![c.target(), c.source()],
            Self::Revert(c) => vec![c.parent()],
        }
    }

    /// The parent followed by undo/redo and by first-parent history.
    #[must_use]
    pub const fn primary_parent(&self) -> Option<&CommitHash> {
        match self {
            Self::Initial(_) => None,
            Self::Command(c) => Some(c.parent()),
            Self::Merge(c) => Some(c.target()),
            Self::Revert(c) => Some(c.parent()),
        }
    }

    /// Every hash this commit needs present to be replayable: its parents
    /// plus a revert's target.
    #[must_use]
    pub fn references(&self) -> Vec<&CommitHash> {
        let mut refs = self.parents();
        if let Self::Revert(c) = self
            && c.target() != c.parent()
        {
            refs.push(c.target());
        }
        refs
    }

    /// Returns `true` for the root commit.
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        matches!(self, Self::Initial(_))
    }

    /// The revert payload, if this is a revert.
    #[must_use]
    pub const fn as_revert(&self) -> Option<&RevertCommit> {
        match self {
            Self::Revert(c) => Some(c),
            _ => None,
        }
    }

    /// Short lowercase variant name, for logs and snapshots.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initial(_) => "initial",
            Self::Command(_) => "command",
            Self::Merge(_) => "merge",
            Self::Revert(_) => "revert",
        }
    }

    /// The commit whose state `revert` yields.
    pub(crate) fn revert_base(&self) -> Result<&CommitHash, CommitError> {
        match self {
            Self::Initial(c) => Err(CommitError::RevertRoot {
                hash: c.hash().clone(),
            }),
            Self::Command(c) => Ok(c.parent()),
            Self::Merge(c) => Ok(c.target()),
            Self::Revert(c) => Ok(c.target()),
        }
    }

    pub(crate) fn derivation(&self, ws: &Workspace<A>) -> Result<Derivation<'_, A>, WorkspaceError> {
        Ok(match self {
            Self::Initial(c) => Derivation::Root(c.state()),
            Self::Command(c) => Derivation::Apply {
                base: c.parent(),
                action: c.action(),
            },
            Self::Merge(c) => Derivation::Alias(c.selection().clone()),
            Self::Revert(c) => {
                let target: Arc<Self> = ws.get_commit(c.target())?;
                Derivation::Alias(target.revert_base()?.clone())
            }
        })
    }

    /// The state after this commit, evaluated against `ws`.
    ///
    /// # Errors
    /// Fails if a commit this one depends on is missing from `ws`, or if
    /// replay would need the state before the root.
    pub fn apply(&self, ws: &Workspace<A>) -> Result<A::State, WorkspaceError> {
        match self.derivation(ws)? {
            Derivation::Root(state) => Ok(state.clone()),
            Derivation::Apply { base, action } => Ok(action.apply(&ws.get_state(base)?)),
            Derivation::Alias(other) => ws.get_state(&other),
        }
    }

    /// The state this commit undoes back to, evaluated against `ws`.
    ///
    /// # Errors
    /// [`CommitError::RevertRoot`] for the initial commit; otherwise the same
    /// failures as [`Commit::apply`].
    pub fn revert(&self, ws: &Workspace<A>) -> Result<A::State, WorkspaceError> {
        ws.get_state(self.revert_base()?)
    }
}

impl<A: Action> PartialEq for Commit<A> {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl<A: Action> Eq for Commit<A> {}

impl<A: Action> From<CommandCommit<A>> for Commit<A> {
    fn from(c: CommandCommit<A>) -> Self {
        Self::Command(c)
    }
}

impl<A: Action> From<MergeCommit> for Commit<A> {
    fn from(c: MergeCommit) -> Self {
        Self::Merge(c)
    }
}

impl<A: Action> From<RevertCommit> for Commit<A> {
    fn from(c: RevertCommit) -> Self {
        Self::Revert(c)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
