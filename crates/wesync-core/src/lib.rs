//! Content-addressed commit graph with replayable state and undo/redo.
//!
//! Application state evolves by recording [`Action`]s as immutable commits in
//! a [`Workspace`]. Any commit can be replayed into a concrete state, branches
//! point into the graph, and a [`WorkspaceManipulator`] offers apply, undo and
//! redo on top.
//!
//! ```text
//! action ─▶ WorkspaceManipulator ─▶ Commit ─▶ Workspace ─▶ navigation / differences
//! ```
//!
//! Everything here is synchronous and pure. Moving commits between replicas
//! is the job of the `wesync` crate, which builds on these types.

pub mod action;
pub mod branches;
pub mod commit;
pub mod differences;
pub mod hash;
pub mod manipulator;
pub mod navigation;
pub mod snapshot;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod workspace;

pub use action::Action;
pub use branches::{Branch, BranchError, BranchKind, Branches, MAIN_BRANCH};
pub use commit::{
    CommandCommit, Commit, CommitError, InitialCommit, MergeCommit, MergeSide, RevertCommit,
};
pub use differences::{Differences, Divergence, get_differences};
pub use hash::{CommitHash, InvalidHash};
pub use manipulator::{ManipulatorError, WorkspaceManipulator};
pub use navigation::{ancestor_closure, is_ancestor, primary_parent_chain, topological_order};
pub use snapshot::{CommitSnapshot, WorkspaceSnapshot};
pub use workspace::{
    DEFAULT_STATE_CACHE_CAPACITY, Workspace, WorkspaceError, WorkspaceId, WorkspaceSettings,
};
