//! The boundary to wherever the shared copy of the graph lives.
//!
//! A [`RemoteFetcher`] is the only asynchronous collaborator of the
//! synchronizer. It owns transport, authentication, and retry; the
//! synchronizer only ever calls these three operations:
//!
//! ```text
//! get_branch(name)               → where the remote branch points, if anywhere
//! fetch(name, since)             → commits reachable from that head but not from `since`
//! push(commits, name, new_head)  → append and advance, atomically, fast-forward only
//! ```
//!
//! [`InMemoryRemote`] is a complete in-process implementation, useful for
//! tests and for replicas sharing one address space.

mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use wesync_core::{Action, Branch, Commit, CommitHash, WorkspaceError};

pub use memory::InMemoryRemote;

/// Transfer of commits and branch pointers to and from a remote replica.
#[async_trait]
pub trait RemoteFetcher<A: Action>: Send + Sync {
    /// The remote's current pointer for `name`, or `None` if the remote has
    /// never heard of that branch.
    async fn get_branch(&self, name: &str) -> Result<Option<Branch>, RemoteError>;

    /// Every commit reachable from the remote head of `name` but not from
    /// `since`, parents before children.
    ///
    /// `None`, or a `since` the remote does not know, yields the full history.
    async fn fetch(
        &self,
        name: &str,
        since: Option<&CommitHash>,
    ) -> Result<Vec<Arc<Commit<A>>>, RemoteError>;

    /// Append `commits` and move `name` to `new_head`.
    ///
    /// Must apply all of it or none of it, and must refuse a `new_head` that
    /// does not descend from the branch's current remote head.
    async fn push(
        &self,
        commits: Vec<Arc<Commit<A>>>,
        name: &str,
        new_head: &CommitHash,
    ) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Failures reported by a [`RemoteFetcher`].
#[derive(Debug)]
pub enum RemoteError {
    /// `fetch` named a branch the remote does not have.
    BranchNotFound {
        /// Branch name.
        name: String,
    },

    /// `push` would discard commits the remote already has.
    NonFastForward {
        /// Branch name.
        name: String,
        /// Remote head at the time of the push.
        current: CommitHash,
        /// Head that was refused.
        proposed: CommitHash,
    },

    /// `push` named a head that neither the pushed commits nor the remote
    /// store contain.
    MissingHead {
        /// Branch name.
        name: String,
        /// The unknown head.
        head: CommitHash,
    },

    /// The pushed commits violate the remote store's integrity rules.
    Integrity(WorkspaceError),

    /// The transport itself failed.
    Transport {
        /// Description from the transport layer.
        message: String,
    },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BranchNotFound { name } => {
                write!(f, "remote has no branch '{name}'")
            }
            Self::NonFastForward {
                name,
                current,
                proposed,
            } => {
                write!(
                    f,
                    "remote branch '{name}' is at {}; {} does not descend from it\n  \
                     To fix: synchronize again to pick up the remote commits, then resolve \
                     the conflict with a merge.",
                    current.short(),
                    proposed.short()
                )
            }
            Self::MissingHead { name, head } => {
                write!(
                    f,
                    "push to '{name}' names head {} but that commit was not sent",
                    head.short()
                )
            }
            Self::Integrity(e) => write!(f, "remote rejected pushed commits: {e}"),
            Self::Transport { message } => write!(f, "remote transport failed: {message}"),
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Integrity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WorkspaceError> for RemoteError {
    fn from(e: WorkspaceError) -> Self {
        Self::Integrity(e)
    }
}
