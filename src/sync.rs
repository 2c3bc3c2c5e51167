//! Branch synchronization against a [`RemoteFetcher`].
//!
//! One call to [`BranchSynchronizer::synchronize`] runs three stages, each
//! consuming the workspace value the previous one produced:
//!
//! ```text
//! refresh   get_branch + fetch  → remote commits appended, Remote pointer moved
//! bootstrap push full history   → only when no Remote pointer exists yet
//! classify  get_differences     → up to date | fast-forward | push | conflict
//! ```
//!
//! A diverged branch is not an error. It comes back as
//! [`SyncOutcome::Conflict`], carrying both states and two ready-made
//! resolutions that record a merge commit and can be synchronized again.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, instrument};
use wesync_core::{
    Action, Branch, BranchKind, CommitHash, Divergence, ManipulatorError, MergeSide,
    Workspace, WorkspaceError, WorkspaceManipulator, ancestor_closure, get_differences,
    topological_order,
};

use crate::remote::{RemoteError, RemoteFetcher};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a successful synchronization did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncAction {
    /// The remote had never seen the branch; the full history was pushed.
    Created,
    /// Both sides already agreed.
    UpToDate,
    /// The local branch moved forward to the remote head.
    FastForwarded,
    /// Local-only commits were sent and the remote moved to the local head.
    Pushed,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::UpToDate => "up-to-date",
            Self::FastForwarded => "fast-forwarded",
            Self::Pushed => "pushed",
        })
    }
}

/// Result of [`BranchSynchronizer::synchronize`].
#[derive(Clone, Debug)]
pub enum SyncOutcome<A: Action> {
    /// Local and remote now agree on the branch head.
    Synced {
        /// The workspace after synchronization.
        workspace: Workspace<A>,
        /// Which path was taken.
        action: SyncAction,
    },
    /// Both sides have commits the other lacks.
    Conflict(SyncConflict<A>),
}

impl<A: Action> SyncOutcome<A> {
    /// The workspace carried by either outcome.
    #[must_use]
    pub const fn workspace(&self) -> &Workspace<A> {
        match self {
            Self::Synced { workspace, .. } => workspace,
            Self::Conflict(conflict) => &conflict.workspace,
        }
    }

    /// `true` for [`SyncOutcome::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A diverged branch awaiting a decision.
///
/// The carried workspace already contains the remote commits, so both heads
/// can be replayed locally.
#[derive(Clone, Debug)]
pub struct SyncConflict<A: Action> {
    workspace: Workspace<A>,
    branch: String,
}

impl<A: Action> SyncConflict<A> {
    /// The workspace holding both sides.
    #[must_use]
    pub const fn workspace(&self) -> &Workspace<A> {
        &self.workspace
    }

    /// Name of the diverged branch.
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Local head.
    ///
    /// # Errors
    /// Fails only if the branch entry has vanished from the workspace.
    pub fn local_head(&self) -> Result<&CommitHash, SyncError> {
        Ok(&self.workspace.branches().get_local(&self.branch).map_err(WorkspaceError::from)?.head)
    }

    /// Remote-tracking head.
    ///
    /// # Errors
    /// Fails only if the branch entry has vanished from the workspace.
    pub fn remote_head(&self) -> Result<&CommitHash, SyncError> {
        Ok(&self.workspace.branches().get_remote(&self.branch).map_err(WorkspaceError::from)?.head)
    }

    /// State at the local head.
    ///
    /// # Errors
    /// Any replay failure.
    pub fn local_state(&self) -> Result<A::State, SyncError> {
        Ok(self.workspace.get_state(self.local_head()?)?)
    }

    /// State at the remote head.
    ///
    /// # Errors
    /// Any replay failure.
    pub fn remote_state(&self) -> Result<A::State, SyncError> {
        Ok(self.workspace.get_state(self.remote_head()?)?)
    }

    /// Resolve in favor of the local state.
    ///
    /// Records a merge of the remote head into the local head that keeps the
    /// local state. The branch is then strictly ahead of the remote and the
    /// next synchronization pushes.
    ///
    /// # Errors
    /// Any failure building or appending the merge commit.
    pub fn take_local(&self) -> Result<Workspace<A>, SyncError> {
        self.resolve(MergeSide::Target)
    }

    /// Resolve in favor of the remote state.
    ///
    /// # Errors
    /// Any failure building or appending the merge commit.
    pub fn take_remote(&self) -> Result<Workspace<A>, SyncError> {
        self.resolve(MergeSide::Source)
    }

    fn resolve(&self, side: MergeSide) -> Result<Workspace<A>, SyncError> {
        let remote_head = self.remote_head()?.clone();
        info!(branch = %self.branch, ?side, "resolving conflict with merge");
        let merged = WorkspaceManipulator::new(self.workspace.clone())
            .on_branch(self.branch.clone())
            .merge(&remote_head, side)?;
        Ok(merged.into_workspace())
    }
}

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

/// Failures during synchronization.
#[derive(Debug)]
pub enum SyncError {
    /// The workspace has no local branch by that name.
    MissingLocalBranch {
        /// Branch name.
        name: String,
    },

    /// [`fast_forward`] was called but the remote is not strictly ahead.
    RemoteNotAhead {
        /// Branch name.
        name: String,
        /// Observed relationship.
        divergence: Divergence,
    },

    /// A push was requested but the local branch is not strictly ahead.
    LocalNotAhead {
        /// Branch name.
        name: String,
        /// Observed relationship.
        divergence: Divergence,
    },

    /// The fetcher failed.
    Remote(RemoteError),

    /// The workspace rejected a commit or a lookup failed.
    Workspace(WorkspaceError),

    /// A conflict resolution could not be recorded.
    Manipulator(ManipulatorError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLocalBranch { name } => {
                write!(
                    f,
                    "cannot synchronize '{name}': no local branch by that name\n  \
                     To fix: create the branch locally before synchronizing it."
                )
            }
            Self::RemoteNotAhead { name, divergence } => {
                write!(
                    f,
                    "cannot fast-forward '{name}': remote is not strictly ahead ({divergence:?})"
                )
            }
            Self::LocalNotAhead { name, divergence } => {
                write!(
                    f,
                    "cannot push '{name}': local is not strictly ahead ({divergence:?})"
                )
            }
            Self::Remote(e) => write!(f, "remote error: {e}"),
            Self::Workspace(e) => write!(f, "workspace error: {e}"),
            Self::Manipulator(e) => write!(f, "conflict resolution failed: {e}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Remote(e) => Some(e),
            Self::Workspace(e) => Some(e),
            Self::Manipulator(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

impl From<WorkspaceError> for SyncError {
    fn from(e: WorkspaceError) -> Self {
        Self::Workspace(e)
    }
}

impl From<ManipulatorError> for SyncError {
    fn from(e: ManipulatorError) -> Self {
        Self::Manipulator(e)
    }
}

// ---------------------------------------------------------------------------
// Pure transitions
// ---------------------------------------------------------------------------

/// Move the local branch to its remote-tracking head.
///
/// # Errors
/// [`SyncError::RemoteNotAhead`] unless only the remote side has new commits.
pub fn fast_forward<A: Action>(
    ws: &Workspace<A>,
    branch: &str,
) -> Result<Workspace<A>, SyncError> {
    let divergence = get_differences(ws, branch)?.divergence();
    if divergence != Divergence::RemoteAhead {
        return Err(SyncError::RemoteNotAhead {
            name: branch.to_owned(),
            divergence,
        });
    }
    let remote_head = ws.branches().get_remote(branch).map_err(WorkspaceError::from)?.head.clone();
    debug!(branch, head = %remote_head.short(), "fast-forward");
    Ok(ws.with_branch(Branch::local(branch, remote_head))?)
}

// ---------------------------------------------------------------------------
// BranchSynchronizer
// ---------------------------------------------------------------------------

/// Reconciles workspace branches with a remote through a fetcher.
#[derive(Debug)]
pub struct BranchSynchronizer<'f, F> {
    fetcher: &'f F,
}

impl<'f, F> BranchSynchronizer<'f, F> {
    /// A synchronizer talking to `fetcher`.
    #[must_use]
    pub const fn new(fetcher: &'f F) -> Self {
        Self { fetcher }
    }

    /// Bring `branch` in line with the remote.
    ///
    /// # Errors
    /// - [`SyncError::MissingLocalBranch`] if the branch does not exist locally.
    /// - [`SyncError::Remote`] for any fetcher failure, including a push the
    ///   remote refused because someone else advanced it first.
    /// - [`SyncError::Workspace`] for integrity failures in fetched commits.
    #[instrument(skip_all, fields(branch = %branch))]
    pub async fn synchronize<A>(
        &self,
        ws: &Workspace<A>,
        branch: &str,
    ) -> Result<SyncOutcome<A>, SyncError>
    where
        A: Action,
        F: RemoteFetcher<A>,
    {
        let refreshed = self.refresh_remote(ws, branch).await?;
        let (bootstrapped, created) = self.ensure_remote(&refreshed, branch).await?;

        let differences = get_differences(&bootstrapped, branch)?;
        let divergence = differences.divergence();
        debug!(
            ?divergence,
            local_only = differences.local_difference.len(),
            remote_only = differences.remote_difference.len(),
            "classified"
        );

        let outcome = match divergence {
            Divergence::UpToDate => SyncOutcome::Synced {
                workspace: bootstrapped,
                action: if created {
                    SyncAction::Created
                } else {
                    SyncAction::UpToDate
                },
            },
            Divergence::RemoteAhead => SyncOutcome::Synced {
                workspace: fast_forward(&bootstrapped, branch)?,
                action: SyncAction::FastForwarded,
            },
            Divergence::LocalAhead => SyncOutcome::Synced {
                workspace: self
                    .send(&bootstrapped, branch, &differences.local_difference)
                    .await?,
                action: SyncAction::Pushed,
            },
            Divergence::Diverged => SyncOutcome::Conflict(SyncConflict {
                workspace: bootstrapped,
                branch: branch.to_owned(),
            }),
        };

        match &outcome {
            SyncOutcome::Synced { action, .. } => info!(%action, "synchronized"),
            SyncOutcome::Conflict(_) => info!("diverged; resolution required"),
        }
        Ok(outcome)
    }

    /// Send local-only commits and advance the remote.
    ///
    /// # Errors
    /// [`SyncError::LocalNotAhead`] unless only the local side has new
    /// commits; otherwise any fetcher failure.
    pub async fn push<A>(&self, ws: &Workspace<A>, branch: &str) -> Result<Workspace<A>, SyncError>
    where
        A: Action,
        F: RemoteFetcher<A>,
    {
        let differences = get_differences(ws, branch)?;
        let divergence = differences.divergence();
        if divergence != Divergence::LocalAhead {
            return Err(SyncError::LocalNotAhead {
                name: branch.to_owned(),
                divergence,
            });
        }
        self.send(ws, branch, &differences.local_difference).await
    }

    async fn send<A>(
        &self,
        ws: &Workspace<A>,
        branch: &str,
        hashes: &BTreeSet<CommitHash>,
    ) -> Result<Workspace<A>, SyncError>
    where
        A: Action,
        F: RemoteFetcher<A>,
    {
        let local_head = ws.head(branch)?.clone();
        let commits = topological_order(ws, hashes)?;
        debug!(commits = commits.len(), head = %local_head.short(), "pushing");
        self.fetcher.push(commits, branch, &local_head).await?;
        Ok(ws.with_branch(Branch::remote(branch, local_head))?)
    }

    /// Stage one: pull whatever the remote has beyond our last known pointer.
    async fn refresh_remote<A>(
        &self,
        ws: &Workspace<A>,
        branch: &str,
    ) -> Result<Workspace<A>, SyncError>
    where
        A: Action,
        F: RemoteFetcher<A>,
    {
        let Some(remote) = self.fetcher.get_branch(branch).await? else {
            debug!("remote has no such branch");
            return Ok(ws.clone());
        };

        let since = ws
            .branches()
            .find(BranchKind::Remote, branch)
            .map(|b| &b.head)
            .or_else(|| ws.initial_hash());
        let fetched = self.fetcher.fetch(branch, since).await?;
        let fresh: Vec<_> = fetched
            .into_iter()
            .filter(|c| !ws.has_commit(c.hash()))
            .collect();
        debug!(fetched = fresh.len(), head = %remote.head.short(), "refreshed remote");

        Ok(ws
            .add_commits(fresh)?
            .with_branch(Branch::remote(branch, remote.head))?)
    }

    /// Stage two: make sure a Remote pointer exists, publishing the branch
    /// if the remote has never seen it.
    async fn ensure_remote<A>(
        &self,
        ws: &Workspace<A>,
        branch: &str,
    ) -> Result<(Workspace<A>, bool), SyncError>
    where
        A: Action,
        F: RemoteFetcher<A>,
    {
        let local_head = ws
            .branches()
            .find(BranchKind::Local, branch)
            .ok_or_else(|| SyncError::MissingLocalBranch {
                name: branch.to_owned(),
            })?
            .head
            .clone();

        if ws.branches().contains_remote(branch) {
            return Ok((ws.clone(), false));
        }

        let history = ancestor_closure(ws, &local_head, None)?;
        info!(commits = history.len(), "publishing new branch");
        self.fetcher
            .push(topological_order(ws, &history)?, branch, &local_head)
            .await?;
        Ok((ws.with_branch(Branch::remote(branch, local_head))?, true))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
