//! Shared helpers for the synchronization integration tests.
//!
//! Every replica is a counter workspace rooted at the same initial value, so
//! independently created replicas share a root commit and can be reconciled.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use wesync::testkit::{TestAction, TestState};
use wesync::{
    Branch, BranchSynchronizer, Commit, CommitHash, InMemoryRemote, MAIN_BRANCH, RemoteError,
    RemoteFetcher, SyncAction, SyncConflict, SyncOutcome, Workspace, WorkspaceManipulator,
};

pub type Ws = Workspace<TestAction>;
pub type Remote = InMemoryRemote<TestAction>;

/// A fresh replica whose `main` sits on a root with `value`.
pub fn replica(value: i64) -> Ws {
    Workspace::new(TestState { value }).unwrap()
}

/// Record `actions` on `main`.
pub fn record(ws: &Ws, actions: &[TestAction]) -> Ws {
    actions
        .iter()
        .fold(WorkspaceManipulator::new(ws.clone()), |m, a| {
            m.apply(*a).unwrap()
        })
        .into_workspace()
}

pub fn value(ws: &Ws) -> i64 {
    ws.branch_state(MAIN_BRANCH).unwrap().value
}

pub fn head(ws: &Ws) -> CommitHash {
    ws.head(MAIN_BRANCH).unwrap().clone()
}

pub fn remote_head(ws: &Ws) -> Option<CommitHash> {
    ws.branches()
        .get_remote(MAIN_BRANCH)
        .ok()
        .map(|b| b.head.clone())
}

/// Synchronize `main` and insist on a `Synced` outcome.
pub async fn sync_ok<F: RemoteFetcher<TestAction>>(fetcher: &F, ws: &Ws) -> (Ws, SyncAction) {
    match BranchSynchronizer::new(fetcher)
        .synchronize(ws, MAIN_BRANCH)
        .await
        .unwrap()
    {
        SyncOutcome::Synced { workspace, action } => (workspace, action),
        SyncOutcome::Conflict(c) => panic!(
            "expected Synced, got conflict (local {:?}, remote {:?})",
            c.local_state(),
            c.remote_state()
        ),
    }
}

/// Synchronize `main` and insist on a conflict.
pub async fn sync_conflict<F: RemoteFetcher<TestAction>>(
    fetcher: &F,
    ws: &Ws,
) -> SyncConflict<TestAction> {
    match BranchSynchronizer::new(fetcher)
        .synchronize(ws, MAIN_BRANCH)
        .await
        .unwrap()
    {
        SyncOutcome::Conflict(c) => c,
        SyncOutcome::Synced { action, .. } => panic!("expected conflict, got {action}"),
    }
}

// ---------------------------------------------------------------------------
// Fetchers with scripted misbehaviour
// ---------------------------------------------------------------------------

/// Answers `get_branch` and `fetch` from a frozen copy of the remote, but
/// pushes to the live one. Models a replica whose view went stale while
/// another replica pushed.
pub struct StaleView {
    pub frozen: Remote,
    pub live: Remote,
}

impl StaleView {
    pub async fn of(live: Remote) -> Self {
        Self {
            frozen: InMemoryRemote::new(live.workspace().await),
            live,
        }
    }
}

#[async_trait]
impl RemoteFetcher<TestAction> for StaleView {
    async fn get_branch(&self, name: &str) -> Result<Option<Branch>, RemoteError> {
        self.frozen.get_branch(name).await
    }

    async fn fetch(
        &self,
        name: &str,
        since: Option<&CommitHash>,
    ) -> Result<Vec<Arc<Commit<TestAction>>>, RemoteError> {
        self.frozen.fetch(name, since).await
    }

    async fn push(
        &self,
        commits: Vec<Arc<Commit<TestAction>>>,
        name: &str,
        new_head: &CommitHash,
    ) -> Result<(), RemoteError> {
        self.live.push(commits, name, new_head).await
    }
}

/// A remote whose network is down.
pub struct Offline;

#[async_trait]
impl RemoteFetcher<TestAction> for Offline {
    async fn get_branch(&self, _name: &str) -> Result<Option<Branch>, RemoteError> {
        Err(RemoteError::Transport {
            message: "connection refused".into(),
        })
    }

    async fn fetch(
        &self,
        _name: &str,
        _since: Option<&CommitHash>,
    ) -> Result<Vec<Arc<Commit<TestAction>>>, RemoteError> {
        Err(RemoteError::Transport {
            message: "connection refused".into(),
        })
    }

    async fn push(
        &self,
        _commits: Vec<Arc<Commit<TestAction>>>,
        _name: &str,
        _new_head: &CommitHash,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Transport {
            message: "connection refused".into(),
        })
    }
}
