//! A remote backed by a [`Workspace`] behind an async lock.
//!
//! Remote branches are stored as the backing workspace's *local* branches;
//! from the remote's point of view they are the branches it owns.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use tracing::debug;
use wesync_core::{
    Action, Branch, BranchKind, Commit, CommitHash, Workspace, ancestor_closure, is_ancestor,
    topological_order,
};

use super::{RemoteError, RemoteFetcher};

/// An in-process [`RemoteFetcher`].
#[derive(Debug)]
pub struct InMemoryRemote<A: Action> {
    store: RwLock<Workspace<A>>,
}

impl<A: Action> InMemoryRemote<A> {
    /// A remote serving `workspace`'s local branches.
    #[must_use]
    pub fn new(workspace: Workspace<A>) -> Self {
        Self {
            store: RwLock::new(workspace),
        }
    }

    /// A remote with no history and no branches.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Workspace::empty())
    }

    /// A copy of the backing workspace as it is right now.
    pub async fn workspace(&self) -> Workspace<A> {
        self.store.read().await.clone()
    }
}

#[async_trait]
impl<A: Action> RemoteFetcher<A> for InMemoryRemote<A> {
    async fn get_branch(&self, name: &str) -> Result<Option<Branch>, RemoteError> {
        let store = self.store.read().await;
        Ok(store
            .branches()
            .find(BranchKind::Local, name)
            .map(|b| Branch::remote(name, b.head.clone())))
    }

    async fn fetch(
        &self,
        name: &str,
        since: Option<&CommitHash>,
    ) -> Result<Vec<Arc<Commit<A>>>, RemoteError> {
        let store = self.store.read().await;
        let head = &store
            .branches()
            .find(BranchKind::Local, name)
            .ok_or_else(|| RemoteError::BranchNotFound {
                name: name.to_owned(),
            })?
            .head;

        let mut wanted = ancestor_closure(&store, head, None)?;
        if let Some(since) = since.filter(|h| store.has_commit(h)) {
            let known = ancestor_closure(&store, since, None)?;
            wanted = wanted.difference(&known).cloned().collect::<BTreeSet<_>>();
        }

        debug!(branch = name, commits = wanted.len(), "serving fetch");
        Ok(topological_order(&store, &wanted)?)
    }

    async fn push(
        &self,
        commits: Vec<Arc<Commit<A>>>,
        name: &str,
        new_head: &CommitHash,
    ) -> Result<(), RemoteError> {
        let mut store = self.store.write().await;

        let staged = store.add_commits(commits.into_iter().filter(|c| !store.has_commit(c.hash())))?;
        if !staged.has_commit(new_head) {
            return Err(RemoteError::MissingHead {
                name: name.to_owned(),
                head: new_head.clone(),
            });
        }
        if let Some(current) = staged.branches().find(BranchKind::Local, name)
            && !is_ancestor(&staged, &current.head, new_head)?
        {
            return Err(RemoteError::NonFastForward {
                name: name.to_owned(),
                current: current.head.clone(),
                proposed: new_head.clone(),
            });
        }

        let staged = staged.with_branch(Branch::local(name, new_head.clone()))?;
        debug!(branch = name, head = %new_head.short(), commits = staged.len() - store.len(), "accepted push");
        *store = staged;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
