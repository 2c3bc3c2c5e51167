//! Local-only and remote-only commits for one branch.

use std::collections::BTreeSet;

use crate::action::Action;
use crate::hash::CommitHash;
use crate::navigation::ancestor_closure;
use crate::workspace::{Workspace, WorkspaceError};

/// How a local branch and its remote-tracking branch relate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Divergence {
    /// Same history on both sides.
    UpToDate,
    /// Only the remote has new commits.
    RemoteAhead,
    /// Only the local branch has new commits.
    LocalAhead,
    /// Both sides have commits the other lacks.
    Diverged,
}

/// The two one-sided differences between a branch's local and remote heads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Differences {
    /// Reachable from the local head but not the remote head.
    pub local_difference: BTreeSet<CommitHash>,
    /// Reachable from the remote head but not the local head.
    pub remote_difference: BTreeSet<CommitHash>,
}

impl Differences {
    /// Classify the pair.
    #[must_use]
    pub fn divergence(&self) -> Divergence {
        match (
            self.local_difference.is_empty(),
            self.remote_difference.is_empty(),
        ) {
            (true, true) => Divergence::UpToDate,
            (true, false) => Divergence::RemoteAhead,
            (false, true) => Divergence::LocalAhead,
            (false, false) => Divergence::Diverged,
        }
    }
}

/// Compare the local and remote heads of `branch`.
///
/// # Errors
/// [`BranchError::NotFound`](crate::BranchError::NotFound) if either side of
/// the branch is missing, or a lookup failure while walking history.
pub fn get_differences<A: Action>(
    ws: &Workspace<A>,
    branch: &str,
) -> Result<Differences, WorkspaceError> {
    let local_head = &ws.branches().get_local(branch)?.head;
    let remote_head = &ws.branches().get_remote(branch)?.head;

    let local = ancestor_closure(ws, local_head, None)?;
    let remote = ancestor_closure(ws, remote_head, None)?;

    Ok(Differences {
        local_difference: local.difference(&remote).cloned().collect(),
        remote_difference: remote.difference(&local).cloned().collect(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;
    use crate::branches::{Branch, MAIN_BRANCH};
    use crate::commit::{CommandCommit, Commit};
    use crate::testkit::{TestAction, TestState};

    type Ws = Workspace<TestAction>;

    fn extend(ws: &Ws, from: &CommitHash, n: i64) -> (Ws, CommitHash) {
        let mut ws = ws.clone();
        let mut head = from.clone();
        for i in 0..n {
            let c: Commit<TestAction> = CommandCommit::new(head.clone(), TestAction::Add(i + 1))
                .unwrap()
                .into();
            head = c.hash().clone();
            ws = ws.add_commit(c).unwrap();
        }
        (ws, head)
    }

    fn with_heads(ws: &Ws, local: &CommitHash, remote: &CommitHash) -> Ws {
        ws.with_branch(Branch::local(MAIN_BRANCH, local.clone()))
            .unwrap()
            .with_branch(Branch::remote(MAIN_BRANCH, remote.clone()))
            .unwrap()
    }

    #[test]
    fn same_heads_are_up_to_date() {
        let ws = Ws::new(TestState { value: 0 }).unwrap();
        let root = ws.initial_hash().unwrap().clone();
        let ws = with_heads(&ws, &root, &root);
        let diff = get_differences(&ws, MAIN_BRANCH).unwrap();
        assert_eq!(diff, Differences::default());
        assert_eq!(diff.divergence(), Divergence::UpToDate);
    }

    #[test]
    fn local_ahead() {
        let ws = Ws::new(TestState { value: 0 }).unwrap();
        let root = ws.initial_hash().unwrap().clone();
        let (ws, head) = extend(&ws, &root, 2);
        let ws = with_heads(&ws, &head, &root);
        let diff = get_differences(&ws, MAIN_BRANCH).unwrap();
        assert_eq!(diff.local_difference.len(), 2);
        assert!(diff.local_difference.contains(&head));
        assert_eq!(diff.divergence(), Divergence::LocalAhead);
    }

    #[test]
    fn remote_ahead() {
        let ws = Ws::new(TestState { value: 0 }).unwrap();
        let root = ws.initial_hash().unwrap().clone();
        let (ws, head) = extend(&ws, &root, 3);
        let ws = with_heads(&ws, &root, &head);
        let diff = get_differences(&ws, MAIN_BRANCH).unwrap();
        assert_eq!(diff.remote_difference.len(), 3);
        assert_eq!(diff.divergence(), Divergence::RemoteAhead);
    }

    #[test]
    fn both_sides_moved() {
        let ws = Ws::new(TestState { value: 0 }).unwrap();
        let root = ws.initial_hash().unwrap().clone();
        let (ws, local) = extend(&ws, &root, 1);
        let fork = CommandCommit::new(root, TestAction::Set(9)).unwrap();
        let remote = fork.hash().clone();
        let ws = ws.add_commit(Commit::Command(fork)).unwrap();
        let ws = with_heads(&ws, &local, &remote);
        let diff = get_differences(&ws, MAIN_BRANCH).unwrap();
        assert_eq!(diff.local_difference, BTreeSet::from([local]));
        assert_eq!(diff.remote_difference, BTreeSet::from([remote]));
        assert_eq!(diff.divergence(), Divergence::Diverged);
    }

    #[test]
    fn missing_remote_branch_is_an_error() {
        let ws = Ws::new(TestState { value: 0 }).unwrap();
        assert!(matches!(
            get_differences(&ws, MAIN_BRANCH),
            Err(WorkspaceError::Branch(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Property tests
    // -----------------------------------------------------------------------

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Each difference is disjoint from the other side's history, and
            /// both are empty exactly when the heads share a closure.
            #[test]
            fn prop_differences_are_one_sided(shared in 0_i64..6, left in 0_i64..6, right in 0_i64..6) {
                let ws = Ws::new(TestState { value: 0 }).unwrap();
                let root = ws.initial_hash().unwrap().clone();
                let (ws, base) = extend(&ws, &root, shared);
                let (ws, local) = extend(&ws, &base, left);
                let fork = Commit::Command(CommandCommit::new(base.clone(), TestAction::Set(-1)).unwrap());
                let (ws, remote) = if right == 0 {
                    (ws, base.clone())
                } else {
                    let fork_hash = fork.hash().clone();
                    let ws = ws.add_commit(fork).unwrap();
                    extend(&ws, &fork_hash, right - 1)
                };
                let ws = with_heads(&ws, &local, &remote);
                let diff = get_differences(&ws, MAIN_BRANCH).unwrap();

                let local_closure = ancestor_closure(&ws, &local, None).unwrap();
                let remote_closure = ancestor_closure(&ws, &remote, None).unwrap();
                prop_assert!(diff.local_difference.is_disjoint(&remote_closure));
                prop_assert!(diff.remote_difference.is_disjoint(&local_closure));
                prop_assert_eq!(diff.local_difference.len() as i64, left);
                prop_assert_eq!(diff.remote_difference.len() as i64, right);
                prop_assert_eq!(
                    diff.divergence() == Divergence::UpToDate,
                    local_closure == remote_closure
                );
            }
        }
    }
}
