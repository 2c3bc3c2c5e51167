//! Integration tests for branch synchronization between replicas.

#![allow(clippy::all, clippy::pedantic, clippy::nursery, clippy::unwrap_used)]

mod common;

use common::{
    Offline, Remote, StaleView, head, record, remote_head, replica, sync_conflict, sync_ok, value,
};
use wesync::testkit::TestAction::{Add, Set};
use wesync::{
    Branch, BranchSynchronizer, Divergence, MAIN_BRANCH, RemoteError, SyncAction, SyncError,
    WorkspaceManipulator, get_differences,
};

// ---------------------------------------------------------------------------
// The four classification paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_remote_branch_is_created() {
    let remote = Remote::empty();
    let local = record(&replica(5), &[Add(1)]);

    let (synced, action) = sync_ok(&remote, &local).await;

    assert_eq!(action, SyncAction::Created);
    assert_eq!(remote_head(&synced), Some(head(&local)));
    let served = remote.workspace().await;
    assert_eq!(served.head(MAIN_BRANCH).unwrap(), &head(&local));
    assert_eq!(served.len(), 2);
}

#[tokio::test]
async fn agreeing_replicas_are_up_to_date() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;

    let b = replica(5);
    let (b, action) = sync_ok(&remote, &b).await;

    assert_eq!(action, SyncAction::UpToDate);
    assert_eq!(head(&b), head(&a));
    assert_eq!(value(&b), 5);

    let (again, action) = sync_ok(&remote, &a).await;
    assert_eq!(action, SyncAction::UpToDate);
    assert_eq!(again, a);
}

#[tokio::test]
async fn local_commit_is_pushed() {
    let remote = Remote::empty();
    let (base, _) = sync_ok(&remote, &replica(5)).await;
    let local = record(&base, &[Set(6)]);

    let (synced, action) = sync_ok(&remote, &local).await;

    assert_eq!(action, SyncAction::Pushed);
    assert_eq!(remote_head(&synced), Some(head(&local)));
    assert_eq!(value(&synced), 6);
    let served = remote.workspace().await;
    assert_eq!(served.branch_state(MAIN_BRANCH).unwrap().value, 6);
}

#[tokio::test]
async fn remote_commit_is_fast_forwarded() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;
    let (b, _) = sync_ok(&remote, &replica(5)).await;

    let (a, _) = sync_ok(&remote, &record(&a, &[Set(6), Add(4)])).await;
    let (b, action) = sync_ok(&remote, &b).await;

    assert_eq!(action, SyncAction::FastForwarded);
    assert_eq!(head(&b), head(&a));
    assert_eq!(value(&b), 10);
}

#[tokio::test]
async fn concurrent_edits_conflict() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;
    let (b, _) = sync_ok(&remote, &replica(5)).await;

    sync_ok(&remote, &record(&a, &[Set(6)])).await;
    let conflict = sync_conflict(&remote, &record(&b, &[Set(7)])).await;

    assert_eq!(conflict.local_state().unwrap().value, 7);
    assert_eq!(conflict.remote_state().unwrap().value, 6);
    assert_eq!(conflict.branch(), MAIN_BRANCH);
    let differences = get_differences(conflict.workspace(), MAIN_BRANCH).unwrap();
    assert_eq!(differences.divergence(), Divergence::Diverged);
    assert_eq!(differences.local_difference.len(), 1);
    assert_eq!(differences.remote_difference.len(), 1);
}

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn take_local_then_resync_pushes_merge() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;
    let (b, _) = sync_ok(&remote, &replica(5)).await;
    let (a, _) = sync_ok(&remote, &record(&a, &[Set(6)])).await;

    let conflict = sync_conflict(&remote, &record(&b, &[Set(7)])).await;
    let resolved = conflict.take_local().unwrap();
    assert_eq!(value(&resolved), 7);

    let (b, action) = sync_ok(&remote, &resolved).await;
    assert_eq!(action, SyncAction::Pushed);

    let (a, action) = sync_ok(&remote, &a).await;
    assert_eq!(action, SyncAction::FastForwarded);
    assert_eq!(head(&a), head(&b));
    assert_eq!(value(&a), 7);
}

#[tokio::test]
async fn take_remote_adopts_remote_state() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;
    let (b, _) = sync_ok(&remote, &replica(5)).await;
    sync_ok(&remote, &record(&a, &[Set(6)])).await;

    let conflict = sync_conflict(&remote, &record(&b, &[Set(7)])).await;
    let resolved = conflict.take_remote().unwrap();
    assert_eq!(value(&resolved), 6);

    let (synced, action) = sync_ok(&remote, &resolved).await;
    assert_eq!(action, SyncAction::Pushed);
    assert_eq!(remote.workspace().await.branch_state(MAIN_BRANCH).unwrap().value, 6);
    assert_eq!(value(&synced), 6);
}

#[tokio::test]
async fn undo_after_resolution_reaches_remote() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(0)).await;
    let a = record(&a, &[Set(1), Set(2)]);
    let undone = WorkspaceManipulator::new(a).undo().unwrap().into_workspace();
    assert_eq!(value(&undone), 1);

    let (_, action) = sync_ok(&remote, &undone).await;
    assert_eq!(action, SyncAction::Pushed);

    let (b, _) = sync_ok(&remote, &replica(0)).await;
    assert_eq!(value(&b), 1);
    let redone = WorkspaceManipulator::new(b).redo().unwrap().into_workspace();
    assert_eq!(value(&redone), 2);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_local_branch_is_fatal() {
    let remote = Remote::empty();
    let ws = replica(5);
    let err = BranchSynchronizer::new(&remote)
        .synchronize(&ws, "drafts")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingLocalBranch { ref name } if name == "drafts"));
    assert!(remote.workspace().await.is_empty(), "nothing may be pushed");
}

#[tokio::test]
async fn other_branches_sync_independently() {
    let remote = Remote::empty();
    let ws = replica(5);
    let root = head(&ws);
    let ws = ws.with_branch(Branch::local("drafts", root)).unwrap();
    let drafts = WorkspaceManipulator::new(ws)
        .on_branch("drafts")
        .apply(Set(9))
        .unwrap()
        .into_workspace();

    let outcome = BranchSynchronizer::new(&remote)
        .synchronize(&drafts, "drafts")
        .await
        .unwrap();
    assert!(!outcome.is_conflict());

    let served = remote.workspace().await;
    assert_eq!(served.branch_state("drafts").unwrap().value, 9);
    assert!(served.head(MAIN_BRANCH).is_err());
}

#[tokio::test]
async fn stale_push_is_rejected_by_remote() {
    let remote = Remote::empty();
    let (a, _) = sync_ok(&remote, &replica(5)).await;
    let (b, _) = sync_ok(&remote, &replica(5)).await;

    let stale = StaleView::of(remote).await;
    sync_ok(&stale.live, &record(&a, &[Set(6)])).await;

    let b = record(&b, &[Set(7)]);
    let err = BranchSynchronizer::new(&stale)
        .synchronize(&b, MAIN_BRANCH)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Remote(RemoteError::NonFastForward { .. })
    ));

    // A fresh view of the same remote surfaces the real conflict.
    let conflict = sync_conflict(&stale.live, &b).await;
    assert_eq!(conflict.remote_state().unwrap().value, 6);
}

#[tokio::test]
async fn transport_failure_propagates_unchanged() {
    let err = BranchSynchronizer::new(&Offline)
        .synchronize(&replica(5), MAIN_BRANCH)
        .await
        .unwrap_err();
    match err {
        SyncError::Remote(RemoteError::Transport { message }) => {
            assert_eq!(message, "connection refused");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn foreign_root_is_an_integrity_error() {
    let remote = Remote::empty();
    sync_ok(&remote, &replica(5)).await;

    let err = BranchSynchronizer::new(&remote)
        .synchronize(&replica(99), MAIN_BRANCH)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Workspace(_)), "got {err}");
}

#[tokio::test]
async fn explicit_push_requires_local_ahead() {
    let remote = Remote::empty();
    let (ws, _) = sync_ok(&remote, &replica(5)).await;
    let sync = BranchSynchronizer::new(&remote);

    let err = sync.push(&ws, MAIN_BRANCH).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::LocalNotAhead {
            divergence: Divergence::UpToDate,
            ..
        }
    ));

    let ahead = record(&ws, &[Add(2)]);
    let pushed = sync.push(&ahead, MAIN_BRANCH).await.unwrap();
    assert_eq!(remote_head(&pushed), Some(head(&ahead)));
}
