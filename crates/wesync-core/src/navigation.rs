//! Graph walks over a [`Workspace`].
//!
//! - [`ancestor_closure`]: everything reachable through parent links.
//! - [`primary_parent_chain`]: the first-parent line from a commit to the root.
//! - [`topological_order`]: an append-safe ordering of a set of commits.
//!
//! All walks are iterative, so history depth never touches the call stack.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use crate::action::Action;
use crate::commit::Commit;
use crate::hash::CommitHash;
use crate::workspace::{Workspace, WorkspaceError};

/// Predicate marking commits a walk must not enter.
pub type StopAt<'p, A> = Option<&'p dyn Fn(&Commit<A>) -> bool>;

/// Hashes reachable from `hash` by following parents, `hash` included.
///
/// A commit matching `stop` is neither included nor walked through. If
/// `hash` itself matches, the result is empty.
///
/// # Errors
/// [`WorkspaceError::CommitNotFound`] if the walk meets an absent hash.
pub fn ancestor_closure<A: Action>(
    ws: &Workspace<A>,
    hash: &CommitHash,
    stop: StopAt<'_, A>,
) -> Result<BTreeSet<CommitHash>, WorkspaceError> {
    let stopped = |commit: &Commit<A>| stop.is_some_and(|pred| pred(commit));

    let mut closure = BTreeSet::new();
    if stopped(ws.get_commit(hash)?.as_ref()) {
        return Ok(closure);
    }

    let mut queue = VecDeque::from([hash.clone()]);
    closure.insert(hash.clone());

    while let Some(current) = queue.pop_front() {
        let commit = ws.get_commit(&current)?;
        for parent in commit.parents() {
            if closure.contains(parent) {
                continue;
            }
            if stopped(ws.get_commit(parent)?.as_ref()) {
                continue;
            }
            closure.insert(parent.clone());
            queue.push_back(parent.clone());
        }
    }

    Ok(closure)
}

/// Commits on the primary-parent line from `hash` back toward the root,
/// newest first.
///
/// The walk ends before the first commit matching `stop`, or after the
/// initial commit.
///
/// # Errors
/// [`WorkspaceError::CommitNotFound`] if the walk meets an absent hash.
pub fn primary_parent_chain<A: Action>(
    ws: &Workspace<A>,
    hash: &CommitHash,
    stop: StopAt<'_, A>,
) -> Result<Vec<Arc<Commit<A>>>, WorkspaceError> {
    let mut chain = Vec::new();
    let mut next = Some(hash.clone());

    while let Some(current) = next {
        let commit = ws.get_commit(&current)?;
        if stop.is_some_and(|pred| pred(commit.as_ref())) {
            break;
        }
        next = commit.primary_parent().cloned();
        chain.push(commit);
    }

    Ok(chain)
}

/// Returns `true` if `ancestor` is `descendant` or one of its ancestors.
///
/// # Errors
/// [`WorkspaceError::CommitNotFound`] if `descendant`'s history is incomplete.
pub fn is_ancestor<A: Action>(
    ws: &Workspace<A>,
    ancestor: &CommitHash,
    descendant: &CommitHash,
) -> Result<bool, WorkspaceError> {
    Ok(ancestor_closure(ws, descendant, None)?.contains(ancestor))
}

/// The commits named by `hashes`, ordered so that each one comes after every
/// parent and revert target that is also in `hashes`.
///
/// Feeding the result to [`Workspace::add_commits`] on a store that already
/// holds everything outside `hashes` always succeeds. Ties break by hash, so
/// the order is deterministic.
///
/// # Errors
/// [`WorkspaceError::CommitNotFound`] if any hash is absent.
pub fn topological_order<A: Action>(
    ws: &Workspace<A>,
    hashes: &BTreeSet<CommitHash>,
) -> Result<Vec<Arc<Commit<A>>>, WorkspaceError> {
    let mut ordered = Vec::with_capacity(hashes.len());
    let mut placed: HashSet<CommitHash> = HashSet::with_capacity(hashes.len());

    for start in hashes {
        let mut stack = vec![(start.clone(), false)];
        while let Some((current, expanded)) = stack.pop() {
            if placed.contains(&current) {
                continue;
            }
            let commit = ws.get_commit(&current)?;
            if expanded {
                placed.insert(current);
                ordered.push(commit);
                continue;
            }
            stack.push((current, true));
            for dep in commit.references() {
                if hashes.contains(dep) && !placed.contains(dep) {
                    stack.push((dep.clone(), false));
                }
            }
        }
    }

    Ok(ordered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
