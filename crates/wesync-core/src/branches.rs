//! Branch pointers and the two-namespace branch registry.
//!
//! Local and remote branches live in separate namespaces, so `main` can exist
//! as both a local branch and the last known position of the remote `main`.
//! The registry is a persistent value: every edit returns a new registry and
//! leaves the old one untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::CommitHash;

/// Name of the branch created with every new workspace.
pub const MAIN_BRANCH: &str = "main";

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

/// Which namespace a branch belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    /// A branch edited on this replica.
    Local,
    /// This replica's record of where the remote branch was last seen.
    Remote,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// A named pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    /// Namespace.
    pub kind: BranchKind,
    /// Branch name.
    pub name: String,
    /// The commit this branch points at.
    pub head: CommitHash,
}

impl Branch {
    /// A local branch.
    #[must_use]
    pub fn local(name: impl Into<String>, head: CommitHash) -> Self {
        Self {
            kind: BranchKind::Local,
            name: name.into(),
            head,
        }
    }

    /// A remote-tracking branch.
    #[must_use]
    pub fn remote(name: impl Into<String>, head: CommitHash) -> Self {
        Self {
            kind: BranchKind::Remote,
            name: name.into(),
            head,
        }
    }

    /// The same branch pointing at `head`.
    #[must_use]
    pub fn with_head(&self, head: CommitHash) -> Self {
        Self {
            kind: self.kind,
            name: self.name.clone(),
            head,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.kind, self.name, self.head.short())
    }
}

/// Branch lookups and edits that did not match the registry contents.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BranchError {
    /// No branch with this name in this namespace.
    #[error("{kind} branch '{name}' not found")]
    NotFound {
        /// Namespace searched.
        kind: BranchKind,
        /// Name searched for.
        name: String,
    },

    /// `add` on a name that is already taken.
    #[error("{kind} branch '{name}' already exists")]
    AlreadyExists {
        /// Namespace.
        kind: BranchKind,
        /// Name that collided.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Local and remote branch pointers, keyed by name within each namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Branches {
    local: im::OrdMap<String, Branch>,
    remote: im::OrdMap<String, Branch>,
}

impl Branches {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn namespace(&self, kind: BranchKind) -> &im::OrdMap<String, Branch> {
        match kind {
            BranchKind::Local => &self.local,
            BranchKind::Remote => &self.remote,
        }
    }

    fn namespace_mut(&mut self, kind: BranchKind) -> &mut im::OrdMap<String, Branch> {
        match kind {
            BranchKind::Local => &mut self.local,
            BranchKind::Remote => &mut self.remote,
        }
    }

    /// Look up a branch, returning `None` if absent.
    #[must_use]
    pub fn find(&self, kind: BranchKind, name: &str) -> Option<&Branch> {
        self.namespace(kind).get(name)
    }

    /// Look up a branch.
    ///
    /// # Errors
    /// [`BranchError::NotFound`] if absent.
    pub fn get(&self, kind: BranchKind, name: &str) -> Result<&Branch, BranchError> {
        self.find(kind, name).ok_or_else(|| BranchError::NotFound {
            kind,
            name: name.to_owned(),
        })
    }

    /// Look up a local branch.
    ///
    /// # Errors
    /// [`BranchError::NotFound`] if absent.
    pub fn get_local(&self, name: &str) -> Result<&Branch, BranchError> {
        self.get(BranchKind::Local, name)
    }

    /// Look up a remote-tracking branch.
    ///
    /// # Errors
    /// [`BranchError::NotFound`] if absent.
    pub fn get_remote(&self, name: &str) -> Result<&Branch, BranchError> {
        self.get(BranchKind::Remote, name)
    }

    /// Returns `true` if a local branch with this name exists.
    #[must_use]
    pub fn contains_local(&self, name: &str) -> bool {
        self.local.contains_key(name)
    }

    /// Returns `true` if a remote-tracking branch with this name exists.
    #[must_use]
    pub fn contains_remote(&self, name: &str) -> bool {
        self.remote.contains_key(name)
    }

    /// Insert or replace `branch` in its namespace.
    #[must_use]
    pub fn upsert(&self, branch: Branch) -> Self {
        let mut next = self.clone();
        next.namespace_mut(branch.kind)
            .insert(branch.name.clone(), branch);
        next
    }

    /// Insert a branch whose name is not yet taken.
    ///
    /// # Errors
    /// [`BranchError::AlreadyExists`] if the name is taken in that namespace.
    pub fn add(&self, branch: Branch) -> Result<Self, BranchError> {
        if self.find(branch.kind, &branch.name).is_some() {
            return Err(BranchError::AlreadyExists {
                kind: branch.kind,
                name: branch.name,
            });
        }
        Ok(self.upsert(branch))
    }

    /// Replace a branch that already exists.
    ///
    /// # Errors
    /// [`BranchError::NotFound`] if there is nothing to replace.
    pub fn update(&self, branch: Branch) -> Result<Self, BranchError> {
        self.get(branch.kind, &branch.name)?;
        Ok(self.upsert(branch))
    }

    /// All branches, locals first, each namespace in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.local.values().chain(self.remote.values())
    }

    /// Number of branches across both namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.remote.len()
    }

    /// Returns `true` if neither namespace has a branch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.remote.is_empty()
    }
}

impl FromIterator<Branch> for Branches {
    fn from_iter<I: IntoIterator<Item = Branch>>(iter: I) -> Self {
        let mut branches = Self::new();
        for branch in iter {
            branches
                .namespace_mut(branch.kind)
                .insert(branch.name.clone(), branch);
        }
        branches
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
