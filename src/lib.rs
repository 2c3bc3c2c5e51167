//! Offline-first branch synchronization for replayable application state.
//!
//! The commit graph, state replay and undo/redo live in [`wesync_core`] and
//! are re-exported here. This crate adds the asynchronous half:
//!
//! - [`remote`]: the [`RemoteFetcher`] boundary and an in-memory remote.
//! - [`sync`]: [`BranchSynchronizer`], which fast-forwards, pushes, or hands
//!   back a [`SyncConflict`] to resolve.
//! - [`config`] and [`telemetry`]: TOML settings and log setup for hosts.

pub mod config;
pub mod remote;
pub mod sync;
pub mod telemetry;

pub use config::{ConfigError, WesyncConfig};
pub use remote::{InMemoryRemote, RemoteError, RemoteFetcher};
pub use sync::{
    BranchSynchronizer, SyncAction, SyncConflict, SyncError, SyncOutcome, fast_forward,
};
pub use wesync_core::*;
