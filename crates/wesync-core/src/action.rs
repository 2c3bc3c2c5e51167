//! The contract between the commit graph and application state.
//!
//! The graph never inspects state or actions. It only needs to:
//!
//! - replay an action over the state it was recorded against ([`Action::apply`]);
//! - turn both into a plain snapshot for hashing and persistence, and back.
//!
//! The snapshot half of the contract is serde: any `Serialize +
//! DeserializeOwned` type qualifies. Serialization must be a pure function of
//! the value, since it feeds [`CommitHash::of`](crate::CommitHash::of).

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A replayable user action over some application state.
///
/// `apply` must be deterministic: the same action applied to equal states
/// yields equal states on every replica, otherwise replay diverges.
pub trait Action: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The state this action transforms.
    type State: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Produce the state that follows `state` once this action has run.
    fn apply(&self, state: &Self::State) -> Self::State;
}
