//! A counter state and arithmetic actions for exercising the graph.
//!
//! Enabled for this crate's own tests and, through the `testkit` feature, for
//! downstream tests and benches.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// A single integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestState {
    /// Current value.
    pub value: i64,
}

/// Arithmetic on [`TestState::value`]. Overflow wraps; division by zero is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "operand", rename_all = "snake_case")]
pub enum TestAction {
    /// Replace the value.
    Set(i64),
    /// Add to the value.
    Add(i64),
    /// Subtract from the value.
    Subtract(i64),
    /// Multiply the value.
    Multiply(i64),
    /// Divide the value.
    Divide(i64),
}

impl Action for TestAction {
    type State = TestState;

    fn apply(&self, state: &TestState) -> TestState {
        let value = match *self {
            Self::Set(v) => v,
            Self::Add(v) => state.value.wrapping_add(v),
            Self::Subtract(v) => state.value.wrapping_sub(v),
            Self::Multiply(v) => state.value.wrapping_mul(v),
            Self::Divide(v) => state.value.checked_div(v).unwrap_or(state.value),
        };
        TestState { value }
    }
}
