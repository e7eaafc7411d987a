// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Contract violations.
//!
//! Every failed check produces a [`ContractError`]. It is a closed enum, so
//! callers that care about the difference between a broken condition and a
//! broken invariant can match on it exhaustively; callers that don't can treat
//! it as "a contract failed".
//!
//! Generated method wrappers cannot change the method's return type, so they
//! surface a violation by unwinding with the error as the panic payload
//! ([`ContractError::raise`]). [`catch`] turns that back into a value.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// When a condition is checked relative to the method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    /// Before the body runs. A failure means the body never executes.
    Pre,
    /// After the body returns, with access to the return value.
    Post,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timing::Pre => f.write_str("precondition"),
            Timing::Post => f.write_str("postcondition"),
        }
    }
}

/// Discriminant of [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Condition,
    Invariant,
}

/// A contract predicate evaluated to `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// A precondition or postcondition of `class::method` failed.
    #[error("{timing} of `{class}::{method}` failed: {clause}")]
    Condition {
        timing: Timing,
        class: &'static str,
        method: &'static str,
        clause: Cow<'static, str>,
    },

    /// Invariant number `index` (declaration order) of `class` failed after
    /// `method` returned.
    #[error("invariant #{index} of `{class}` failed after `{method}`: {clause}")]
    Invariant {
        class: &'static str,
        method: &'static str,
        index: usize,
        clause: Cow<'static, str>,
    },
}

impl ContractError {
    pub fn kind(&self) -> ViolationKind {
        match self {
            ContractError::Condition { .. } => ViolationKind::Condition,
            ContractError::Invariant { .. } => ViolationKind::Invariant,
        }
    }

    /// `Some(timing)` for condition failures, `None` for invariants.
    pub fn timing(&self) -> Option<Timing> {
        match self {
            ContractError::Condition { timing, .. } => Some(*timing),
            ContractError::Invariant { .. } => None,
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            ContractError::Condition { class, .. } | ContractError::Invariant { class, .. } => *class,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            ContractError::Condition { method, .. } | ContractError::Invariant { method, .. } => {
                *method
            }
        }
    }

    /// Source text of the predicate that failed.
    pub fn clause(&self) -> &str {
        match self {
            ContractError::Condition { clause, .. } | ContractError::Invariant { clause, .. } => {
                clause
            }
        }
    }

    pub fn is_precondition(&self) -> bool {
        self.timing() == Some(Timing::Pre)
    }

    pub fn is_postcondition(&self) -> bool {
        self.timing() == Some(Timing::Post)
    }

    pub fn is_invariant(&self) -> bool {
        self.kind() == ViolationKind::Invariant
    }

    /// Abort the current call by unwinding with `self` as the payload.
    ///
    /// The caller sees an ordinary panic unless it wraps the call in [`catch`].
    pub fn raise(self) -> ! {
        tracing::debug!(
            class = self.class(),
            method = self.method(),
            kind = ?self.kind(),
            "contract violated: {}",
            self
        );
        panic::panic_any(self)
    }
}

/// Run `f`, converting a raised [`ContractError`] into `Err`.
///
/// Panics that did not come from a contract keep unwinding.
///
/// ```ignore
/// let result = pacta::catch(|| tally.add(20));
/// assert!(matches!(result, Err(e) if e.is_invariant()));
/// ```
pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, ContractError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<ContractError>() {
            Ok(violation) => Err(*violation),
            Err(other) => panic::resume_unwind(other),
        },
    }
}
