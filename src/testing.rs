// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.

#![doc(hidden)]

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{ContractError, ViolationKind};

/// A call counter that proves whether a method body ran.
///
/// Clones share the same count, so a test keeps one handle and gives another
/// to the object under test.
#[derive(Clone, Default)]
pub struct Witness {
    calls: Arc<AtomicUsize>,
}

impl Witness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness").field("calls", &self.calls()).finish()
    }
}

/// Run `f` and return the contract violation it raised.
///
/// # Panics
/// Panics if `f` completes without a violation.
#[track_caller]
pub fn expect_violation<R>(f: impl FnOnce() -> R) -> ContractError {
    match crate::catch(f) {
        Ok(_) => panic!("expected a contract violation, but the call succeeded"),
        Err(violation) => violation,
    }
}

/// Run `f` and assert it raised a violation of `kind`.
#[track_caller]
pub fn assert_violation<R>(kind: ViolationKind, f: impl FnOnce() -> R) -> ContractError {
    let violation = expect_violation(f);
    assert_eq!(
        violation.kind(),
        kind,
        "expected a {:?} violation, got: {}",
        kind,
        violation
    );
    violation
}

/// Run `f` and assert it completed without a contract violation.
#[track_caller]
pub fn assert_no_violation<R>(f: impl FnOnce() -> R) -> R {
    match crate::catch(f) {
        Ok(value) => value,
        Err(violation) => panic!("unexpected contract violation: {}", violation),
    }
}
