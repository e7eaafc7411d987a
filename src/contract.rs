// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Contracts: a predicate plus what to say when it fails.
//!
//! | Contract       | Checked                     | Failure                          |
//! |----------------|-----------------------------|----------------------------------|
//! | `Condition`    | before or after one method  | `ContractError::Condition`       |
//! | `Invariant`    | after every method          | `ContractError::Invariant`       |
//!
//! Contracts are built while a type's registry is being declared and never
//! change afterwards.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

use crate::context::EvalContext;
use crate::error::{ContractError, Timing};

/// A boolean check over an evaluation context.
pub type Predicate<T> = Box<dyn Fn(&EvalContext<'_, T>) -> bool + Send + Sync>;

/// Something that can be enforced against an [`EvalContext`].
pub trait Contract<T> {
    /// `Ok(())` if the predicate holds, the matching violation otherwise.
    fn enforce(&self, ctx: &EvalContext<'_, T>) -> Result<(), ContractError>;

    /// Source text of the predicate, used in violation messages.
    fn clause(&self) -> &str;
}

/// A precondition or postcondition guarding a single method.
pub struct Condition<T> {
    timing: Timing,
    clause: Cow<'static, str>,
    method: Option<&'static str>,
    predicate: Predicate<T>,
}

impl<T> Condition<T> {
    pub fn new(
        timing: Timing,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Condition {
            timing,
            clause: clause.into(),
            method: None,
            predicate: Box::new(predicate),
        }
    }

    pub fn pre(
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(Timing::Pre, clause, predicate)
    }

    pub fn post(
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(Timing::Post, clause, predicate)
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// The method this condition was bound to, `None` while it is still staged.
    pub fn method(&self) -> Option<&'static str> {
        self.method
    }

    pub(crate) fn bind(&mut self, method: &'static str) {
        self.method = Some(method);
    }
}

impl<T> Contract<T> for Condition<T> {
    fn enforce(&self, ctx: &EvalContext<'_, T>) -> Result<(), ContractError> {
        if (self.predicate)(ctx) {
            return Ok(());
        }
        Err(ContractError::Condition {
            timing: self.timing,
            class: type_name::<T>(),
            method: self.method.unwrap_or(ctx.method()),
            clause: self.clause.clone(),
        })
    }

    fn clause(&self) -> &str {
        &self.clause
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("timing", &self.timing)
            .field("clause", &self.clause)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// A property of the whole instance, checked after every instrumented method
/// returns (constructors included).
pub struct Invariant<T> {
    index: usize,
    clause: Cow<'static, str>,
    predicate: Predicate<T>,
}

impl<T> Invariant<T> {
    /// `index` is the invariant's position among its type's invariants.
    pub fn new(
        index: usize,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Invariant {
            index,
            clause: clause.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Contract<T> for Invariant<T> {
    fn enforce(&self, ctx: &EvalContext<'_, T>) -> Result<(), ContractError> {
        if (self.predicate)(ctx) {
            return Ok(());
        }
        Err(ContractError::Invariant {
            class: type_name::<T>(),
            method: ctx.method(),
            index: self.index,
            clause: self.clause.clone(),
        })
    }

    fn clause(&self) -> &str {
        &self.clause
    }
}

impl<T> fmt::Debug for Invariant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invariant")
            .field("index", &self.index)
            .field("clause", &self.clause)
            .finish_non_exhaustive()
    }
}
