// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Call and return interception.
//!
//! Every instrumented method reports its call and its return here. The
//! interceptor decides which contracts apply and enforces them in a fixed
//! order:
//!
//! ```text
//! call    before hooks → precondition
//! body    (skipped if the precondition failed)
//! return  after hooks → invariants (declaration order) → postcondition
//! ```
//!
//! A call is ignored when its type is not contract-enabled. Constructors have
//! no instance before they run, so they skip the call side entirely; their
//! return is checked against the value they built.
//!
//! Each frame is checked on its own. A method that delegates to an embedded
//! value's instrumented method triggers that type's checks when the delegated
//! call returns, and its own when it returns.
//!
//! Predicates and hooks may call instrumented methods (getters, helpers). Those
//! nested calls are not checked: the thread is already enforcing a contract,
//! and checking again would recurse.
//!
//! Generated wrappers use [`enter`] and [`leave`], which raise violations.
//! [`invoke`], [`invoke_mut`] and [`construct`] are the same protocol for
//! hand-instrumented methods and return violations as `Err`.

use std::any::{type_name, Any};
use std::cell::Cell;

use crate::config;
use crate::context::{ArgList, EvalContext};
use crate::contract::Contract;
use crate::error::ContractError;
use crate::registry::Contracted;

/// What kind of method a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Method,
    /// Builds the instance; exempt from preconditions and before hooks.
    Constructor,
}

/// One instrumented call: method name, kind and argument bindings.
#[derive(Debug)]
pub struct Frame<'a> {
    method: &'static str,
    kind: FrameKind,
    args: ArgList<'a>,
}

impl<'a> Frame<'a> {
    pub fn method(method: &'static str) -> Self {
        Frame {
            method,
            kind: FrameKind::Method,
            args: ArgList::new(),
        }
    }

    pub fn constructor(method: &'static str) -> Self {
        Frame {
            method,
            kind: FrameKind::Constructor,
            args: ArgList::new(),
        }
    }

    /// Bind an argument so predicates can see it under `name`.
    pub fn arg(mut self, name: &'static str, value: &'a dyn Any) -> Self {
        self.args.bind(name, value);
        self
    }

    pub fn name(&self) -> &'static str {
        self.method
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn args(&self) -> &ArgList<'a> {
        &self.args
    }
}

thread_local! {
    static ENFORCING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as busy enforcing; released on drop.
struct Enforcing;

impl Enforcing {
    /// `None` if the thread is already enforcing. Only the guard that set
    /// the flag may clear it, so no guard exists in that case.
    fn enter() -> Option<Enforcing> {
        ENFORCING.with(|flag| {
            if flag.replace(true) {
                None
            } else {
                Some(Enforcing)
            }
        })
    }
}

impl Drop for Enforcing {
    fn drop(&mut self) {
        ENFORCING.with(|flag| flag.set(false));
    }
}

/// Run the call-side checks for `frame` on `receiver`.
pub fn on_call<T: Contracted>(receiver: &T, frame: &Frame<'_>) -> Result<(), ContractError> {
    let registry = T::contracts();
    if !registry.is_enabled() || frame.kind == FrameKind::Constructor {
        return Ok(());
    }
    let Some(_enforcing) = Enforcing::enter() else {
        return Ok(());
    };

    let settings = config::current();
    let ctx = EvalContext::new(receiver, frame.method, frame.args.as_args());

    if settings.hooks {
        for hook in registry.hooks() {
            hook.before(&ctx);
        }
    }

    if settings.mode.checks_preconditions() {
        if let Some(pre) = registry.applicable_before(frame.method) {
            tracing::trace!(class = type_name::<T>(), method = frame.method, "checking precondition");
            pre.enforce(&ctx)?;
        }
    }
    Ok(())
}

/// Run the return-side checks for `frame`.
///
/// `receiver` is the instance after the body ran (for constructors, the value
/// they built) and `ret` the body's result when it can be observed.
pub fn on_return<T: Contracted>(
    receiver: &T,
    frame: &Frame<'_>,
    ret: Option<&dyn Any>,
) -> Result<(), ContractError> {
    let registry = T::contracts();
    if !registry.is_enabled() {
        return Ok(());
    }
    let Some(_enforcing) = Enforcing::enter() else {
        return Ok(());
    };

    let settings = config::current();
    let ctx = EvalContext::new(receiver, frame.method, frame.args.as_args()).with_return(ret);

    if settings.hooks {
        for hook in registry.hooks() {
            hook.after(&ctx);
        }
    }

    if settings.mode.checks_postconditions() {
        for contract in registry.applicable_after(frame.method) {
            tracing::trace!(
                class = type_name::<T>(),
                method = frame.method,
                clause = contract.clause(),
                "checking"
            );
            contract.enforce(&ctx)?;
        }
    }
    Ok(())
}

/// [`on_call`], raising any violation.
pub fn enter<T: Contracted>(receiver: &T, frame: &Frame<'_>) {
    if let Err(violation) = on_call(receiver, frame) {
        violation.raise();
    }
}

/// [`on_return`], raising any violation.
pub fn leave<T: Contracted>(receiver: &T, frame: &Frame<'_>, ret: Option<&dyn Any>) {
    if let Err(violation) = on_return(receiver, frame, ret) {
        violation.raise();
    }
}

/// Run `body` as the method described by `frame` on a shared receiver.
///
/// ```ignore
/// let frame = Frame::method("balance");
/// let balance = interceptor::invoke(&account, frame, |account| account.cents)?;
/// ```
pub fn invoke<T, R, F>(receiver: &T, frame: Frame<'_>, body: F) -> Result<R, ContractError>
where
    T: Contracted,
    R: Any,
    F: FnOnce(&T) -> R,
{
    on_call(receiver, &frame)?;
    let ret = body(receiver);
    on_return(receiver, &frame, Some(&ret as &dyn Any))?;
    Ok(ret)
}

/// Run `body` as the method described by `frame` on a unique receiver.
///
/// If a postcondition or invariant fails the body's changes stay in place;
/// only the violation is reported.
pub fn invoke_mut<T, R, F>(receiver: &mut T, frame: Frame<'_>, body: F) -> Result<R, ContractError>
where
    T: Contracted,
    R: Any,
    F: FnOnce(&mut T) -> R,
{
    on_call(&*receiver, &frame)?;
    let ret = body(&mut *receiver);
    on_return(&*receiver, &frame, Some(&ret as &dyn Any))?;
    Ok(ret)
}

/// Run `build` as the constructor described by `frame` and check the result.
pub fn construct<T, F>(frame: Frame<'_>, build: F) -> Result<T, ContractError>
where
    T: Contracted,
    F: FnOnce() -> T,
{
    let frame = Frame {
        kind: FrameKind::Constructor,
        ..frame
    };
    let value = build();
    on_return(&value, &frame, Some(&value as &dyn Any))?;
    Ok(value)
}
