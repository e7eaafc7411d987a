// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! What a predicate gets to look at.
//!
//! A contract predicate is written as if it lived inside the method: it reads
//! the instance, the call's arguments, and for postconditions the return value.
//! [`EvalContext`] is that view, built fresh for every enforcement and dropped
//! right after. It holds the receiver by shared reference, so a predicate can
//! read anything the method could but can't change the real object.
//!
//! Arguments are type-erased (`&dyn Any`) because one registry stores the
//! conditions of methods with different signatures. Generated code fetches them
//! back with the declared parameter type, so a lookup only fails when someone
//! hand-writes a predicate against the wrong name or type.

use std::any::Any;
use std::fmt;
use std::ops::Deref;

/// Named argument bindings of one call, in parameter order.
#[derive(Clone, Copy, Default)]
pub struct Args<'a> {
    bindings: &'a [(&'static str, &'a dyn Any)],
}

/// Owned storage behind [`Args`].
///
/// `Frame` builds one of these while recording a call; predicates only ever
/// see the borrowed [`Args`] view.
#[derive(Default)]
pub struct ArgList<'a> {
    bindings: Vec<(&'static str, &'a dyn Any)>,
}

impl<'a> ArgList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. A later binding with the same name shadows the earlier one.
    pub fn with(mut self, name: &'static str, value: &'a dyn Any) -> Self {
        self.bind(name, value);
        self
    }

    pub fn bind(&mut self, name: &'static str, value: &'a dyn Any) {
        self.bindings.push((name, value));
    }

    pub fn as_args(&self) -> Args<'_> {
        Args {
            bindings: &self.bindings,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> Args<'a> {
    /// No arguments.
    pub const EMPTY: Args<'static> = Args { bindings: &[] };

    /// Look up `name` and downcast it to `V`.
    ///
    /// Returns `None` if there is no such binding or it holds another type.
    pub fn get<V: Any>(&self, name: &str) -> Option<&'a V> {
        let bindings: &'a [(&'static str, &'a dyn Any)] = self.bindings;
        bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .and_then(|&(_, value)| value.downcast_ref::<V>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|(bound, _)| *bound == name)
    }

    /// Binding names in parameter order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + 'a {
        let bindings: &'a [(&'static str, &'a dyn Any)] = self.bindings;
        bindings.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for Args<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl fmt::Debug for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_args().fmt(f)
    }
}

/// Read-only view a predicate is evaluated against.
///
/// Derefs to the receiver, so `ctx.total` and `ctx.is_open()` read like code
/// inside the method. Arguments are reached with [`arg`](Self::arg), which
/// keeps them apart from instance members of the same name.
pub struct EvalContext<'a, T> {
    receiver: &'a T,
    method: &'static str,
    args: Args<'a>,
    ret: Option<&'a dyn Any>,
}

impl<'a, T> EvalContext<'a, T> {
    pub fn new(receiver: &'a T, method: &'static str, args: Args<'a>) -> Self {
        EvalContext {
            receiver,
            method,
            args,
            ret: None,
        }
    }

    /// Attach the method's return value (post-timed evaluation only).
    pub fn with_return(mut self, ret: Option<&'a dyn Any>) -> Self {
        self.ret = ret;
        self
    }

    pub fn receiver(&self) -> &'a T {
        self.receiver
    }

    /// Name of the method being checked.
    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn args(&self) -> Args<'a> {
        self.args
    }

    /// The argument bound to `name`, if present and of type `V`.
    pub fn arg<V: Any>(&self, name: &str) -> Option<&'a V> {
        self.args.get(name)
    }

    /// The return value, if this is a post-timed evaluation and it is a `V`.
    pub fn ret<V: Any>(&self) -> Option<&'a V> {
        self.ret.and_then(|ret| ret.downcast_ref::<V>())
    }

    pub fn has_return(&self) -> bool {
        self.ret.is_some()
    }

    /// Verdict for a predicate whose binding `name` could not be resolved.
    ///
    /// A predicate that can't see its inputs can't vouch for the call, so this
    /// counts as a failure.
    pub fn unbound(&self, name: &str) -> bool {
        tracing::warn!(
            class = std::any::type_name::<T>(),
            method = self.method,
            binding = name,
            available = ?self.args,
            "contract predicate refers to an unbound value"
        );
        false
    }
}

impl<T> Deref for EvalContext<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.receiver
    }
}

impl<T> Clone for EvalContext<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EvalContext<'_, T> {}

impl<T> fmt::Debug for EvalContext<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("class", &std::any::type_name::<T>())
            .field("method", &self.method)
            .field("args", &self.args)
            .field("has_return", &self.ret.is_some())
            .finish()
    }
}
