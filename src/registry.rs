// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Per-type contract registry.
//!
//! One [`ContractRegistry`] exists per contract-enabled type. It is filled once
//! by [`Contracted::declare`] and then only read, for the rest of the process.
//!
//! # Declaration protocol
//!
//! Declarations are replayed in source order:
//!
//! ```text
//! register_invariant(..)            invariants, any time
//! stage_precondition(..)            ┐
//! stage_postcondition(..)           │ staged for the *next* method
//! on_method_defined("withdraw")     ┘ consumed here, slots cleared
//! on_method_defined("balance")      no staged conditions: empty entry
//! ```
//!
//! A second `stage_*` before the same definition replaces the first. Staged
//! conditions never carry over to a later method. [`ContractRegistry::method`]
//! is the direct alternative for hand-written registries: it binds
//! conditions to a named method without going through the staging slots.
//!
//! # Lookup
//!
//! [`of`] builds a type's registry on first use and hands out the same
//! `&'static` reference afterwards.

use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::context::EvalContext;
use crate::contract::{Condition, Contract, Invariant};
use crate::error::Timing;

/// Unconditional hook run around every instrumented call.
pub type Hook<T> = Box<dyn Fn(&EvalContext<'_, T>) + Send + Sync>;

/// A `before`/`after` hook pair registered with
/// [`ContractRegistry::before_and_after_each_call`].
///
/// Hooks don't pass or fail. They exist for cross-cutting instrumentation
/// (counting calls, tracing) rather than correctness.
pub struct EachCall<T> {
    before: Hook<T>,
    after: Hook<T>,
}

impl<T> EachCall<T> {
    pub fn before(&self, ctx: &EvalContext<'_, T>) {
        (self.before)(ctx);
    }

    pub fn after(&self, ctx: &EvalContext<'_, T>) {
        (self.after)(ctx);
    }
}

impl<T> fmt::Debug for EachCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EachCall").finish_non_exhaustive()
    }
}

/// Conditions bound to one method.
pub struct MethodConditions<T> {
    pre: Option<Condition<T>>,
    post: Option<Condition<T>>,
}

impl<T> MethodConditions<T> {
    pub fn pre(&self) -> Option<&Condition<T>> {
        self.pre.as_ref()
    }

    pub fn post(&self) -> Option<&Condition<T>> {
        self.post.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.post.is_none()
    }
}

impl<T> Default for MethodConditions<T> {
    fn default() -> Self {
        MethodConditions {
            pre: None,
            post: None,
        }
    }
}

impl<T> fmt::Debug for MethodConditions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodConditions")
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

/// Everything a type has declared about its methods.
pub struct ContractRegistry<T> {
    enabled: bool,
    invariants: Vec<Invariant<T>>,
    methods: HashMap<&'static str, MethodConditions<T>>,
    hooks: Vec<EachCall<T>>,
    pending_pre: Option<Condition<T>>,
    pending_post: Option<Condition<T>>,
}

impl<T> Default for ContractRegistry<T> {
    fn default() -> Self {
        ContractRegistry {
            enabled: false,
            invariants: Vec::new(),
            methods: HashMap::new(),
            hooks: Vec::new(),
            pending_pre: None,
            pending_post: None,
        }
    }
}

impl<T> ContractRegistry<T> {
    /// A disabled, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the type contract-enabled. Safe to call any number of times.
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        tracing::debug!(class = type_name::<T>(), "contracts enabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append an invariant. Invariants are enforced in the order registered.
    pub fn register_invariant(
        &mut self,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) {
        self.enable();
        let index = self.invariants.len();
        self.invariants.push(Invariant::new(index, clause, predicate));
    }

    /// Stage a precondition for the next method defined.
    pub fn stage_precondition(
        &mut self,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) {
        self.enable();
        self.pending_pre = Some(Condition::pre(clause, predicate));
    }

    /// Stage a postcondition for the next method defined.
    pub fn stage_postcondition(
        &mut self,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) {
        self.enable();
        self.pending_post = Some(Condition::post(clause, predicate));
    }

    /// Bind whatever is staged to `method` and clear the staging slots.
    ///
    /// Does nothing until the registry is enabled, matching a type that has
    /// not declared anything yet.
    pub fn on_method_defined(&mut self, method: &'static str) {
        if !self.enabled {
            return;
        }
        let mut pre = self.pending_pre.take();
        let mut post = self.pending_post.take();
        if let Some(condition) = pre.as_mut() {
            condition.bind(method);
        }
        if let Some(condition) = post.as_mut() {
            condition.bind(method);
        }
        tracing::trace!(
            class = type_name::<T>(),
            method,
            pre = pre.is_some(),
            post = post.is_some(),
            "method conditions bound"
        );
        self.methods.insert(method, MethodConditions { pre, post });
    }

    /// Register conditions for `method` directly, bypassing the staging slots.
    pub fn method(&mut self, method: &'static str) -> MethodBuilder<'_, T> {
        self.enable();
        let entry = self.methods.entry(method).or_default();
        MethodBuilder { method, entry }
    }

    /// Register hooks run before and after every instrumented call.
    pub fn before_and_after_each_call(
        &mut self,
        before: impl Fn(&EvalContext<'_, T>) + Send + Sync + 'static,
        after: impl Fn(&EvalContext<'_, T>) + Send + Sync + 'static,
    ) {
        self.enable();
        self.hooks.push(EachCall {
            before: Box::new(before),
            after: Box::new(after),
        });
    }

    /// The precondition of `method`, if it has one.
    pub fn applicable_before(&self, method: &str) -> Option<&Condition<T>> {
        self.methods.get(method).and_then(MethodConditions::pre)
    }

    /// Every invariant, in declaration order, followed by the postcondition of
    /// `method` if it has one.
    pub fn applicable_after<'r>(
        &'r self,
        method: &str,
    ) -> impl Iterator<Item = &'r dyn Contract<T>> + 'r {
        let post = self.methods.get(method).and_then(MethodConditions::post);
        self.invariants
            .iter()
            .map(|invariant| invariant as &dyn Contract<T>)
            .chain(post.map(|condition| condition as &dyn Contract<T>))
    }

    pub fn has_condition(&self, method: &str, timing: Timing) -> bool {
        self.methods.get(method).is_some_and(|conditions| match timing {
            Timing::Pre => conditions.pre.is_some(),
            Timing::Post => conditions.post.is_some(),
        })
    }

    /// The entry for `method`, if it was defined after the type was enabled.
    pub fn conditions(&self, method: &str) -> Option<&MethodConditions<T>> {
        self.methods.get(method)
    }

    pub fn invariants(&self) -> &[Invariant<T>] {
        &self.invariants
    }

    pub fn hooks(&self) -> &[EachCall<T>] {
        &self.hooks
    }

    /// `(pre staged, post staged)`. Both are `false` outside a declaration.
    pub fn pending(&self) -> (bool, bool) {
        (self.pending_pre.is_some(), self.pending_post.is_some())
    }

    /// Names of methods with an entry, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }
}

impl<T> fmt::Debug for ContractRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("class", &type_name::<T>())
            .field("enabled", &self.enabled)
            .field("invariants", &self.invariants)
            .field("methods", &self.methods)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Direct per-method registration returned by [`ContractRegistry::method`].
pub struct MethodBuilder<'r, T> {
    method: &'static str,
    entry: &'r mut MethodConditions<T>,
}

impl<T> MethodBuilder<'_, T> {
    /// Set the precondition, replacing any earlier one.
    pub fn pre(
        self,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        let mut condition = Condition::pre(clause, predicate);
        condition.bind(self.method);
        self.entry.pre = Some(condition);
        self
    }

    /// Set the postcondition, replacing any earlier one.
    pub fn post(
        self,
        clause: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&EvalContext<'_, T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        let mut condition = Condition::post(clause, predicate);
        condition.bind(self.method);
        self.entry.post = Some(condition);
        self
    }
}

// ============================================================================
// PROCESS-WIDE LOOKUP
// ============================================================================

/// A type whose methods are subject to contracts.
///
/// `#[contracts]` implements this for you. A hand-written impl fills the
/// registry in `declare` and wraps its methods with the functions in
/// [`interceptor`](crate::interceptor).
pub trait Contracted: Sized + 'static {
    /// Populate the type's registry. Called once, on first use.
    fn declare(registry: &mut ContractRegistry<Self>);

    /// The type's registry.
    fn contracts() -> &'static ContractRegistry<Self> {
        of::<Self>()
    }
}

type Entry = &'static (dyn Any + Send + Sync);

static REGISTRIES: LazyLock<RwLock<HashMap<TypeId, Entry>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The registry of `T`, declaring it first if needed.
pub fn of<T: Contracted>() -> &'static ContractRegistry<T> {
    let id = TypeId::of::<T>();
    if let Some(entry) = REGISTRIES.read().get(&id).copied() {
        return downcast(entry);
    }

    // Declare without holding the lock: `declare` may itself look up other types.
    let mut registry = ContractRegistry::<T>::new();
    T::declare(&mut registry);
    tracing::debug!(
        class = type_name::<T>(),
        enabled = registry.enabled,
        invariants = registry.invariants.len(),
        methods = registry.methods.len(),
        hooks = registry.hooks.len(),
        "contracts declared"
    );

    let entry = *REGISTRIES
        .write()
        .entry(id)
        .or_insert_with(|| -> Entry { Box::leak(Box::new(registry)) });
    downcast(entry)
}

fn downcast<T: 'static>(entry: Entry) -> &'static ContractRegistry<T> {
    match entry.downcast_ref::<ContractRegistry<T>>() {
        Some(registry) => registry,
        None => unreachable!("registry table is keyed by TypeId"),
    }
}
