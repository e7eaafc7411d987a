// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The `#[contracts]` attribute macro.
//!
//! Put it on an inherent impl block and write contracts next to the code they
//! constrain: invariants on the block, preconditions and postconditions on the
//! methods. The macro wraps each method so the `pacta` runtime checks them on
//! every call; method bodies are left exactly as written.
//!
//! Use it through the `pacta` crate, which re-exports it and provides the
//! runtime the generated code calls into.
//!
//! # Example
//!
//! ```ignore
//! use pacta::contracts;
//!
//! pub struct Tally {
//!     total: i64,
//! }
//!
//! #[contracts(
//!     invariant(self.total <= 20),
//!     invariant(self.total >= 5),
//! )]
//! impl Tally {
//!     pub fn new(total: i64) -> Self {
//!         Tally { total }
//!     }
//!
//!     #[pre(amount != &0)]
//!     #[post(|ret| *ret == self.total)]
//!     pub fn add(&mut self, amount: i64) -> i64 {
//!         self.total += amount;
//!         self.total
//!     }
//!
//!     #[exempt]
//!     pub fn total(&self) -> i64 {
//!         self.total
//!     }
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod codegen;
mod expand;

/// Enforce contracts on the methods of an inherent impl block.
///
/// # Block arguments
///
/// - `invariant(expr)` - must hold after every instrumented method returns,
///   constructors included. Repeatable; checked in the order written.
/// - `each_call(before = f, after = g)` - hooks run around every instrumented
///   call. `f` and `g` are paths to `fn(&Self)` or closures taking
///   `&EvalContext<Self>`. Repeatable.
///
/// # Method attributes
///
/// - `#[pre(expr)]` - checked before the body; the body is skipped if it fails.
/// - `#[post(expr)]` or `#[post(|ret| expr)]` - checked after the body, with
///   the return value bound to `ret`.
/// - `#[exempt]` - leave the method uninstrumented.
///
/// In a predicate, `self` is the instance and each parameter is available by
/// name, behind a reference (`amount: &i64`). Parameters of unsized or
/// borrowed types such as `&str` are not visible to predicates.
///
/// Postconditions that read an owned parameter require its type to be
/// `Clone`: the value is copied before the body consumes it.
///
/// A `&mut self` method that returns a borrow (`fn slot(&mut self) -> &mut T`)
/// gets no return-side checks, since the caller can still write through the
/// borrow. When the block declares invariants such a method is a compile
/// error unless it is marked `#[exempt]`.
///
/// A violation unwinds with a `pacta::ContractError` payload; see
/// `pacta::catch`.
#[proc_macro_attribute]
pub fn contracts(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand::process(attr, item)
}
