// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Design-by-contract for Rust methods.
//!
//! Declare preconditions, postconditions and invariants on a type's methods;
//! they are checked on every call without the method bodies mentioning them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  declare()   ┌──────────────────┐
//! │  #[contracts]    │─────────────▶│ ContractRegistry │  one per type,
//! │  (pacta-macros)  │              │  invariants      │  built on first use
//! └──────────────────┘              │  pre/post by name│
//!          │ wraps each method      │  each-call hooks │
//!          ▼                        └──────────────────┘
//! ┌──────────────────┐   lookup             │
//! │   interceptor    │◀─────────────────────┘
//! │ enter  → body →  │
//! │ leave            │──▶ EvalContext (receiver, args, return value)
//! └──────────────────┘           │
//!                                ▼
//!                      Contract::enforce → ContractError
//! ```
//!
//! | Module        | Role                                                   |
//! |---------------|--------------------------------------------------------|
//! | `contract`    | `Condition` / `Invariant` and the `Contract` trait     |
//! | `registry`    | Per-type store, declaration protocol, global lookup    |
//! | `context`     | `Args` and `EvalContext`, the predicate's view         |
//! | `interceptor` | Call/return checks and their ordering                  |
//! | `config`      | Enforcement mode (`PACTA_MODE`)                        |
//! | `error`       | `ContractError`, `catch`                               |
//!
//! # Usage
//!
//! ```ignore
//! use pacta::contracts;
//!
//! #[contracts(invariant(self.total <= 20), invariant(self.total >= 5))]
//! impl Tally {
//!     pub fn new(total: i64) -> Self {
//!         Tally { total }
//!     }
//!
//!     #[pre(*amount != 0)]
//!     #[post(|ret| *ret == self.total)]
//!     pub fn add(&mut self, amount: i64) -> i64 {
//!         self.total += amount;
//!         self.total
//!     }
//! }
//!
//! let mut tally = Tally::new(5);
//! tally.add(5); // fine
//! let err = pacta::catch(|| tally.add(20)).unwrap_err();
//! assert!(err.is_invariant());
//! ```

// Lets generated `::pacta::` paths resolve inside this crate's own tests.
extern crate self as pacta;

pub mod config;
pub mod context;
pub mod contract;
mod error;
pub mod interceptor;
pub mod registry;
pub mod testing;

pub use config::{Config, Mode};
pub use context::{ArgList, Args, EvalContext};
pub use contract::{Condition, Contract, Invariant, Predicate};
pub use error::{catch, ContractError, Timing, ViolationKind};
pub use interceptor::{construct, invoke, invoke_mut, Frame, FrameKind};
pub use registry::{ContractRegistry, Contracted, EachCall, MethodBuilder, MethodConditions};

pub use pacta_macros::contracts;
