// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Building blocks shared by the expansion.

pub mod bindings;

pub use bindings::{borrows, has_impl_trait, is_self_type, mentions, Binding};

use proc_macro2::Ident;
use quote::format_ident;

/// Name of a generated helper for `method`, e.g. `__pacta_pre_withdraw`.
pub fn hidden(role: &str, method: &Ident) -> Ident {
    format_ident!("__pacta_{}_{}", role, method)
}
