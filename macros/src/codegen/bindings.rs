// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! How a parameter or return value reaches a predicate.
//!
//! Values cross into the registry as `&dyn Any`, so only `'static`, sized
//! types can make the trip. The decision is syntactic:
//!
//! | Declared type            | Binding  | Recorded as  | Predicate sees |
//! |--------------------------|----------|--------------|----------------|
//! | `u32`, `String`, `Self`  | `Owned`  | `&value`     | `&u32`         |
//! | `&Config`                | `Shared` | `value`      | `&Config`      |
//! | `&mut Vec<u8>`           | `Unique` | `&*value`    | `&Vec<u8>`     |
//! | `&str`, `&[T]`, `T`, `Cow<'a, str>`, `impl Trait` | `Hidden` | - | - |
//!
//! `Unique` values are only recorded before the body runs; the body holds
//! the borrow afterwards.

use proc_macro2::{TokenStream, TokenTree};
use quote::ToTokens;
use syn::{Ident, Type};

/// Unsized types commonly passed by reference.
const UNSIZED: &[&str] = &["str", "Path", "OsStr", "CStr"];

pub enum Binding {
    Owned(Type),
    Shared(Type),
    Unique(Type),
    Hidden,
}

impl Binding {
    /// Classify `ty`. `generics` are type parameters in scope, whose
    /// lifetimes are unknown.
    pub fn classify(ty: &Type, generics: &[Ident]) -> Self {
        match ty {
            Type::Paren(inner) => Self::classify(&inner.elem, generics),
            Type::Group(inner) => Self::classify(&inner.elem, generics),
            Type::Reference(reference) => {
                let lifetime_ok = reference
                    .lifetime
                    .as_ref()
                    .map_or(true, |lifetime| lifetime.ident == "static");
                let target = &*reference.elem;
                if !lifetime_ok || !is_sized(target) || !is_static(target, generics) {
                    Binding::Hidden
                } else if reference.mutability.is_some() {
                    Binding::Unique(target.clone())
                } else {
                    Binding::Shared(target.clone())
                }
            }
            _ if is_static(ty, generics) => Binding::Owned(ty.clone()),
            _ => Binding::Hidden,
        }
    }

    /// The type a predicate gets a reference to, `None` if not recorded.
    pub fn observed(&self) -> Option<&Type> {
        match self {
            Binding::Owned(ty) | Binding::Shared(ty) | Binding::Unique(ty) => Some(ty),
            Binding::Hidden => None,
        }
    }
}

/// `true` if a value of type `ty` may borrow from something (the receiver).
pub fn borrows(ty: &Type) -> bool {
    !is_static(ty, &[])
}

/// `ty` contains `impl Trait` somewhere, so it can't annotate a `let`.
pub fn has_impl_trait(ty: &Type) -> bool {
    let mut flat = Vec::new();
    flatten(ty.to_token_stream(), &mut flat);
    flat.iter()
        .any(|tt| matches!(tt, TokenTree::Ident(ident) if *ident == "impl"))
}

/// `ty` names the impl's own type, as `Self` or spelled out.
pub fn is_self_type(ty: &Type, self_ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self") => true,
        _ => ty.to_token_stream().to_string() == self_ty.to_token_stream().to_string(),
    }
}

/// Whether `tokens` use `name` as a variable.
///
/// Field and path segments (`self.name`, `module::name`) don't count.
pub fn mentions(tokens: TokenStream, name: &Ident) -> bool {
    let mut flat = Vec::new();
    flatten(tokens, &mut flat);
    flat.iter().enumerate().any(|(i, tt)| {
        let named = matches!(tt, TokenTree::Ident(ident) if ident == name);
        let accessed = i
            .checked_sub(1)
            .is_some_and(|prev| matches!(&flat[prev], TokenTree::Punct(p) if matches!(p.as_char(), '.' | ':')));
        named && !accessed
    })
}

/// No references, no non-`'static` lifetimes, no `impl`, no `_`, and no
/// mention of a generic parameter.
fn is_static(ty: &Type, generics: &[Ident]) -> bool {
    let mut flat = Vec::new();
    flatten(ty.to_token_stream(), &mut flat);

    let mut tokens = flat.iter().peekable();
    while let Some(tt) = tokens.next() {
        match tt {
            TokenTree::Punct(p) if p.as_char() == '&' => return false,
            TokenTree::Punct(p) if p.as_char() == '\'' => {
                let is_static_lifetime =
                    matches!(tokens.peek(), Some(TokenTree::Ident(ident)) if *ident == "static");
                if !is_static_lifetime {
                    return false;
                }
            }
            TokenTree::Ident(ident) => {
                if *ident == "impl" || *ident == "_" || generics.contains(ident) {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

fn is_sized(ty: &Type) -> bool {
    match ty {
        Type::Slice(_) | Type::TraitObject(_) | Type::ImplTrait(_) => false,
        Type::Paren(inner) => is_sized(&inner.elem),
        Type::Group(inner) => is_sized(&inner.elem),
        Type::Path(path) if path.qself.is_none() => !path.path.segments.last().is_some_and(|last| {
            last.arguments.is_none() && UNSIZED.iter().any(|name| last.ident == name)
        }),
        _ => true,
    }
}

fn flatten(tokens: TokenStream, out: &mut Vec<TokenTree>) {
    for tt in tokens {
        match tt {
            TokenTree::Group(group) => flatten(group.stream(), out),
            other => out.push(other),
        }
    }
}
