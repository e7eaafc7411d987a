// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Parsing of the contract DSL.
//!
//! Two places carry contracts:
//!
//! | Where                         | Syntax                                            |
//! |-------------------------------|---------------------------------------------------|
//! | `#[contracts(...)]` arguments | `invariant(expr)`, `each_call(before = f, after = g)` |
//! | method attributes             | `#[pre(expr)]`, `#[post(expr)]`, `#[post(\|ret\| expr)]`, `#[exempt]` |
//!
//! Every predicate keeps its source text, which ends up in violation messages.

use proc_macro2::Span;
use quote::ToTokens;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{parenthesized, Attribute, Expr, Ident, Meta, MetaList, MetaNameValue, Pat, Token};

/// A predicate together with the text it was written as.
pub struct Clause {
    pub expr: Expr,
    pub text: String,
}

/// `each_call(before = .., after = ..)`.
pub struct EachCall {
    pub before: Expr,
    pub after: Expr,
}

/// Arguments of `#[contracts(...)]`, in source order.
#[derive(Default)]
pub struct TypeClauses {
    pub invariants: Vec<Clause>,
    pub hooks: Vec<EachCall>,
}

impl Parse for TypeClauses {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut clauses = TypeClauses::default();

        while !input.is_empty() {
            let name: Ident = input.parse()?;
            let content;
            let paren = parenthesized!(content in input);

            match name.to_string().as_str() {
                "invariant" => {
                    let expr: Expr = content.parse()?;
                    if !content.is_empty() {
                        return Err(content.error("expected a single boolean expression"));
                    }
                    let text = clause_text(paren.span.join(), &expr);
                    clauses.invariants.push(Clause { expr, text });
                }
                "each_call" => clauses.hooks.push(parse_each_call(&content, name.span())?),
                _ => {
                    return Err(syn::Error::new(
                        name.span(),
                        "expected `invariant(..)` or `each_call(before = .., after = ..)`",
                    ))
                }
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(clauses)
    }
}

fn parse_each_call(content: ParseStream, span: Span) -> syn::Result<EachCall> {
    let mut before = None;
    let mut after = None;

    for pair in Punctuated::<MetaNameValue, Token![,]>::parse_terminated(content)? {
        let slot = if pair.path.is_ident("before") {
            &mut before
        } else if pair.path.is_ident("after") {
            &mut after
        } else {
            return Err(syn::Error::new_spanned(&pair.path, "expected `before` or `after`"));
        };
        if slot.replace(pair.value).is_some() {
            return Err(syn::Error::new_spanned(&pair.path, "hook given twice"));
        }
    }

    match (before, after) {
        (Some(before), Some(after)) => Ok(EachCall { before, after }),
        _ => Err(syn::Error::new(
            span,
            "each_call needs both `before = ..` and `after = ..`",
        )),
    }
}

/// A postcondition: `expr` or `|ret| expr`.
pub struct PostClause {
    /// Pattern the return value is bound to, for the closure form.
    pub ret: Option<Pat>,
    pub body: Expr,
    pub text: String,
}

/// Contract attributes found on one method.
#[derive(Default)]
pub struct MethodClauses {
    pub pre: Option<Clause>,
    pub post: Option<PostClause>,
    pub exempt: bool,
    /// Where the first `#[pre]`/`#[post]` was written, for diagnostics.
    pub origin: Option<Span>,
}

impl MethodClauses {
    /// Parse and remove the contract attributes from `attrs`. Everything else
    /// is left in place, in order.
    ///
    /// A repeated `#[pre]` or `#[post]` replaces the earlier one.
    pub fn extract(attrs: &mut Vec<Attribute>) -> syn::Result<Self> {
        let mut clauses = MethodClauses::default();
        let mut kept = Vec::with_capacity(attrs.len());

        for attr in attrs.drain(..) {
            let path = attr.path();
            if path.is_ident("pre") {
                clauses.origin.get_or_insert(attr.span());
                let (expr, text) = parse_predicate(&attr)?;
                clauses.pre = Some(Clause { expr, text });
            } else if path.is_ident("post") {
                clauses.origin.get_or_insert(attr.span());
                let (expr, text) = parse_predicate(&attr)?;
                clauses.post = Some(PostClause::new(expr, text)?);
            } else if path.is_ident("exempt") {
                attr.meta.require_path_only()?;
                clauses.exempt = true;
            } else {
                kept.push(attr);
            }
        }
        *attrs = kept;

        if clauses.exempt && clauses.has_conditions() {
            return Err(syn::Error::new(
                clauses.origin.unwrap_or_else(Span::call_site),
                "an #[exempt] method is not checked, so it cannot carry #[pre] or #[post]",
            ));
        }
        Ok(clauses)
    }

    pub fn has_conditions(&self) -> bool {
        self.pre.is_some() || self.post.is_some()
    }
}

impl PostClause {
    fn new(expr: Expr, text: String) -> syn::Result<Self> {
        let Expr::Closure(closure) = expr else {
            return Ok(PostClause {
                ret: None,
                body: expr,
                text,
            });
        };

        if closure.inputs.len() != 1 {
            return Err(syn::Error::new_spanned(
                &closure.inputs,
                "a postcondition closure takes exactly one argument, the return value",
            ));
        }
        let ret = match closure.inputs.into_iter().next() {
            Some(Pat::Type(typed)) => *typed.pat,
            Some(pat) => pat,
            None => unreachable!("length checked above"),
        };
        Ok(PostClause {
            ret: Some(ret),
            body: *closure.body,
            text,
        })
    }
}

fn parse_predicate(attr: &Attribute) -> syn::Result<(Expr, String)> {
    let Meta::List(MetaList { delimiter, .. }) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            attr,
            "expected a predicate in parentheses, e.g. #[pre(amount > 0)]",
        ));
    };
    let expr: Expr = attr.parse_args()?;
    let text = clause_text(delimiter.span().join(), &expr);
    Ok((expr, text))
}

/// Source text of a parenthesized predicate.
///
/// Uses the original source when the compiler exposes it, otherwise the
/// token stream with `a . b` tightened to `a.b`.
fn clause_text(group: Span, expr: &Expr) -> String {
    let text = match group.source_text() {
        Some(source) => source
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
            .map(str::to_string)
            .unwrap_or(source),
        None => expr.to_token_stream().to_string().replace(" . ", "."),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
