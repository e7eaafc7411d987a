// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The `#[contracts]` attribute.
//!
//! Rewrites an inherent impl block so every instrumented method reports to
//! the interceptor, and emits the type's `Contracted` impl.
//!
//! ```text
//! #[contracts(invariant(self.total <= 20))]     impl Tally {
//! impl Tally {                                      fn add(&mut self, amount: i64) -> i64 {
//!     #[pre(*amount != 0)]                 ──▶          enter(&*self, frame{amount})
//!     fn add(&mut self, amount: i64) -> i64 {           let ret = Self::__pacta_body_add(self, amount);
//!         ..                                            leave(&*self, frame, Some(&ret))
//!     }                                                 ret
//! }                                                 }
//!                                                   fn __pacta_body_add(..)      { .. }
//!                                                   fn __pacta_pre_add(&self, amount: &i64) -> bool
//!                                                   fn __pacta_invariant_0(&self) -> bool
//!                                               }
//!                                               impl Contracted for Tally {
//!                                                   fn declare(registry) {
//!                                                       register_invariant(..)
//!                                                       stage_precondition(..)
//!                                                       on_method_defined("add")
//!                                                   }
//!                                               }
//! ```
//!
//! Predicates become hidden `&self` methods, so `self` in a clause means the
//! instance and parameters keep their names. Each registry closure fetches
//! the recorded arguments back out of the `EvalContext` and calls the helper.
//!
//! | Method shape                    | Before checks | After checks                       |
//! |---------------------------------|---------------|------------------------------------|
//! | `&self`                         | yes           | yes                                |
//! | `&mut self`                     | yes           | yes; a borrow return needs `#[exempt]` if there are invariants |
//! | `self`                          | yes           | only if it returns `Self`          |
//! | no receiver, returns `Self`     | no            | yes, on the built value            |
//! | other fns, `async`, `const`, `unsafe`, `#[exempt]` | left as written |            |

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, parse_quote, Block, Expr, FnArg, GenericParam, Ident, ImplItem, ImplItemFn,
    ItemImpl, Pat, PatIdent, ReturnType, Signature, Token, Type, Visibility,
};

use crate::attrs::{EachCall, MethodClauses, TypeClauses};
use crate::codegen::{borrows, has_impl_trait, hidden, is_self_type, mentions, Binding};

/// Entry point for `#[contracts]`.
pub fn process(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemImpl);

    let clauses = match syn::parse::<TypeClauses>(attr) {
        Ok(clauses) => clauses,
        Err(e) => return e.to_compile_error().into(),
    };

    match expand(clauses, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// The impl block being rewritten.
struct Scope {
    self_ty: Type,
    /// Type and const parameters of the impl.
    generics: Vec<Ident>,
    has_invariants: bool,
}

pub(crate) fn expand(clauses: TypeClauses, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[contracts] goes on an inherent impl block, not a trait impl",
        ));
    }
    if let Some(lifetime) = item.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "contract-enabled types must be 'static; lifetime parameters are not supported",
        ));
    }

    let self_ty = (*item.self_ty).clone();
    let generics: Vec<Ident> = item
        .generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(param) => Some(param.ident.clone()),
            GenericParam::Const(param) => Some(param.ident.clone()),
            GenericParam::Lifetime(_) => None,
        })
        .collect();
    let is_generic = !generics.is_empty();
    if is_generic {
        // Contracted and the interceptor need the type to be 'static
        item.generics
            .make_where_clause()
            .predicates
            .push(parse_quote!(#self_ty: 'static));
    }
    let scope = Scope {
        self_ty,
        generics,
        has_invariants: !clauses.invariants.is_empty(),
    };

    let mut declarations = Vec::new();
    let mut helpers: Vec<ImplItem> = Vec::new();

    for (index, invariant) in clauses.invariants.iter().enumerate() {
        let helper = format_ident!("__pacta_invariant_{}", index);
        let expr = &invariant.expr;
        let text = &invariant.text;
        helpers.push(parse_quote! {
            #[doc(hidden)]
            fn #helper(&self) -> bool {
                #expr
            }
        });
        declarations.push(quote! {
            registry.register_invariant(#text, |__pacta_ctx: &::pacta::EvalContext<'_, Self>| {
                __pacta_ctx.receiver().#helper()
            });
        });
    }
    declarations.extend(clauses.hooks.iter().map(each_call));

    let mut items = Vec::with_capacity(item.items.len());
    for impl_item in std::mem::take(&mut item.items) {
        let method = match impl_item {
            ImplItem::Fn(method) => method,
            other => {
                items.push(other);
                continue;
            }
        };
        let expanded = expand_method(method, &scope)?;
        items.extend(expanded.items);
        helpers.extend(expanded.helpers);
        declarations.push(expanded.declaration);
    }
    items.extend(helpers);
    item.items = items;

    let self_ty = &scope.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    // Statics can't name `Self` or generic parameters, so only concrete types
    // get a cached lookup.
    let cached = (!is_generic).then(|| {
        quote! {
            fn contracts() -> &'static ::pacta::ContractRegistry<Self> {
                static REGISTRY: ::std::sync::OnceLock<&'static ::pacta::ContractRegistry<#self_ty>> =
                    ::std::sync::OnceLock::new();
                *REGISTRY.get_or_init(::pacta::registry::of::<#self_ty>)
            }
        }
    });

    Ok(quote! {
        #item

        impl #impl_generics ::pacta::Contracted for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn declare(registry: &mut ::pacta::ContractRegistry<Self>) {
                #(#declarations)*
            }

            #cached
        }
    })
}

fn each_call(hook: &EachCall) -> TokenStream2 {
    let before = hook_fn(&hook.before);
    let after = hook_fn(&hook.after);
    quote! {
        registry.before_and_after_each_call(#before, #after);
    }
}

/// Paths name `fn(&Self)`; anything else is used as the hook itself.
fn hook_fn(expr: &Expr) -> TokenStream2 {
    match expr {
        Expr::Path(_) => quote! {
            |__pacta_ctx: &::pacta::EvalContext<'_, Self>| {
                (#expr)(__pacta_ctx.receiver());
            }
        },
        _ => expr.to_token_stream(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    Shared,
    Unique,
    Owned,
    Constructor,
}

/// What the wrapper does once the body has returned.
enum After {
    /// Run `leave` on `target`. `ret` is how the return value is shown to
    /// predicates and the type it downcasts to.
    Check {
        target: TokenStream2,
        ret: Option<(TokenStream2, Type)>,
    },
    /// No return-side checks, for the stated reason.
    Skip(&'static str),
}

struct Param {
    /// Binding in the wrapper's signature.
    name: Ident,
    binding: Binding,
}

impl Param {
    fn label(&self) -> String {
        self.name.unraw().to_string()
    }
}

struct Expanded {
    items: Vec<ImplItem>,
    helpers: Vec<ImplItem>,
    declaration: TokenStream2,
}

impl Expanded {
    fn untouched(method: ImplItemFn) -> Self {
        Expanded {
            items: vec![ImplItem::Fn(method)],
            helpers: Vec::new(),
            declaration: TokenStream2::new(),
        }
    }
}

fn expand_method(mut method: ImplItemFn, scope: &Scope) -> syn::Result<Expanded> {
    let clauses = MethodClauses::extract(&mut method.attrs)?;
    if clauses.exempt {
        return Ok(Expanded::untouched(method));
    }
    let origin = clauses.origin.unwrap_or_else(|| method.sig.ident.span());

    let kind = match unsupported(&method.sig).map_or_else(|| receiver_kind(&method.sig, &scope.self_ty), Err) {
        Ok(kind) => kind,
        Err(what) if clauses.has_conditions() => {
            return Err(syn::Error::new(
                origin,
                format!("contracts cannot be attached to {}", what),
            ))
        }
        Err(_) => return Ok(Expanded::untouched(method)),
    };
    if !method.sig.generics.params.is_empty() && clauses.has_conditions() {
        return Err(syn::Error::new(
            origin,
            "contracts cannot be attached to generic methods",
        ));
    }

    let mut generics = scope.generics.clone();
    generics.extend(method.sig.generics.type_params().map(|param| param.ident.clone()));
    generics.extend(method.sig.generics.const_params().map(|param| param.ident.clone()));

    let ident = method.sig.ident.clone();
    let name = ident.unraw().to_string();
    let body_fn = hidden("body", &ident);

    // Parameters and the wrapper's own signature
    let mut params = Vec::new();
    let mut inputs = Punctuated::<FnArg, Token![,]>::new();
    for (position, input) in method.sig.inputs.iter().enumerate() {
        match input {
            FnArg::Receiver(receiver) => {
                let mut receiver = receiver.clone();
                if receiver.reference.is_none() {
                    receiver.mutability = None;
                }
                inputs.push(FnArg::Receiver(receiver));
            }
            FnArg::Typed(typed) => {
                let (name, binding) = match &*typed.pat {
                    Pat::Ident(PatIdent {
                        by_ref: None,
                        subpat: None,
                        ident,
                        ..
                    }) => (ident.clone(), Binding::classify(&typed.ty, &generics)),
                    _ => (format_ident!("__pacta_arg{}", position), Binding::Hidden),
                };
                let mut typed = typed.clone();
                typed.pat = Box::new(Pat::Ident(PatIdent {
                    attrs: Vec::new(),
                    by_ref: None,
                    mutability: None,
                    ident: name.clone(),
                    subpat: None,
                }));
                inputs.push(FnArg::Typed(typed));
                params.push(Param { name, binding });
            }
        }
    }

    let ret_ty: Type = match &method.sig.output {
        ReturnType::Default => parse_quote!(()),
        ReturnType::Type(_, ty) => (**ty).clone(),
    };
    let itself = || Some((quote!(&__pacta_ret), parse_quote!(Self)));
    let observed = || match Binding::classify(&ret_ty, &generics) {
        Binding::Owned(ty) => Some((quote!(&__pacta_ret), ty)),
        Binding::Shared(ty) => Some((quote!(__pacta_ret), ty)),
        Binding::Unique(_) | Binding::Hidden => None,
    };
    let after = match kind {
        Receiver::Constructor => After::Check {
            target: quote!(&__pacta_ret),
            ret: itself(),
        },
        Receiver::Shared => After::Check {
            target: quote!(self),
            ret: observed(),
        },
        Receiver::Unique if borrows(&ret_ty) => After::Skip("returns a borrow of `self`"),
        Receiver::Unique => After::Check {
            target: quote!(&*self),
            ret: observed(),
        },
        Receiver::Owned if is_self_type(&ret_ty, &scope.self_ty) => After::Check {
            target: quote!(&__pacta_ret),
            ret: itself(),
        },
        Receiver::Owned => After::Skip("consumes `self` without returning `Self`"),
    };

    // The caller can still write through the returned borrow, so the
    // invariants would be checked against a state that is about to change.
    if kind == Receiver::Unique && scope.has_invariants {
        if let After::Skip(reason) = &after {
            return Err(syn::Error::new(
                origin,
                format!(
                    "`{}` {}, so the type's invariants cannot be checked after it; \
                     mark it #[exempt] to leave it unchecked",
                    name, reason
                ),
            ));
        }
    }

    if let Some(post) = &clauses.post {
        match &after {
            After::Skip(reason) => {
                return Err(syn::Error::new(
                    origin,
                    format!("`{}` {}, so it has no postcondition to check", name, reason),
                ))
            }
            After::Check { ret: None, .. } if post.ret.is_some() => {
                return Err(syn::Error::new(
                    origin,
                    format!(
                        "the return value of `{}` cannot be inspected by a postcondition \
                         (it is unsized, borrowed with a named lifetime, or generic)",
                        name
                    ),
                ))
            }
            After::Check { .. } => {}
        }
    }

    let mut helpers = Vec::new();
    let mut declaration = TokenStream2::new();

    if let Some(pre) = &clauses.pre {
        let helper = hidden("pre", &ident);
        let seen = visible(&params, &pre.expr, |binding| binding.observed().is_some());
        let decls = seen.iter().map(|(name, ty)| quote!(#name: &#ty));
        let fetches = seen.iter().map(|(name, ty)| fetch(name, ty));
        let names = seen.iter().map(|(name, _)| name);
        let expr = &pre.expr;
        let text = &pre.text;

        helpers.push(parse_quote! {
            #[doc(hidden)]
            fn #helper(&self, #(#decls),*) -> bool {
                #expr
            }
        });
        declaration.extend(quote! {
            registry.stage_precondition(#text, |__pacta_ctx: &::pacta::EvalContext<'_, Self>| {
                #(#fetches)*
                __pacta_ctx.receiver().#helper(#(#names),*)
            });
        });
    }

    // Owned arguments the postcondition reads are cloned before the body
    // consumes them.
    let mut saves = Vec::new();
    let mut saved = Vec::new();
    if let Some(post) = &clauses.post {
        let helper = hidden("post", &ident);
        let seen = visible(&params, &post.body, |binding| {
            matches!(binding, Binding::Owned(_) | Binding::Shared(_))
        });
        for param in &params {
            if matches!(param.binding, Binding::Owned(_)) && seen.iter().any(|(name, _)| *name == &param.name) {
                let arg = &param.name;
                let copy = format_ident!("__pacta_saved_{}", param.name.unraw());
                saves.push(quote! {
                    let #copy = ::core::clone::Clone::clone(&#arg);
                });
                saved.push((param.name.clone(), copy));
            }
        }

        let (ret_decl, ret_fetch, ret_arg) = match (&post.ret, &after) {
            (Some(pat), After::Check { ret: Some((_, ty)), .. }) => (
                Some(quote!(#pat: &#ty,)),
                Some(quote! {
                    let ::core::option::Option::Some(__pacta_ret) = __pacta_ctx.ret::<#ty>() else {
                        return __pacta_ctx.unbound("return value");
                    };
                }),
                Some(quote!(__pacta_ret,)),
            ),
            _ => (None, None, None),
        };
        let decls = seen.iter().map(|(name, ty)| quote!(#name: &#ty));
        let fetches = seen.iter().map(|(name, ty)| fetch(name, ty));
        let names = seen.iter().map(|(name, _)| name);
        let body = &post.body;
        let text = &post.text;

        helpers.push(parse_quote! {
            #[doc(hidden)]
            fn #helper(&self, #ret_decl #(#decls),*) -> bool {
                #body
            }
        });
        declaration.extend(quote! {
            registry.stage_postcondition(#text, |__pacta_ctx: &::pacta::EvalContext<'_, Self>| {
                #ret_fetch
                #(#fetches)*
                __pacta_ctx.receiver().#helper(#ret_arg #(#names),*)
            });
        });
    }
    declaration.extend(quote! {
        registry.on_method_defined(#name);
    });

    // Wrapper body
    let frame = match kind {
        Receiver::Constructor => quote!(::pacta::Frame::constructor(#name)),
        _ => quote!(::pacta::Frame::method(#name)),
    };
    let enter = call_target(kind).map(|target| {
        let bound = params.iter().filter_map(|param| {
            let label = param.label();
            let arg = &param.name;
            match param.binding {
                Binding::Owned(_) => Some(quote!(.arg(#label, &#arg as &dyn ::core::any::Any))),
                Binding::Shared(_) => Some(quote!(.arg(#label, #arg as &dyn ::core::any::Any))),
                Binding::Unique(_) => Some(quote!(.arg(#label, &*#arg as &dyn ::core::any::Any))),
                Binding::Hidden => None,
            }
        });
        quote! {
            {
                let __pacta_frame = #frame #(#bound)*;
                ::pacta::interceptor::enter::<Self>(#target, &__pacta_frame);
            }
        }
    });

    let args = params.iter().map(|param| &param.name);
    let call = match kind {
        Receiver::Constructor => quote!(Self::#body_fn(#(#args),*)),
        _ => quote!(Self::#body_fn(self, #(#args),*)),
    };
    let annotation = (!has_impl_trait(&ret_ty)).then(|| quote!(: #ret_ty));

    let leave = match &after {
        After::Check { target, ret } => {
            let bound = params.iter().filter_map(|param| {
                let label = param.label();
                let arg = &param.name;
                match param.binding {
                    Binding::Shared(_) => Some(quote!(.arg(#label, #arg as &dyn ::core::any::Any))),
                    Binding::Owned(_) => saved
                        .iter()
                        .find(|(name, _)| name == arg)
                        .map(|(_, copy)| quote!(.arg(#label, &#copy as &dyn ::core::any::Any))),
                    Binding::Unique(_) | Binding::Hidden => None,
                }
            });
            let ret = match ret {
                Some((value, _)) => {
                    quote!(::core::option::Option::Some(#value as &dyn ::core::any::Any))
                }
                None => quote!(::core::option::Option::None),
            };
            Some(quote! {
                {
                    let __pacta_frame = #frame #(#bound)*;
                    ::pacta::interceptor::leave::<Self>(#target, &__pacta_frame, #ret);
                }
            })
        }
        After::Skip(_) => None,
    };

    let block: Block = parse_quote! {{
        #enter
        #(#saves)*
        let __pacta_ret #annotation = #call;
        #leave
        __pacta_ret
    }};

    // The original method, renamed and hidden
    let mut body = method.clone();
    body.sig.ident = body_fn.clone();
    body.vis = Visibility::Inherited;
    body.defaultness = None;
    body.attrs = method
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("cfg"))
        .cloned()
        .collect();
    body.attrs.push(parse_quote!(#[doc(hidden)]));
    body.attrs.push(parse_quote!(#[inline(always)]));

    let mut wrapper = method;
    wrapper.sig.inputs = inputs;
    wrapper.block = block;

    Ok(Expanded {
        items: vec![ImplItem::Fn(wrapper), ImplItem::Fn(body)],
        helpers,
        declaration,
    })
}

fn unsupported(sig: &Signature) -> Option<&'static str> {
    if sig.asyncness.is_some() {
        Some("async fn")
    } else if sig.constness.is_some() {
        Some("const fn")
    } else if sig.unsafety.is_some() {
        Some("unsafe fn")
    } else {
        None
    }
}

fn receiver_kind(sig: &Signature, self_ty: &Type) -> Result<Receiver, &'static str> {
    match sig.receiver() {
        Some(receiver) if receiver.colon_token.is_some() => Err("methods with a typed `self`"),
        Some(receiver) => Ok(match (&receiver.reference, &receiver.mutability) {
            (Some(_), Some(_)) => Receiver::Unique,
            (Some(_), None) => Receiver::Shared,
            (None, _) => Receiver::Owned,
        }),
        None => match &sig.output {
            ReturnType::Type(_, ty) if is_self_type(ty, self_ty) => Ok(Receiver::Constructor),
            _ => Err("associated functions that neither take `self` nor return `Self`"),
        },
    }
}

/// What `enter` receives as the instance; constructors have none yet.
fn call_target(kind: Receiver) -> Option<TokenStream2> {
    match kind {
        Receiver::Shared => Some(quote!(self)),
        Receiver::Unique => Some(quote!(&*self)),
        Receiver::Owned => Some(quote!(&self)),
        Receiver::Constructor => None,
    }
}

/// Parameters a predicate uses that are available to it, with the type each
/// one is fetched as.
fn visible<'p>(
    params: &'p [Param],
    expr: &Expr,
    available: impl Fn(&Binding) -> bool,
) -> Vec<(&'p Ident, &'p Type)> {
    let tokens = expr.to_token_stream();
    params
        .iter()
        .filter(|param| available(&param.binding) && mentions(tokens.clone(), &param.name))
        .filter_map(|param| param.binding.observed().map(|ty| (&param.name, ty)))
        .collect()
}

fn fetch(name: &Ident, ty: &Type) -> TokenStream2 {
    let label = name.unraw().to_string();
    quote! {
        let ::core::option::Option::Some(#name) = __pacta_ctx.arg::<#ty>(#label) else {
            return __pacta_ctx.unbound(#label);
        };
    }
}
