//! `#[component]` expansion.

use darling::ast::NestedMeta;
use darling::util::{Flag, PathList};
use darling::{Error, FromMeta, Result};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, GenericArgument, ImplItem, ItemImpl, LitStr, PathArguments, ReturnType,
    Signature, Type,
};

/// Arguments of `#[component(...)]`.
#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ComponentArgs {
    provides: PathList,
    runnable: Flag,
    priority: i32,
    scope: Option<LitStr>,
}

/// The two parameter shapes a constructor may declare.
enum Param<'a> {
    One(&'a Type),
    All(&'a Type),
}

pub fn component_impl(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
    let args = ComponentArgs::from_list(&NestedMeta::parse_meta_list(args)?)?;
    let mut item: ItemImpl = syn::parse2(input)?;

    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::custom(
            "`#[component]` goes on an inherent impl block, not a trait impl",
        )
        .with_span(path));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::custom("generic components are not supported").with_span(&item.generics));
    }
    let self_ty = (*item.self_ty).clone();

    let mut marked = Vec::new();
    let mut fallback = None;
    let mut hooks = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        if take_attr(&mut method.attrs, "constructor") {
            marked.push(method.sig.clone());
        } else if method.sig.ident == "new" {
            fallback = Some(method.sig.clone());
        }
        if take_attr(&mut method.attrs, "post_construct") {
            hooks.push(method.sig.clone());
        }
    }

    // Zero or several constructors still produce a descriptor; composing
    // the application reports them.
    let signatures = if marked.is_empty() {
        fallback.into_iter().collect()
    } else {
        marked
    };
    let constructors = signatures
        .iter()
        .map(|sig| constructor_tokens(&self_ty, sig))
        .collect::<Result<Vec<_>>>()?;

    if let Some(extra) = hooks.get(1) {
        return Err(Error::custom("only one `#[post_construct]` method is allowed")
            .with_span(&extra.ident));
    }
    let hook = hooks
        .first()
        .map(|sig| hook_tokens(&self_ty, sig))
        .transpose()?;

    let scope = scope_tokens(args.scope.as_ref())?;
    let priority = args.priority;
    let provides = args.provides.iter().map(|capability| {
        quote! {
            .provides::<dyn #capability>(|it| it as ::std::sync::Arc<dyn #capability>)
        }
    });
    let runnable = args.runnable.is_present().then(|| quote!(.runnable()));

    Ok(quote! {
        #item

        const _: () = {
            fn __tarkib_describe() -> ::tarkib::ComponentDescriptor {
                ::tarkib::ComponentDescriptor::builder::<#self_ty>()
                    .namespace(::core::module_path!())
                    .scope(#scope)
                    .priority(#priority)
                    #(#provides)*
                    #runnable
                    #(#constructors)*
                    #hook
                    .build()
            }

            ::tarkib::__private::inventory::submit! {
                ::tarkib::discovery::ComponentRegistration::new(
                    ::core::module_path!(),
                    __tarkib_describe,
                )
            }
        };
    })
}

/// Removes the helper attribute `name`; returns whether it was present.
fn take_attr(attrs: &mut Vec<Attribute>, name: &str) -> bool {
    let before = attrs.len();
    attrs.retain(|attr| !attr.path().is_ident(name));
    attrs.len() != before
}

fn constructor_tokens(self_ty: &Type, sig: &Signature) -> Result<TokenStream> {
    let mut params = Vec::new();
    let mut bindings = Vec::new();
    let mut names = Vec::new();

    for (position, input) in sig.inputs.iter().enumerate() {
        let FnArg::Typed(arg) = input else {
            return Err(Error::custom("a constructor cannot take `self`").with_span(input));
        };
        let name = format_ident!("__arg{}", position);
        match parameter_kind(&arg.ty) {
            Some(Param::One(capability)) => {
                params.push(quote!(::tarkib::Dependency::one::<#capability>()));
                bindings.push(quote!(let #name = __args.one::<#capability>()?;));
            }
            Some(Param::All(capability)) => {
                params.push(quote!(::tarkib::Dependency::all::<#capability>()));
                bindings.push(quote!(let #name = __args.all::<#capability>()?;));
            }
            None => {
                return Err(Error::custom(
                    "constructor parameters must be `Arc<dyn Trait>` or `Vec<Arc<dyn Trait>>`",
                )
                .with_span(&arg.ty));
            }
        }
        names.push(name);
    }

    let ident = &sig.ident;
    let call = quote!(<#self_ty>::#ident(#(#names),*));
    let body = if returns_result(&sig.output) {
        quote! {
            #call.map_err(|err| {
                ::tarkib::TarkibError::construction(::tarkib::TypeKey::of::<#self_ty>(), err)
            })
        }
    } else {
        quote!(::std::result::Result::Ok(#call))
    };

    Ok(quote! {
        .constructor(
            {
                let params: ::std::vec::Vec<::tarkib::Dependency> = ::std::vec![#(#params),*];
                params
            },
            |__args: &mut ::tarkib::Args| {
                #(#bindings)*
                #body
            },
        )
    })
}

fn hook_tokens(self_ty: &Type, sig: &Signature) -> Result<TokenStream> {
    let takes_ref_self = matches!(
        sig.inputs.first(),
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none()
    );
    if !takes_ref_self || sig.inputs.len() != 1 {
        return Err(Error::custom("a `#[post_construct]` method takes only `&self`")
            .with_span(&sig.ident));
    }

    let ident = &sig.ident;
    let body = if returns_result(&sig.output) {
        quote!(this.#ident().map_err(::std::convert::Into::into))
    } else {
        quote! {{
            this.#ident();
            ::std::result::Result::Ok(())
        }}
    };
    Ok(quote!(.post_construct(|this: &#self_ty| #body)))
}

fn scope_tokens(scope: Option<&LitStr>) -> Result<TokenStream> {
    let Some(lit) = scope else {
        return Ok(quote!(::tarkib::Scope::Singleton));
    };
    match lit.value().as_str() {
        "singleton" => Ok(quote!(::tarkib::Scope::Singleton)),
        "scoped" => Ok(quote!(::tarkib::Scope::Scoped)),
        "transient" | "prototype" => Ok(quote!(::tarkib::Scope::Transient)),
        other => Err(Error::custom(format!(
            "unknown scope `{other}`, expected `singleton`, `scoped` or `transient`"
        ))
        .with_span(lit)),
    }
}

fn parameter_kind(ty: &Type) -> Option<Param<'_>> {
    if let Some(capability) = generic_argument(ty, "Arc") {
        return Some(Param::One(capability));
    }
    let element = generic_argument(ty, "Vec")?;
    generic_argument(element, "Arc").map(Param::All)
}

/// `Wrapper<Inner>` → `Inner`, matching on the last path segment.
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => matches!(
            &**ty,
            Type::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "Result")
        ),
    }
}
