use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitBool, LitStr, Meta, MetaNameValue, Token};

/// Expands the `#[api_model]` attribute macro.
///
/// Adds the common derives (`Serialize`, `Deserialize`, `ToSchema`) and configures Serde
/// for strict field checking. A rename policy is only emitted when one is requested.
pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    expand_api_model_inner(args, &input).unwrap_or_else(|err| err.to_compile_error())
}

fn expand_api_model_inner(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let args = ApiModelArgs::parse(args)?;
    let derives = derived_trait_names(&input.attrs);
    let serde_meta = SerdeMetaInfo::collect(&input.attrs)?;

    let mut derive_tokens = Vec::new();
    for (name, path) in [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
        ("ToSchema", quote! { ::utoipa::ToSchema }),
    ] {
        if !derives.contains(name) {
            derive_tokens.push(path);
        }
    }
    let derive_attr = if derive_tokens.is_empty() {
        quote! {}
    } else {
        quote! { #[derive(#(#derive_tokens),*)] }
    };

    let rename_attr = match (&args.rename_all, &serde_meta.rename_all) {
        (Some(requested), Some(existing)) if existing.value() != requested.value() => {
            return Err(syn::Error::new_spanned(
                existing,
                "Conflicting serde rename_all; remove it or set api_model(rename_all = \"...\") to match",
            ));
        },
        (Some(requested), None) => quote! { #[serde(rename_all = #requested)] },
        _ => quote! {},
    };

    let deny_unknown = args.deny_unknown_fields.unwrap_or(true);
    let deny_attr = match (serde_meta.deny_unknown_fields, deny_unknown) {
        (true, false) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "deny_unknown_fields is already set via serde; remove it before disabling",
            ));
        },
        (false, true) => quote! { #[serde(deny_unknown_fields)] },
        _ => quote! {},
    };

    Ok(quote! {
        #derive_attr
        #rename_attr
        #deny_attr
        #input
    })
}

/// Expands the `#[api_handler]` attribute macro.
///
/// Every handler of the platform is served over HTTP, so the `utoipa::path` metadata is
/// always attached.
pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let body = &input.block;
    let sig = &input.sig;
    let vis = &input.vis;
    let attrs = &input.attrs;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[::utoipa::path(#args)]
        #vis #sig {
            #body
        }
    }
}

#[derive(Default)]
struct ApiModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

impl ApiModelArgs {
    fn parse(args: TokenStream) -> syn::Result<Self> {
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
        let mut parsed = Self::default();

        for meta in metas {
            let Meta::NameValue(name_value) = meta else {
                return Err(syn::Error::new_spanned(
                    meta,
                    "Expected name-value arguments like `rename_all = \"...\"`",
                ));
            };

            if name_value.path.is_ident("rename_all") {
                let lit = literal::<LitStr>(&name_value, "rename_all must be a string literal")?;
                set_once(&mut parsed.rename_all, &name_value, lit)?;
            } else if name_value.path.is_ident("deny_unknown_fields") {
                let lit =
                    literal::<LitBool>(&name_value, "deny_unknown_fields must be a boolean literal")?;
                set_once(&mut parsed.deny_unknown_fields, &name_value, lit.value)?;
            } else {
                return Err(syn::Error::new_spanned(
                    name_value.path,
                    "Unsupported argument; expected rename_all or deny_unknown_fields",
                ));
            }
        }

        Ok(parsed)
    }
}

/// Literal kinds accepted as `api_model` argument values.
trait FromLit: Sized {
    fn from_lit(lit: &Lit) -> Option<Self>;
}

impl FromLit for LitStr {
    fn from_lit(lit: &Lit) -> Option<Self> {
        if let Lit::Str(s) = lit { Some(s.clone()) } else { None }
    }
}

impl FromLit for LitBool {
    fn from_lit(lit: &Lit) -> Option<Self> {
        if let Lit::Bool(b) = lit { Some(b.clone()) } else { None }
    }
}

/// Extracts a typed literal from `name = <lit>`.
fn literal<L: FromLit>(name_value: &MetaNameValue, message: &str) -> syn::Result<L> {
    match &name_value.value {
        Expr::Lit(expr_lit) => L::from_lit(&expr_lit.lit),
        _ => None,
    }
    .ok_or_else(|| syn::Error::new_spanned(&name_value.value, message))
}

fn set_once<T>(slot: &mut Option<T>, token: &MetaNameValue, value: T) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(token, "Duplicate argument"));
    }
    *slot = Some(value);
    Ok(())
}

struct SerdeMetaInfo {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

impl SerdeMetaInfo {
    fn collect(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut info = Self { rename_all: None, deny_unknown_fields: false };

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    info.rename_all = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("deny_unknown_fields") {
                    info.deny_unknown_fields = true;
                } else if meta.input.peek(Token![=]) {
                    // Other key/value options (e.g. `default = "..."`) are left to serde.
                    let _: Expr = meta.value()?.parse()?;
                }
                Ok(())
            })?;
        }

        Ok(info)
    }
}

fn derived_trait_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(seg) = meta.path.segments.last() {
                traits.insert(seg.ident.to_string());
            }
            Ok(())
        });
    }

    traits
}
