use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemStruct;

/// Expands `#[feq_slice]` into an `Arc` handle over a generated `...Inner` state struct.
pub fn expand_slice(input: ItemStruct) -> TokenStream {
    let handle = &input.ident;
    let vis = &input.vis;
    let fields = &input.fields;
    let attrs = &input.attrs;
    let state = format_ident!("{handle}Inner");

    let state_decl = match fields {
        syn::Fields::Named(_) => quote! { #vis struct #state #fields },
        _ => quote! { #vis struct #state #fields; },
    };

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #state_decl

        #[derive(Debug, Clone)]
        #vis struct #handle(std::sync::Arc<#state>);

        impl #handle {
            #[must_use]
            pub fn new(state: #state) -> Self {
                Self(std::sync::Arc::new(state))
            }

            /// Wraps the handle for registration in the application state.
            #[must_use]
            pub fn into_slice(self) -> ::feq_kernel::domain::registry::InitializedSlice {
                ::feq_kernel::domain::registry::InitializedSlice::new(self)
            }
        }

        impl std::ops::Deref for #handle {
            type Target = #state;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::feq_kernel::domain::registry::FeatureSlice for #handle {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    }
}
