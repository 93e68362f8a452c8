use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned, ItemFn, ReturnType};

/// Proc macro to denote a Transaction
///
/// Every call is timed and recorded in the metrics of the scenario it runs in. The function must
/// be `async` and return a `Result<T, E>`; an `Err` (or a response the `Ok` value flags as a
/// failure) counts as a failed request.
///
/// # Example
/// ```ignore
/// use booker::prelude::*;
///
/// #[transaction]
/// async fn list_bookings(client: &Client) -> Result<ApiResponse, TransportError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr.into(), item.into()).into()
}

fn transaction_internal(_attr: TokenStream2, item: TokenStream2) -> TokenStream2 {
    let input = match syn::parse2::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    if sig.asyncness.is_none() {
        return quote_spanned! { sig.fn_token.span() =>
            compile_error!("#[transaction] only works on async functions");
        };
    }

    let ret = match &sig.output {
        ReturnType::Type(_, ty) => ty.clone(),
        ReturnType::Default => {
            return quote_spanned! { sig.span() =>
                compile_error!("#[transaction] functions must return a Result");
            };
        }
    };

    let name = &sig.ident;
    let stmts = &block.stmts;

    // NOTE: The binding pins the block's output type so `?` inside it can infer its error type.
    quote! {
        #(#attrs)* #vis #sig {
            ::booker::transaction::transaction_hook(::booker::core::generate_labels!(#name), async move {
                let __booker_res: #ret = { #(#stmts)* };
                __booker_res
            }).await
        }
    }
}
