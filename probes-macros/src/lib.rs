//! Procedural macros for the probes metering runtime.
//!
//! - `#[metered]`: fires a probe around every call of a function, using the
//!   runtime installed with `probes::install`.
//!
//! Usage:
//! ```rust,ignore
//! use probes::metered;
//!
//! // Probe named after the function's path, e.g. `my_crate.db.load_user`
//! #[metered]
//! fn load_user(id: u64) -> User { /* ... */ }
//!
//! // Explicit dotted probe name
//! #[metered(name = "db.query")]
//! fn query(sql: &str) -> Rows { /* ... */ }
//! ```
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, LitStr, parse_macro_input};

/// Meters every call of the annotated function.
///
/// The probe is named after `module_path!()` plus the function name, or after
/// the dotted `name = "..."` argument. The name is interned on the first call
/// and the probe ends when the function returns or unwinds.
///
/// # Panics
///
/// The function panics when called before a runtime was installed.
///
/// # Errors
///
/// `async fn` is rejected at compile time: a probe is bound to a thread and
/// cannot follow a future across `.await` points.
#[proc_macro_attribute]
pub fn metered(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut name: Option<LitStr> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported #[metered] argument, expected `name = \"...\"`"))
        }
    });
    parse_macro_input!(args with parser);

    let function = parse_macro_input!(item as ItemFn);
    if let Some(asyncness) = &function.sig.asyncness {
        return syn::Error::new_spanned(asyncness, "#[metered] cannot be used on async functions")
            .to_compile_error()
            .into();
    }

    let (path, separator) = match name {
        Some(name) => (quote! { #name }, "."),
        None => {
            let ident = function.sig.ident.to_string();
            (quote! { ::std::concat!(::std::module_path!(), "::", #ident) }, "::")
        }
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = function;

    let expanded = quote! {
        #(#attrs)*
        #vis #sig {
            static __PROBES_NAME: ::std::sync::OnceLock<::probes::Name> = ::std::sync::OnceLock::new();
            let __probes_probe = ::probes::__private::enter(&__PROBES_NAME, #path, #separator);
            #block
        }
    };
    TokenStream::from(expanded)
}
