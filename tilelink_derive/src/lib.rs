//! Procedural macros shared by the tilelink crates.
//!
//! The only macro is [`macro@context`], an attribute that wraps a function returning
//! `anyhow::Result` and attaches a formatted context message to every error it returns.
//!
//! ```ignore
//! #[context("Failed to fetch TileJSON from '{url}'")]
//! async fn fetch(url: &str) -> anyhow::Result<String> { ... }
//! ```

mod args;

use args::ContextArgs;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{ItemFn, ReturnType, parse_macro_input};

/// Attach an `anyhow` context message to the errors of a function.
///
/// The arguments are passed to `format!`, so they may reference the function's parameters.
/// A leading `move,` moves the captured parameters into the wrapped body.
#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = parse_macro_input!(args as ContextArgs);
	let item = parse_macro_input!(input as ItemFn);

	match expand(&args, item) {
		Ok(tokens) => tokens.into(),
		Err(err) => err.to_compile_error().into(),
	}
}

fn expand(args: &ContextArgs, mut item: ItemFn) -> syn::Result<TokenStream2> {
	let body = &item.block;
	let move_token = &args.move_token;
	let message = &args.message;
	let err = Ident::new("err", Span::mixed_site());

	let wrapped = if item.sig.asyncness.is_some() {
		let ReturnType::Type(_, return_type) = &item.sig.output else {
			return Err(syn::Error::new_spanned(&item.sig, "#[context] requires a function returning Result"));
		};
		let result = Ident::new("result", Span::mixed_site());
		quote! {
			let #result: #return_type = async #move_token { #body }.await;
			#result.map_err(|#err| #err.context(format!(#message)).into())
		}
	} else {
		let return_type = &item.sig.output;
		if matches!(return_type, ReturnType::Default) {
			return Err(syn::Error::new_spanned(&item.sig, "#[context] requires a function returning Result"));
		}
		// An owned non-`Copy` value forces the closure to be `FnOnce`.
		let once = Ident::new("once", Span::mixed_site());
		quote! {
			let #once = ::core::iter::empty::<()>();
			(#move_token || #return_type {
				::core::mem::drop(#once);
				#body
			})().map_err(|#err| #err.context(format!(#message)).into())
		}
	};

	item.block.stmts = vec![syn::Stmt::Expr(syn::Expr::Verbatim(wrapped), None)];
	Ok(item.into_token_stream())
}
