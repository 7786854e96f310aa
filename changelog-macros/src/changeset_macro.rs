use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{Error, ItemFn, LitStr, Result, spanned::Spanned};

#[derive(Default)]
pub struct ChangesetArgs {
    name: Option<LitStr>,
    author: Option<LitStr>,
}

impl ChangesetArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(non_empty(meta.value()?.parse()?, "name")?);
        } else if meta.path.is_ident("author") {
            self.author = Some(non_empty(meta.value()?.parse()?, "author")?);
        } else {
            return Err(meta.error("unsupported changeset attribute, expected `name` or `author`"));
        }
        Ok(())
    }
}

fn non_empty(value: LitStr, key: &str) -> Result<LitStr> {
    if value.value().is_empty() {
        return Err(Error::new(value.span(), format!("changeset `{key}` must not be empty")));
    }
    Ok(value)
}

pub fn expand(args: ChangesetArgs, function: ItemFn) -> Result<TokenStream2> {
    let name = args
        .name
        .ok_or_else(|| Error::new(Span::call_site(), "missing `name = \"...\"` in #[changeset]"))?;
    let author = args
        .author
        .ok_or_else(|| Error::new(Span::call_site(), "missing `author = \"...\"` in #[changeset]"))?;

    let sig = &function.sig;
    if sig.asyncness.is_none() {
        return Err(Error::new(sig.fn_token.span(), "#[changeset] requires an `async fn`"));
    }
    if !sig.inputs.is_empty() {
        return Err(Error::new(sig.inputs.span(), "#[changeset] functions take no arguments"));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new(sig.generics.span(), "#[changeset] functions cannot be generic"));
    }

    let ident = &sig.ident;
    let vis = &function.vis;
    let task_fn = format_ident!("{}_changeset", ident);
    let block = &function.block;
    let source = quote!(#block).to_string();

    Ok(quote! {
        #function

        #[doc = concat!("Task for the `", #name, "` changeset.")]
        #vis fn #task_fn() -> ::changelog::Task {
            ::changelog::Task::new(#name, #author, ::changelog::Operation::new(#source, #ident))
        }

        ::changelog::inventory::submit! {
            ::changelog::ChangesetRegistration {
                name: #name,
                author: #author,
                function: concat!(module_path!(), "::", stringify!(#ident)),
                task_fn: #task_fn,
            }
        }
    })
}
