use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod changeset_macro;

use changeset_macro::ChangesetArgs;

/// Declare an `async fn` as a changeset.
///
/// The function must take no arguments and return `anyhow::Result<()>`. The
/// macro keeps the function and generates:
/// - `<fn>_changeset() -> changelog::Task`, whose operation calls the function
///   and whose source text is the function body
/// - an inventory registration so manifests can refer to the changeset by name
///
/// # Example
///
/// ```text
/// #[changeset(name = "initDB", author = "John")]
/// async fn init_db() -> anyhow::Result<()> {
///     Ok(())
/// }
///
/// // Generated:
/// // - fn init_db_changeset() -> changelog::Task
/// // - changelog::find_changeset("initDB")
/// ```
#[proc_macro_attribute]
pub fn changeset(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut parsed = ChangesetArgs::default();
    let parser = syn::meta::parser(|meta| parsed.parse(meta));
    parse_macro_input!(args with parser);
    let function = parse_macro_input!(item as ItemFn);

    match changeset_macro::expand(parsed, function) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
