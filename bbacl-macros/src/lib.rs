use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derives an async `execute()` dispatcher for a subcommand enum.
///
/// # Usage
///
/// ```ignore
/// #[derive(Subcommand, CommandRouter)]
/// #[router(state = AppState)]
/// enum PermissionCommand {
///     #[router(handler = handlers::permission::list)]
///     List(RepoArgs),
///
///     #[router(handler = handlers::permission::copy)]
///     Copy(CopyArgs),
/// }
/// ```
///
/// This will generate:
///
/// ```ignore
/// impl PermissionCommand {
///     pub async fn execute(self, state: bbacl::State<AppState>) -> bbacl::Response {
///         match self {
///             PermissionCommand::List(args) => handlers::permission::list(state, args).await.into_response(),
///             PermissionCommand::Copy(args) => handlers::permission::copy(state, args).await.into_response(),
///         }
///     }
/// }
/// ```
///
/// Unit variants call `handler(state)`; single-field tuple variants call
/// `handler(state, args)`.
#[proc_macro_derive(CommandRouter, attributes(router))]
pub fn derive_command_router(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let enum_name = &input.ident;

    let state_type = find_path(&input.attrs, "state")?.ok_or_else(|| {
        syn::Error::new_spanned(
            enum_name,
            "missing #[router(state = YourStateType)] attribute on enum",
        )
    })?;

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                enum_name,
                "CommandRouter can only be derived for enums",
            ))
        }
    };

    let mut match_arms = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let variant_name = &variant.ident;
        let handler = find_path(&variant.attrs, "handler")?.ok_or_else(|| {
            syn::Error::new_spanned(
                variant_name,
                "missing #[router(handler = path::to::handler)] attribute",
            )
        })?;

        let arm = match &variant.fields {
            Fields::Unit => quote! {
                #enum_name::#variant_name => #handler(state).await.into_response(),
            },
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => quote! {
                #enum_name::#variant_name(args) => #handler(state, args).await.into_response(),
            },
            _ => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "CommandRouter supports unit variants or single-field tuple variants",
                ))
            }
        };
        match_arms.push(arm);
    }

    Ok(quote! {
        impl #enum_name {
            pub async fn execute(self, state: ::bbacl::State<#state_type>) -> ::bbacl::Response {
                use ::bbacl::IntoResponse;

                match self {
                    #(#match_arms)*
                }
            }
        }
    })
}

/// Extract `key = some::path` from `#[router(...)]` attributes
fn find_path(attrs: &[syn::Attribute], key: &str) -> syn::Result<Option<syn::Path>> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("router")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                found = Some(meta.value()?.parse::<syn::Path>()?);
            } else {
                // Skip the value of keys meant for another lookup
                let _ = meta.value()?.parse::<syn::Path>()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}
