use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, LitStr};

/// Derive `Shape` and `CacheValue` for a struct or enum
///
/// ```ignore
/// #[derive(Serialize, Deserialize, CacheValue)]
/// #[cache_value(tag = "Article")]
/// struct Article {
///     title: String,
///     #[serde(skip)]
///     #[cache_value(skip)]
///     scratch: u32,
/// }
/// ```
///
/// Without `tag`, the type identifier is the module path plus the type name.
/// Generated code refers to `::unicache_core`; crates that only depend on
/// `unicache` add `#[cache_value(crate = "unicache")]`.
#[proc_macro_derive(CacheValue, attributes(cache_value))]
pub fn derive_cache_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "CacheValue derive does not support generic types",
        ));
    }

    let mut tag = None;
    let mut krate: syn::Path = syn::parse_quote!(::unicache_core);
    for attr in &input.attrs {
        if attr.path().is_ident("cache_value") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    tag = Some(s.value());
                    Ok(())
                } else if meta.path.is_ident("crate") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    krate = s.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("unsupported attribute, expected `tag` or `crate`"))
                }
            })?;
        }
    }

    let type_name = LitStr::new(&name.to_string(), name.span());

    let body = match &input.data {
        Data::Struct(data) => describe_fields(&krate, &data.fields)?,
        Data::Enum(data) => {
            let mut variants = Vec::new();
            for variant in &data.variants {
                let variant_name = LitStr::new(&variant.ident.to_string(), variant.ident.span());
                let fields = match &variant.fields {
                    Fields::Unit => quote! {},
                    fields => {
                        let inner = describe_fields(&krate, fields)?;
                        quote! { w.generic("", |w| { #inner }); }
                    }
                };
                variants.push(quote! {
                    w.variant(#variant_name);
                    #fields
                });
            }
            quote! { #(#variants)* }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "CacheValue derive only supports structs and enums",
            ));
        }
    };

    let tag_impl = match tag {
        Some(tag) => quote! {
            ::std::borrow::Cow::Borrowed(#tag)
        },
        None => quote! {
            ::std::borrow::Cow::Borrowed(concat!(module_path!(), "::", #type_name))
        },
    };

    Ok(quote! {
        impl #krate::Shape for #name {
            fn describe(w: &mut #krate::ShapeWriter) {
                if w.enter::<Self>(#type_name) {
                    #body
                    w.leave();
                }
            }
        }

        impl #krate::CacheValue for #name {
            fn type_tag() -> ::std::borrow::Cow<'static, str> {
                #tag_impl
            }
        }
    })
}

/// Field list in declaration order, separated by commas
fn describe_fields(krate: &syn::Path, fields: &Fields) -> syn::Result<TokenStream2> {
    let mut parts = Vec::new();

    for (i, field) in fields.iter().enumerate() {
        if is_skipped(field)? {
            continue;
        }

        let field_name = match &field.ident {
            Some(ident) => ident.to_string(),
            None => i.to_string(),
        };
        let ty = &field.ty;

        if !parts.is_empty() {
            parts.push(quote! { w.next(); });
        }
        parts.push(quote! {
            w.field(#field_name);
            <#ty as #krate::Shape>::describe(w);
        });
    }

    Ok(quote! { #(#parts)* })
}

fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in &field.attrs {
        if attr.path().is_ident("cache_value") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported field attribute, expected `skip`"))
                }
            })?;
        }
    }
    Ok(skip)
}
