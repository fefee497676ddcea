// Adapted from `gltf-derive`'s `Validate` derive.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Generates `impl dissect::Described for #ident`, building a `Struct`
/// description out of the annotated struct's fields: each field's wire
/// name is its Rust name converted to camelCase, and its wire format is
/// looked up via `dissect::WireField` for the field's Rust type.
#[proc_macro_derive(Described)]
pub fn derive_described(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let ident = &ast.ident;

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => panic!("#[derive(Described)] only supports structs with named fields"),
        },
        _ => panic!("#[derive(Described)] only works on structs"),
    };

    let entries = fields.iter().map(|field| {
        use inflections::Inflect;
        let field_ident = field.ident.as_ref().expect("named field");
        let ty = &field.ty;
        let wire_name = syn::LitStr::new(
            &field_ident.to_string().to_camel_case(),
            field_ident.span(),
        );
        quote! {
            (#wire_name, <#ty as ::dissect::WireField>::wire_format())
        }
    });

    let expanded = quote! {
        impl ::dissect::Described for #ident {
            fn describe() -> ::dissect::composite::Struct {
                ::dissect::composite::Struct::new(vec![
                    #(#entries),*
                ])
            }
        }
    };

    expanded.into()
}
