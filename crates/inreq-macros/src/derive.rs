//! Derive expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields};

use crate::parse::{FieldAttrs, StructAttrs, When};

/// Expands `#[derive(Decode)]`.
pub fn expand_decode(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let ident = &input.ident;

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            ident.span(),
            "Decode can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            ident.span(),
            "Decode requires a struct with named fields",
        ));
    };

    let struct_attrs = StructAttrs::from_attributes(&input.attrs)?;
    let type_name = ident.to_string();

    let mut specs = Vec::new();
    let mut visits = Vec::new();
    let mut index = 0usize;

    for field in &fields.named {
        let attrs = FieldAttrs::from_attributes(&field.attrs)?;
        if attrs.ignore {
            continue;
        }
        let Some(member) = &field.ident else {
            continue;
        };
        let ty = &field.ty;
        let field_name = member.unraw().to_string();

        if attrs.recurse {
            specs.push(quote! {
                .field(::inreq::FieldSpec::recurse::<#ty>(#field_name))
            });
            visits.push(quote! {
                visitor.recurse(#index, &mut self.#member)?;
            });
        } else {
            let operation = attrs.operation.as_ref().map(|op| quote!(.operation(#op)));
            let name = attrs.name.as_ref().map(|name| quote!(.name(#name)));
            let required = attrs.required.map(|required| quote!(.required(#required)));
            let options = attrs
                .options
                .iter()
                .map(|(key, value)| quote!(.option(#key, #value)));

            specs.push(quote! {
                .field(
                    ::inreq::FieldSpec::value::<#ty>(#field_name)
                        #operation #name #required #(#options)*
                )
            });
            visits.push(quote! {
                visitor.value(#index, &mut self.#member)?;
            });
        }
        index += 1;
    }

    let struct_option = struct_attrs.operation.as_ref().map(|operation| {
        let when = match struct_attrs.when {
            None => quote!(::core::option::Option::None),
            Some(When::Before) => quote!(::core::option::Option::Some(::inreq::When::Before)),
            Some(When::After) => quote!(::core::option::Option::Some(::inreq::When::After)),
        };
        let options = struct_attrs
            .options
            .iter()
            .map(|(key, value)| quote!(.struct_option(#key, #value)));
        quote! {
            .struct_operation(#operation, #when) #(#options)*
        }
    });

    let decode_content = (struct_attrs.serde || struct_attrs.operation.is_some()).then(|| {
        quote! {
            fn decode_content(
                &mut self,
                format: ::inreq::ContentFormat,
                bytes: &[u8],
            ) -> ::core::option::Option<::core::result::Result<(), ::inreq::BoxError>> {
                ::core::option::Option::Some(
                    format.deserialize::<Self>(bytes).map(|value| *self = value),
                )
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::inreq::Decode for #ident #ty_generics #where_clause {
            fn describe() -> ::inreq::StructSpec {
                ::inreq::StructSpec::new(#type_name)
                    #struct_option
                    #(#specs)*
            }

            fn visit(
                &mut self,
                visitor: &mut ::inreq::FieldVisitor<'_, '_>,
            ) -> ::inreq::DecodeResult<()> {
                #(#visits)*
                ::core::result::Result::Ok(())
            }

            #decode_content
        }
    })
}

/// Expands `#[derive(BodyValue)]`.
pub fn expand_body_value(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::inreq::FieldValue for #ident #ty_generics #where_clause {
            const KIND: ::inreq::TypeKind = ::inreq::TypeKind::Struct;

            fn resolve(
                _raw: &::inreq::RawValue,
                _cx: &::inreq::ResolveContext<'_>,
            ) -> ::core::result::Result<Self, ::inreq::ResolveError> {
                ::core::result::Result::Err(::inreq::ResolveError::unknown_type::<Self>())
            }

            fn decode_content(
                format: ::inreq::ContentFormat,
                bytes: &[u8],
            ) -> ::core::option::Option<::core::result::Result<Self, ::inreq::BoxError>> {
                ::core::option::Option::Some(format.deserialize(bytes))
            }
        }

        impl #impl_generics ::inreq::ScalarValue for #ident #ty_generics #where_clause {
            fn parse_scalar(_value: &str) -> ::core::result::Result<Self, ::inreq::ResolveError> {
                ::core::result::Result::Err(::inreq::ResolveError::unknown_type::<Self>())
            }

            fn decode_list(
                format: ::inreq::ContentFormat,
                bytes: &[u8],
            ) -> ::core::option::Option<
                ::core::result::Result<::std::vec::Vec<Self>, ::inreq::BoxError>,
            > {
                ::core::option::Option::Some(format.deserialize(bytes))
            }
        }
    })
}
