//! Entity derive macro implementation

use crate::attrs::{field_attr, struct_attr};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

struct EntityField<'a> {
    ident: &'a syn::Ident,
    name: String,
    column: String,
    key: Option<TokenStream>,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let table = struct_attr(&input.attrs)?.table;

    let mut fields = Vec::with_capacity(named.len());
    let mut seen_columns = HashSet::new();
    let mut id_field: Option<&syn::Ident> = None;

    for field in named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = field_attr(field)?;
        let field_name = ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name).to_string();
        let column = attr.column.unwrap_or_else(|| field_name.clone());

        if !seen_columns.insert(column.to_ascii_lowercase()) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column '{column}' is mapped by more than one field"),
            ));
        }

        if attr.generator.is_some() && !attr.is_id {
            return Err(syn::Error::new_spanned(
                field,
                "`generator` is only allowed together with `id`",
            ));
        }

        let key = if attr.is_id {
            if let Some(first) = id_field {
                return Err(syn::Error::new_spanned(
                    field,
                    format!("only one field may be marked #[orm(id)]; `{first}` already is"),
                ));
            }
            id_field = Some(ident);
            Some(key_strategy(attr.generator.as_ref())?)
        } else {
            None
        };

        fields.push(EntityField {
            ident,
            name: field_name,
            column,
            key,
        });
    }

    let type_name = name.to_string();
    let table_call = table.map(|t| quote! { .table(#t) });

    let field_decls = fields.iter().map(|f| {
        let field_name = &f.name;
        let column_call = (f.column != f.name).then(|| {
            let column = &f.column;
            quote! { .column(#column) }
        });
        let key_call = f.key.as_ref().map(|k| quote! { .primary_key(#k) });
        quote! {
            .field(::pgmap::FieldDeclaration::new(#field_name) #column_call #key_call)
        }
    });

    let getters = fields.iter().map(|f| {
        let ident = f.ident;
        let field_name = &f.name;
        quote! {
            #field_name => ::core::option::Option::Some(::pgmap::ToValue::to_value(&self.#ident)),
        }
    });

    let setters = fields.iter().map(|f| {
        let ident = f.ident;
        let field_name = &f.name;
        let column = &f.column;
        quote! {
            #field_name => {
                self.#ident = ::pgmap::FromValue::from_value(value)
                    .map_err(|e| ::pgmap::OrmError::decode(#column, e.to_string()))?;
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::pgmap::Entity for #name #ty_generics #where_clause {
            fn declaration() -> ::pgmap::EntityDeclaration {
                ::pgmap::EntityDeclaration::new(#type_name)
                    #table_call
                    #(#field_decls)*
            }

            fn instantiate() -> ::pgmap::OrmResult<Self> {
                ::core::result::Result::Ok(<Self as ::core::default::Default>::default())
            }

            fn field_value(&self, field: &str) -> ::core::option::Option<::pgmap::Value> {
                match field {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field_value(
                &mut self,
                field: &str,
                value: ::pgmap::Value,
            ) -> ::pgmap::OrmResult<()> {
                match field {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(
                            ::pgmap::OrmError::field_access(#type_name, field),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn key_strategy(generator: Option<&LitStr>) -> Result<TokenStream> {
    let Some(lit) = generator else {
        return Ok(quote! { ::pgmap::KeyStrategy::Token });
    };
    match lit.value().to_ascii_lowercase().as_str() {
        "auto" | "uuid" | "token" => Ok(quote! { ::pgmap::KeyStrategy::Token }),
        "database" | "identity" => Ok(quote! { ::pgmap::KeyStrategy::Database }),
        "assigned" | "none" => Ok(quote! { ::pgmap::KeyStrategy::Assigned }),
        other => Err(syn::Error::new(
            lit.span(),
            format!(
                "unknown key generator '{other}' (expected auto, uuid, token, database, identity, assigned or none)"
            ),
        )),
    }
}
