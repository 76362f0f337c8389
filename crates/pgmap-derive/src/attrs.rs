//! Parsing of struct-level and field-level `#[orm(...)]` attributes.

use crate::sql_ident::parse_sql_ident;
use syn::{Attribute, LitStr, Result};

/// Struct-level `#[orm(table = "...")]`.
#[derive(Default)]
pub(crate) struct StructAttr {
    pub table: Option<String>,
}

/// Field-level `#[orm(id, column = "...", generator = "...")]`.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: Option<String>,
    pub generator: Option<LitStr>,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: LitStr = input.parse()?;

            if ident == "table" {
                attr.table = Some(parse_sql_ident(&value, "table name", true)?);
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown orm attribute '{ident}' (expected `table`)"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: LitStr = input.parse()?;

                if ident == "column" {
                    attr.column = Some(parse_sql_ident(&value, "column name", false)?);
                } else if ident == "generator" {
                    attr.generator = Some(value);
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!(
                            "unknown orm attribute '{ident}' (expected `id`, `column` or `generator`)"
                        ),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("orm"))
}

pub(crate) fn struct_attr(attrs: &[Attribute]) -> Result<StructAttr> {
    let mut merged = StructAttr::default();
    for attr in orm_attrs(attrs) {
        let parsed: StructAttr = attr.parse_args()?;
        if parsed.table.is_some() {
            merged.table = parsed.table;
        }
    }
    Ok(merged)
}

pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in orm_attrs(&field.attrs) {
        let parsed: FieldAttr = attr.parse_args()?;
        merged.is_id |= parsed.is_id;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
        if parsed.generator.is_some() {
            merged.generator = parsed.generator;
        }
    }
    Ok(merged)
}
