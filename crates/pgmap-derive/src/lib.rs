//! Derive macros for pgmap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod sql_ident;

/// Derive the `Entity` trait for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use pgmap::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: Option<String>,
///     #[orm(column = "user_name")]
///     name: String,
///     age: i32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the lower-cased type name)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(id)]` - Mark field as primary key (a token is generated when unset)
/// - `#[orm(id, generator = "database")]` - Key generated by the database and
///   read back on insert; `"assigned"` requires the caller to set it
///
/// The struct must implement `Default`; rows are loaded into a default value.
/// Every field type must implement `ToValue` and `FromValue`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
