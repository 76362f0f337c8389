//! The capability a type implements to be mapped to a table.
//!
//! Instead of runtime reflection, an entity describes its own shape
//! ([`Entity::declaration`]) and exposes name-based accessors. The
//! `#[derive(Entity)]` macro writes all of this; hand-written impls are
//! supported too.

use crate::error::OrmResult;
use crate::value::Value;

/// How a primary key gets its value when an entity is inserted without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Generate a 32-character hex token locally and bind it like any other column.
    #[default]
    Token,
    /// Let the database generate the key and read it back with `RETURNING`.
    Database,
    /// The caller always supplies the key.
    Assigned,
}

impl KeyStrategy {
    /// Parse a generator name as written in `#[orm(id, generator = "...")]`.
    pub fn from_generator(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auto" | "uuid" | "token" => Some(Self::Token),
            "database" | "identity" => Some(Self::Database),
            "assigned" | "none" => Some(Self::Assigned),
            _ => None,
        }
    }
}

/// One declared member of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub primary_key: Option<KeyStrategy>,
}

impl FieldDeclaration {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            primary_key: None,
        }
    }

    /// Override the column name.
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Mark this field as the primary key.
    pub const fn primary_key(mut self, strategy: KeyStrategy) -> Self {
        self.primary_key = Some(strategy);
        self
    }
}

/// The declared shape of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDeclaration {
    /// Simple type name, e.g. `User`.
    pub type_name: &'static str,
    pub table: Option<&'static str>,
    pub fields: Vec<FieldDeclaration>,
}

impl EntityDeclaration {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            fields: Vec::new(),
        }
    }

    /// Start a declaration named after `T`'s simple name.
    pub fn for_type<T: ?Sized>() -> Self {
        Self::new(simple_type_name(std::any::type_name::<T>()))
    }

    /// Override the table name.
    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub fn field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }
}

/// `my_app::model::User<T>` -> `User`
fn simple_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A type that can be stored in and loaded from a table.
///
/// Usually derived:
///
/// ```ignore
/// use pgmap::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// struct User {
///     #[orm(id)]
///     id: Option<String>,
///     name: String,
///     age: i32,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// The declared shape. Called once per type by the descriptor resolver.
    fn declaration() -> EntityDeclaration;

    /// Create an empty instance that row values are written into.
    ///
    /// Returns [`OrmError::Instantiate`](crate::OrmError::Instantiate) when the
    /// type has no empty state.
    fn instantiate() -> OrmResult<Self>;

    /// Current value of a declared field, or `None` if the field is unknown.
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Assign a value to a declared field.
    ///
    /// Returns [`OrmError::Decode`](crate::OrmError::Decode) when the value has
    /// the wrong type and [`OrmError::FieldAccess`](crate::OrmError::FieldAccess)
    /// when the field is unknown.
    fn set_field_value(&mut self, field: &str, value: Value) -> OrmResult<()>;
}
