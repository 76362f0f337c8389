//! Error types for pgmap

use thiserror::Error;

/// Result type alias for pgmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// The operation needs a primary key but the entity does not declare one.
    ///
    /// Raised before any SQL is sent, so an UPDATE or DELETE can never run
    /// against the whole table.
    #[error("Entity for table '{table}' has no primary key; {operation} is not allowed")]
    MissingPrimaryKey {
        table: String,
        operation: &'static str,
    },

    /// A column value did not match the type of the field it maps to
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The entity's accessors do not know a declared field
    #[error("Field access error on {entity}.{field}")]
    FieldAccess { entity: String, field: String },

    /// The entity type could not be constructed for row mapping
    #[error("Cannot instantiate {entity}: {message}")]
    Instantiate { entity: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a field access error
    pub fn field_access(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldAccess {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an instantiation error
    pub fn instantiate(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Instantiate {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a missing primary key error
    pub fn missing_primary_key(table: impl Into<String>, operation: &'static str) -> Self {
        Self::MissingPrimaryKey {
            table: table.into(),
            operation,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a missing primary key error
    pub fn is_missing_primary_key(&self) -> bool {
        matches!(self, Self::MissingPrimaryKey { .. })
    }

    /// Check if this is a decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
