//! SQL synthesis for entity CRUD.
//!
//! Every function here is pure apart from primary-key generation on insert,
//! which writes the new key into the entity before the column list is built.
//! Values only ever reach the SQL text as numbered placeholders; identifiers
//! come from resolved descriptors.
//!
//! # Example
//!
//! ```ignore
//! use pgmap::{DescriptorCache, PlaceholderStyle, statement};
//!
//! let cache = DescriptorCache::new();
//! let descriptor = cache.get_or_resolve::<User>();
//! let stmt = statement::insert(&descriptor, &mut user, PlaceholderStyle::Dollar)?;
//! assert_eq!(stmt.sql(), "INSERT INTO user (id, name, age) VALUES ($1, $2, $3)");
//! ```


use crate::descriptor::Descriptor;
use crate::entity::{Entity, KeyStrategy};
use crate::error::{OrmError, OrmResult};
use crate::row::entity_to_values;
use crate::value::Value;
use std::fmt::Write as _;

/// Placeholder syntax of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `$1, $2, ...` (PostgreSQL)
    #[default]
    Dollar,
    /// `?, ?, ...`
    Question,
}

impl PlaceholderStyle {
    fn push(self, sql: &mut String, position: usize) {
        match self {
            PlaceholderStyle::Dollar => {
                let _ = write!(sql, "${position}");
            }
            PlaceholderStyle::Question => sql.push('?'),
        }
    }
}

/// Statement category, used for logging and for choosing query vs execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
    kind: StatementKind,
    returning: Option<&'static str>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters; position `i` binds placeholder `i + 1`.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Column named in a `RETURNING` clause, if the statement has one.
    pub fn returning(&self) -> Option<&'static str> {
        self.returning
    }
}

/// Generate a 32-character lower-case hex token for client-side keys.
pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// `INSERT INTO <table> (<columns>) VALUES (<placeholders>)`.
///
/// An unset primary key is handled according to its [`KeyStrategy`]:
/// - `Token`: a key from [`generate_key`] is written into `entity` and bound.
/// - `Database`: the column is left out and `RETURNING <pk>` is appended.
/// - `Assigned`: validation error.
///
/// Without a primary key every field is a plain column.
pub fn insert<T: Entity>(
    descriptor: &Descriptor,
    entity: &mut T,
    style: PlaceholderStyle,
) -> OrmResult<Statement> {
    let mut returning = None;

    if let Some(pk) = descriptor.primary_key() {
        let current = entity
            .field_value(pk.field)
            .ok_or_else(|| OrmError::field_access(descriptor.type_name(), pk.field))?;

        if current.is_unset() {
            match pk.strategy {
                KeyStrategy::Token => {
                    entity
                        .set_field_value(pk.field, Value::Text(generate_key()))
                        .map_err(|e| {
                            OrmError::validation(format!(
                                "cannot store a generated key in {}.{}: {e}",
                                descriptor.type_name(),
                                pk.field
                            ))
                        })?;
                }
                KeyStrategy::Database => returning = Some(pk.column),
                KeyStrategy::Assigned => {
                    return Err(OrmError::validation(format!(
                        "primary key {}.{} must be assigned before insert",
                        descriptor.type_name(),
                        pk.field
                    )));
                }
            }
        }
    }

    let mut columns = Vec::with_capacity(descriptor.fields().len());
    let mut params = Vec::with_capacity(descriptor.fields().len());
    for (field, (column, value)) in descriptor
        .fields()
        .iter()
        .zip(entity_to_values(entity, descriptor)?)
    {
        if field.is_primary_key && returning.is_some() {
            continue;
        }
        columns.push(column);
        params.push(value);
    }

    let mut sql = format!("INSERT INTO {}", descriptor.table_name());
    if columns.is_empty() {
        sql.push_str(" DEFAULT VALUES");
    } else {
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push_str(") VALUES (");
        for i in 1..=columns.len() {
            if i > 1 {
                sql.push_str(", ");
            }
            style.push(&mut sql, i);
        }
        sql.push(')');
    }
    if let Some(column) = returning {
        sql.push_str(" RETURNING ");
        sql.push_str(column);
    }

    Ok(Statement {
        sql,
        params,
        kind: StatementKind::Insert,
        returning,
    })
}

/// `UPDATE <table> SET <c1> = <p1>, ... WHERE <pk> = <pn>`.
///
/// Parameters are the non-key values in field order followed by the key.
/// Refuses to build a statement without a primary key, without any non-key
/// column, or with an unset key value.
pub fn update<T: Entity>(
    descriptor: &Descriptor,
    entity: &T,
    style: PlaceholderStyle,
) -> OrmResult<Statement> {
    let pk = descriptor.require_primary_key("update")?;

    let mut sql = format!("UPDATE {} SET ", descriptor.table_name());
    let mut params = Vec::with_capacity(descriptor.fields().len());
    let mut key = None;

    for (field, (column, value)) in descriptor
        .fields()
        .iter()
        .zip(entity_to_values(entity, descriptor)?)
    {
        if field.is_primary_key {
            key = Some(value);
            continue;
        }
        if !params.is_empty() {
            sql.push_str(", ");
        }
        params.push(value);
        sql.push_str(column);
        sql.push_str(" = ");
        style.push(&mut sql, params.len());
    }

    if params.is_empty() {
        return Err(OrmError::validation(format!(
            "{} has no columns besides its primary key to update",
            descriptor.table_name()
        )));
    }

    let key = key
        .filter(|k| !k.is_unset())
        .ok_or_else(|| {
            OrmError::validation(format!(
                "cannot update {}: primary key {} is unset",
                descriptor.table_name(),
                pk.field
            ))
        })?;

    params.push(key);
    sql.push_str(" WHERE ");
    sql.push_str(pk.column);
    sql.push_str(" = ");
    style.push(&mut sql, params.len());

    Ok(Statement {
        sql,
        params,
        kind: StatementKind::Update,
        returning: None,
    })
}

/// `DELETE FROM <table> WHERE <pk> = <p1>`.
pub fn delete_by_id(
    descriptor: &Descriptor,
    id: Value,
    style: PlaceholderStyle,
) -> OrmResult<Statement> {
    let pk = descriptor.require_primary_key("delete")?;
    let mut sql = format!("DELETE FROM {} WHERE {} = ", descriptor.table_name(), pk.column);
    style.push(&mut sql, 1);

    Ok(Statement {
        sql,
        params: vec![id],
        kind: StatementKind::Delete,
        returning: None,
    })
}

/// `SELECT * FROM <table> WHERE <pk> = <p1>`.
pub fn select_by_id(
    descriptor: &Descriptor,
    id: Value,
    style: PlaceholderStyle,
) -> OrmResult<Statement> {
    let pk = descriptor.require_primary_key("select by id")?;
    let mut sql = format!("SELECT * FROM {} WHERE {} = ", descriptor.table_name(), pk.column);
    style.push(&mut sql, 1);

    Ok(Statement {
        sql,
        params: vec![id],
        kind: StatementKind::Select,
        returning: None,
    })
}

/// `SELECT * FROM <table>`.
pub fn select_all(descriptor: &Descriptor) -> Statement {
    Statement {
        sql: format!("SELECT * FROM {}", descriptor.table_name()),
        params: Vec::new(),
        kind: StatementKind::Select,
        returning: None,
    }
}

/// Caller-supplied query, passed through unchanged.
pub fn select_by_sql(sql: impl Into<String>, params: Vec<Value>) -> Statement {
    Statement {
        sql: sql.into(),
        params,
        kind: StatementKind::Select,
        returning: None,
    }
}
