//! Rows and the mapping between rows and entities.

use crate::descriptor::Descriptor;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// One result record: column names and values in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    /// Builder-style [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Build an entity from a row.
///
/// Columns without a mapped field are skipped, and so is a column whose value
/// does not fit its field; the field then keeps its empty value. Failing to
/// instantiate `T` or to reach a declared field aborts the conversion.
pub fn row_to_entity<T: Entity>(row: Row, descriptor: &Descriptor) -> OrmResult<T> {
    let mut entity = T::instantiate()?;

    for (column, value) in row {
        let Some(field) = descriptor.field_of(&column) else {
            continue;
        };
        match entity.set_field_value(field, value) {
            Ok(()) => {}
            Err(OrmError::Decode { message, .. }) => {
                tracing::debug!(
                    target: "pgmap.row",
                    entity = descriptor.type_name(),
                    field,
                    column = %column,
                    %message,
                    "column value does not fit field; skipped"
                );
            }
            Err(err) => return Err(err),
        }
    }

    Ok(entity)
}

/// Map every row, stopping at the first failure.
pub fn rows_to_entities<T: Entity>(rows: Vec<Row>, descriptor: &Descriptor) -> OrmResult<Vec<T>> {
    rows.into_iter()
        .map(|row| row_to_entity(row, descriptor))
        .collect()
}

/// Read every mapped field as `(column, value)` in field order.
pub fn entity_to_values<T: Entity>(
    entity: &T,
    descriptor: &Descriptor,
) -> OrmResult<Vec<(&'static str, Value)>> {
    descriptor
        .fields()
        .iter()
        .map(|f| {
            entity
                .field_value(f.field_name)
                .map(|value| (f.column_name, value))
                .ok_or_else(|| OrmError::field_access(descriptor.type_name(), f.field_name))
        })
        .collect()
}

/// How one result column is decoded into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnDecoder {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
}

impl ColumnDecoder {
    /// Decoder for a column type; `None` when [`Value`] has no variant for it.
    pub(crate) fn for_type(ty: &tokio_postgres::types::Type) -> Option<Self> {
        use tokio_postgres::types::Type;

        let decoder = match *ty {
            Type::BOOL => Self::Bool,
            Type::INT2 => Self::I16,
            Type::INT4 => Self::I32,
            Type::INT8 => Self::I64,
            Type::FLOAT4 => Self::F32,
            Type::FLOAT8 => Self::F64,
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Self::Text,
            Type::BYTEA => Self::Bytes,
            Type::UUID => Self::Uuid,
            Type::DATE => Self::Date,
            Type::TIME => Self::Time,
            Type::TIMESTAMP => Self::Timestamp,
            Type::TIMESTAMPTZ => Self::TimestampTz,
            Type::JSON | Type::JSONB => Self::Json,
            _ => return None,
        };
        Some(decoder)
    }

    fn decode(self, row: &tokio_postgres::Row, idx: usize, name: &str) -> OrmResult<Value> {
        fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize, name: &str) -> OrmResult<Value>
        where
            T: tokio_postgres::types::FromSql<'a> + Into<Value>,
        {
            row.try_get::<_, Option<T>>(idx)
                .map(Value::from)
                .map_err(|e| OrmError::decode(name, e.to_string()))
        }

        match self {
            Self::Bool => get::<bool>(row, idx, name),
            Self::I16 => get::<i16>(row, idx, name),
            Self::I32 => get::<i32>(row, idx, name),
            Self::I64 => get::<i64>(row, idx, name),
            Self::F32 => get::<f32>(row, idx, name),
            Self::F64 => get::<f64>(row, idx, name),
            Self::Text => get::<String>(row, idx, name),
            Self::Bytes => get::<Vec<u8>>(row, idx, name),
            Self::Uuid => get::<uuid::Uuid>(row, idx, name),
            Self::Date => get::<chrono::NaiveDate>(row, idx, name),
            Self::Time => get::<chrono::NaiveTime>(row, idx, name),
            Self::Timestamp => get::<chrono::NaiveDateTime>(row, idx, name),
            Self::TimestampTz => get::<chrono::DateTime<chrono::Utc>>(row, idx, name),
            Self::Json => get::<serde_json::Value>(row, idx, name),
        }
    }
}

/// Build a [`Row`] column by column.
///
/// A column whose type has no decoder, or whose value fails to decode, is
/// left out of the row; mapping then treats it like any unmapped column.
fn collect_columns<'c>(
    columns: impl IntoIterator<Item = (&'c str, &'c tokio_postgres::types::Type)>,
    mut decode: impl FnMut(usize, &str, ColumnDecoder) -> OrmResult<Value>,
) -> Row {
    let mut out = Row::new();
    for (idx, (name, ty)) in columns.into_iter().enumerate() {
        let Some(decoder) = ColumnDecoder::for_type(ty) else {
            tracing::debug!(
                target: "pgmap.row",
                column = name,
                column_type = %ty,
                "unsupported column type; column skipped"
            );
            continue;
        };
        match decode(idx, name, decoder) {
            Ok(value) => out.push(name, value),
            Err(err) => tracing::debug!(
                target: "pgmap.row",
                column = name,
                error = %err,
                "column value could not be decoded; column skipped"
            ),
        }
    }
    out
}

/// Convert a `tokio_postgres` row into a [`Row`], decoding by column type.
///
/// Supported types: bool, int2/4/8, float4/8, text-like, bytea, uuid, date,
/// time, timestamp, timestamptz, json/jsonb. Columns of any other type are
/// skipped, so a mapped field of such a column keeps its empty value.
pub fn from_pg_row(row: &tokio_postgres::Row) -> Row {
    collect_columns(
        row.columns().iter().map(|c| (c.name(), c.type_())),
        |idx, name, decoder| decoder.decode(row, idx, name),
    )
}
