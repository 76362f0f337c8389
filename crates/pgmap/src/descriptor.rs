//! Table/column mapping resolved from an entity declaration.

use crate::entity::{Entity, EntityDeclaration, KeyStrategy};
use crate::error::{OrmError, OrmResult};
use std::any::TypeId;
use std::collections::HashMap;

/// Mapping of one field to its column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field_name: &'static str,
    pub column_name: &'static str,
    pub is_primary_key: bool,
}

/// The primary key of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryKey {
    pub field: &'static str,
    pub column: &'static str,
    pub strategy: KeyStrategy,
}

/// Resolved mapping between an entity type and its table.
///
/// Built once per type and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Descriptor {
    type_id: TypeId,
    type_name: &'static str,
    table_name: String,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<PrimaryKey>,
    field_to_column: HashMap<&'static str, usize>,
    column_to_field: HashMap<&'static str, usize>,
}

impl Descriptor {
    /// Resolve the descriptor of `T`. Never fails.
    pub fn resolve<T: Entity>() -> Self {
        Self::from_declaration(TypeId::of::<T>(), T::declaration())
    }

    /// Build a descriptor from an already extracted declaration.
    ///
    /// Declarations that break the uniqueness rules are normalized: a field or
    /// column seen twice and any primary key after the first are dropped.
    pub fn from_declaration(type_id: TypeId, decl: EntityDeclaration) -> Self {
        let table_name = match decl.table {
            Some(table) => table.to_string(),
            None => decl.type_name.to_lowercase(),
        };

        let mut fields = Vec::with_capacity(decl.fields.len());
        let mut field_to_column = HashMap::with_capacity(decl.fields.len());
        let mut column_to_field = HashMap::with_capacity(decl.fields.len());
        let mut primary_key: Option<PrimaryKey> = None;

        for field in decl.fields {
            let column = field.column.unwrap_or(field.name);
            if field_to_column.contains_key(field.name) || column_to_field.contains_key(column) {
                tracing::warn!(
                    target: "pgmap.descriptor",
                    entity = decl.type_name,
                    field = field.name,
                    column,
                    "duplicate field or column in declaration; ignoring"
                );
                continue;
            }

            let mut is_primary_key = false;
            if let Some(strategy) = field.primary_key {
                match primary_key {
                    None => {
                        is_primary_key = true;
                        primary_key = Some(PrimaryKey {
                            field: field.name,
                            column,
                            strategy,
                        });
                    }
                    Some(existing) => tracing::warn!(
                        target: "pgmap.descriptor",
                        entity = decl.type_name,
                        field = field.name,
                        primary_key = existing.field,
                        "second primary key declared; treating it as a plain column"
                    ),
                }
            }

            let idx = fields.len();
            field_to_column.insert(field.name, idx);
            column_to_field.insert(column, idx);
            fields.push(FieldDescriptor {
                field_name: field.name,
                column_name: column,
                is_primary_key,
            });
        }

        Self {
            type_id,
            type_name: decl.type_name,
            table_name,
            fields,
            primary_key,
            field_to_column,
            column_to_field,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// The primary key, or a [`OrmError::MissingPrimaryKey`] naming `operation`.
    pub fn require_primary_key(&self, operation: &'static str) -> OrmResult<&PrimaryKey> {
        self.primary_key
            .as_ref()
            .ok_or_else(|| OrmError::missing_primary_key(&self.table_name, operation))
    }

    pub fn column_of(&self, field: &str) -> Option<&'static str> {
        self.field_to_column
            .get(field)
            .map(|&idx| self.fields[idx].column_name)
    }

    /// Field mapped to `column`.
    ///
    /// Exact match first, then an ASCII case-insensitive match: PostgreSQL
    /// reports unquoted identifiers in lower case.
    pub fn field_of(&self, column: &str) -> Option<&'static str> {
        if let Some(&idx) = self.column_to_field.get(column) {
            return Some(self.fields[idx].field_name);
        }
        self.fields
            .iter()
            .find(|f| f.column_name.eq_ignore_ascii_case(column))
            .map(|f| f.field_name)
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.column_name)
    }
}
