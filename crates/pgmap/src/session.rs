//! The CRUD surface over a [`ConnectionProvider`].

use crate::cache::DescriptorCache;
use crate::client::{Connection, ConnectionProvider};
use crate::descriptor::Descriptor;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::row::{Row, row_to_entity, rows_to_entities};
use crate::statement::{self, PlaceholderStyle, Statement};
use crate::value::Value;
use std::sync::Arc;

/// Entity-level CRUD against a connection provider.
///
/// Each operation resolves the entity's descriptor through the shared cache,
/// builds its statement, then acquires exactly one connection for the
/// round-trip. Statement errors (missing primary key, unset assigned key)
/// are reported before any connection is acquired. The connection is
/// released when the operation returns, whether it succeeded or not.
///
/// # Example
///
/// ```ignore
/// let session = pgmap::Session::new(pool);
/// let mut user = User { id: None, name: "alice".into(), age: 30 };
/// session.insert(&mut user).await?;
/// let found: Option<User> = session.select_by_id::<User>(user.id.clone()).await?;
/// ```
pub struct Session<P> {
    provider: P,
    cache: Arc<DescriptorCache>,
    placeholders: PlaceholderStyle,
}

impl<P: ConnectionProvider> Session<P> {
    /// Session with a private descriptor cache.
    pub fn new(provider: P) -> Self {
        Self::with_cache(provider, Arc::new(DescriptorCache::new()))
    }

    /// Session sharing `cache` with others.
    pub fn with_cache(provider: P, cache: Arc<DescriptorCache>) -> Self {
        Self {
            provider,
            cache,
            placeholders: PlaceholderStyle::default(),
        }
    }

    /// Set the placeholder syntax for synthesized statements.
    pub fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholders = style;
        self
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run caller-written SQL and map every row to `T`.
    ///
    /// Result columns that `T` does not map are ignored.
    pub async fn select_by_sql<T: Entity>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> OrmResult<Vec<T>> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::select_by_sql(sql, params.to_vec());
        let rows = self.fetch(&descriptor, &stmt).await?;
        rows_to_entities(rows, &descriptor)
    }

    /// Fetch one entity by primary key; `Ok(None)` when no row matches.
    pub async fn select_by_id<T: Entity>(&self, id: impl Into<Value>) -> OrmResult<Option<T>> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::select_by_id(&descriptor, id.into(), self.placeholders)?;
        let rows = self.fetch(&descriptor, &stmt).await?;
        rows.into_iter()
            .next()
            .map(|row| row_to_entity(row, &descriptor))
            .transpose()
    }

    /// Fetch every row of `T`'s table.
    pub async fn select_all<T: Entity>(&self) -> OrmResult<Vec<T>> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::select_all(&descriptor);
        let rows = self.fetch(&descriptor, &stmt).await?;
        rows_to_entities(rows, &descriptor)
    }

    /// Insert `entity`, returning the affected row count.
    ///
    /// A key generated for the insert is written back into `entity`: a token
    /// before the statement runs, a database-generated key from the
    /// `RETURNING` row after it. A returned row without the key column is a
    /// [`OrmError::Decode`] on that column.
    pub async fn insert<T: Entity>(&self, entity: &mut T) -> OrmResult<u64> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::insert(&descriptor, entity, self.placeholders)?;

        let Some(column) = stmt.returning() else {
            return self.exec(&descriptor, &stmt).await;
        };

        let rows = self.fetch(&descriptor, &stmt).await?;
        let affected = rows.len() as u64;
        let Some(row) = rows.into_iter().next() else {
            return Ok(0);
        };
        let key = returned_key(row, column)
            .ok_or_else(|| OrmError::decode(column, "no generated key returned"))?;
        let pk = descriptor.require_primary_key("insert")?;
        entity.set_field_value(pk.field, key).map_err(|e| match e {
            OrmError::Decode { message, .. } => OrmError::decode(column, message),
            other => other,
        })?;
        Ok(affected)
    }

    /// Update `entity`'s row by primary key, returning the affected row count.
    pub async fn update<T: Entity>(&self, entity: &T) -> OrmResult<u64> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::update(&descriptor, entity, self.placeholders)?;
        self.exec(&descriptor, &stmt).await
    }

    /// Delete the row of `T` with key `id`, returning the affected row count.
    pub async fn delete_by_id<T: Entity>(&self, id: impl Into<Value>) -> OrmResult<u64> {
        let descriptor = self.cache.get_or_resolve::<T>();
        let stmt = statement::delete_by_id(&descriptor, id.into(), self.placeholders)?;
        self.exec(&descriptor, &stmt).await
    }

    async fn fetch(&self, descriptor: &Descriptor, stmt: &Statement) -> OrmResult<Vec<Row>> {
        let conn = self.provider.acquire().await?;
        log_statement(descriptor, stmt);
        let result = conn.query(stmt.sql(), stmt.params()).await;
        drop(conn);
        result.inspect_err(|e| log_failure(descriptor, stmt, e))
    }

    async fn exec(&self, descriptor: &Descriptor, stmt: &Statement) -> OrmResult<u64> {
        let conn = self.provider.acquire().await?;
        log_statement(descriptor, stmt);
        let result = conn.execute(stmt.sql(), stmt.params()).await;
        drop(conn);
        result.inspect_err(|e| log_failure(descriptor, stmt, e))
    }
}

impl<P: ConnectionProvider + Clone> Clone for Session<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            cache: Arc::clone(&self.cache),
            placeholders: self.placeholders,
        }
    }
}

fn returned_key(row: Row, column: &str) -> Option<Value> {
    row.into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(column))
        .map(|(_, value)| value)
}

fn log_statement(descriptor: &Descriptor, stmt: &Statement) {
    tracing::debug!(
        target: "pgmap.sql",
        kind = stmt.kind().as_str(),
        table = descriptor.table_name(),
        param_count = stmt.params().len(),
        sql = stmt.sql(),
        "executing statement"
    );
}

fn log_failure(descriptor: &Descriptor, stmt: &Statement, error: &OrmError) {
    tracing::warn!(
        target: "pgmap.sql",
        kind = stmt.kind().as_str(),
        table = descriptor.table_name(),
        sql = stmt.sql(),
        %error,
        "statement failed"
    );
}
