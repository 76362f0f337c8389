//! The connection boundary.
//!
//! A [`ConnectionProvider`] hands out one [`Connection`] per operation. The
//! connection is a guard: dropping it releases it (for a pool, returns it).

use crate::error::{OrmError, OrmResult};
use crate::row::{Row, from_pg_row};
use crate::value::Value;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// A connection able to run one statement.
pub trait Connection: Send {
    /// Run a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send;
}

/// Source of connections, typically a pool.
pub trait ConnectionProvider: Send + Sync {
    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Acquire a connection for a single operation.
    fn acquire(&self) -> impl Future<Output = OrmResult<Self::Connection<'_>>> + Send;
}

fn bind_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Connection for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let params = bind_params(params);
        let rows = tokio_postgres::Client::query(self, sql, &params)
            .await
            .map_err(OrmError::from)?;
        Ok(rows.iter().map(from_pg_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let params = bind_params(params);
        tokio_postgres::Client::execute(self, sql, &params)
            .await
            .map_err(OrmError::from)
    }
}

impl<C: Connection + Sync> Connection for &C {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }
}

impl<P: ConnectionProvider> ConnectionProvider for &P {
    type Connection<'a>
        = P::Connection<'a>
    where
        Self: 'a;

    fn acquire(&self) -> impl Future<Output = OrmResult<Self::Connection<'_>>> + Send {
        (**self).acquire()
    }
}

impl<P: ConnectionProvider> ConnectionProvider for std::sync::Arc<P> {
    type Connection<'a>
        = P::Connection<'a>
    where
        Self: 'a;

    fn acquire(&self) -> impl Future<Output = OrmResult<Self::Connection<'_>>> + Send {
        (**self).acquire()
    }
}

/// A single client is a provider that always lends itself.
impl ConnectionProvider for tokio_postgres::Client {
    type Connection<'a> = &'a tokio_postgres::Client;

    async fn acquire(&self) -> OrmResult<Self::Connection<'_>> {
        if self.is_closed() {
            return Err(OrmError::Connection("client is closed".to_string()));
        }
        Ok(self)
    }
}
