//! # pgmap
//!
//! A small Postgres entity mapper: declare a struct once, then insert, update,
//! delete and select it without writing SQL.
//!
//! ## Features
//!
//! - **Descriptor-driven**: table and column names come from the entity declaration
//!   (`#[derive(Entity)]` or a hand-written [`Entity`] impl), resolved once per type
//! - **Parameterized**: values only ever travel as bound parameters
//! - **Key strategies**: client tokens, database-generated keys (`RETURNING`), or
//!   caller-assigned keys
//! - **Tolerant mapping**: extra result columns are ignored, so hand-written
//!   `select_by_sql` queries may return more than the entity holds
//! - **Pool-friendly**: one connection per operation, released on every exit path
//!
//! ## Example
//!
//! ```ignore
//! use pgmap::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: Option<String>,
//!     #[orm(column = "user_name")]
//!     name: String,
//!     age: i32,
//! }
//!
//! let orm = Orm::connect(&OrmConfig::from_env()?)?;
//! let session = orm.open_session();
//!
//! let mut user = User { id: None, name: "alice".into(), age: 30 };
//! session.insert(&mut user).await?;          // user.id is now a generated token
//!
//! user.age = 31;
//! session.update(&user).await?;
//!
//! let adults: Vec<User> = session
//!     .select_by_sql("SELECT * FROM users WHERE age >= $1", &[18.into()])
//!     .await?;
//!
//! session.delete_by_id::<User>(user.id.clone()).await?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod prelude;
pub mod row;
pub mod session;
pub mod statement;
pub mod value;

pub use cache::DescriptorCache;
pub use client::{Connection, ConnectionProvider};
pub use config::OrmConfig;
pub use descriptor::{Descriptor, FieldDescriptor, PrimaryKey};
pub use entity::{Entity, EntityDeclaration, FieldDeclaration, KeyStrategy};
pub use error::{OrmError, OrmResult};
pub use row::Row;
pub use session::Session;
pub use statement::{PlaceholderStyle, Statement, StatementKind};
pub use value::{FromValue, ToValue, Value, ValueMismatch};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{Orm, create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgmap_derive::Entity;
