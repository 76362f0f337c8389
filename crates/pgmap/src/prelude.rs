//! Convenient imports for typical `pgmap` usage.
//!
//! ```ignore
//! use pgmap::prelude::*;
//! ```

pub use crate::{Entity, OrmConfig, OrmError, OrmResult, Session, Value};

#[cfg(feature = "pool")]
pub use crate::{Orm, create_pool, create_pool_with_config};
