//! Connection configuration.

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::fmt;

const DEFAULT_POOL_SIZE: usize = 16;

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

/// Settings used to build the connection pool.
///
/// The values are passed through to pool construction; the mapper itself
/// never reads them.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct OrmConfig {
    /// Connection URL, e.g. `postgres://localhost/app` (a `jdbc:` prefix is allowed).
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Driver identifier.
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default = "default_pool_size")]
    pub max_pool_size: usize,
}

impl fmt::Debug for OrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrmConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("driver", &self.driver)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

impl OrmConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            driver: None,
            max_pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Load from the environment, reading a `.env` file first if present.
    ///
    /// | variable             | field           |
    /// |----------------------|-----------------|
    /// | `DATABASE_URL`       | `url` (required)|
    /// | `DATABASE_USERNAME`  | `username`      |
    /// | `DATABASE_PASSWORD`  | `password`      |
    /// | `DATABASE_DRIVER`    | `driver`        |
    /// | `DATABASE_POOL_SIZE` | `max_pool_size` |
    pub fn from_env() -> OrmResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let url = lookup("DATABASE_URL")
            .ok_or_else(|| OrmError::config("DATABASE_URL is not set"))?;

        let max_pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                OrmError::config(format!("DATABASE_POOL_SIZE must be a number, got '{raw}'"))
            })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            url,
            username: lookup("DATABASE_USERNAME"),
            password: lookup("DATABASE_PASSWORD"),
            driver: lookup("DATABASE_DRIVER"),
            max_pool_size,
        })
    }

    /// Parse a TOML document with the same field names as this struct.
    ///
    /// ```toml
    /// url = "postgres://localhost/app"
    /// username = "app"
    /// max_pool_size = 8
    /// ```
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        toml::from_str(s).map_err(|e| OrmError::config(e.to_string()))
    }
}
