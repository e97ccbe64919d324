//! Relational storage for users
//!
//! One backend serves PostgreSQL, MySQL and SQLite through the sqlx `Any`
//! driver. Dialect differences are confined to [`dialect`]:
//!
//! ```text
//! backend_impl.rs (UserBackend over AnyPool)
//!     ├── user_update.rs  (partial SET clause)
//!     ├── schema.rs       (users table)
//!     └── dialect.rs      (URL handling, placeholders, DDL)
//! ```

pub mod backend_impl;
pub mod config;
pub mod dialect;
pub mod schema;
pub mod user_update;

pub use backend_impl::SqlBackend;
pub use config::SqlBackendConfig;
pub use dialect::SqlDialect;
pub use user_update::UserUpdateProcessor;
