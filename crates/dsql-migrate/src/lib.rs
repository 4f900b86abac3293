//! # dsql-migrate
//!
//! Schema management on top of `dsql-core`.
//!
//! `dsql-migrate` renders and applies dialect-aware DDL through the same
//! [`Connection`](dsql_core::Connection) seam the query builder executes
//! against:
//! - **Schema types** - `TableDef`, `ColumnDef`, `ColumnType`, and
//!   `DefaultValue` describe a table independently of any dialect and
//!   serialize to JSON for snapshot storage
//! - **Migrator** - creates and drops tables, probes for their existence,
//!   and creates indexes, resolving type names and identifier quoting per
//!   dialect
//!
//! # Example
//!
//! ```rust,ignore
//! use dsql_migrate::prelude::*;
//!
//! let table = TableDef::new("user")
//!     .id("id")
//!     .column(ColumnDef::new("name", ColumnType::String(255)).not_null())
//!     .column(
//!         ColumnDef::new("created_at", ColumnType::DateTime)
//!             .default_value(DefaultValue::Expression("CURRENT_TIMESTAMP".into())),
//!     );
//!
//! let mut migrator = Migrator::new(&mut connection);
//! migrator.drop_table_if_exists("user")?;
//! migrator.create_table(&table)?;
//! migrator.create_index("user", "user_name_idx", &["name"], false)?;
//! ```

pub mod error;
pub mod migrator;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MigrateError, Result};
    pub use crate::migrator::Migrator;
    pub use crate::schema::{ColumnDef, ColumnType, DefaultValue, TableDef};
}

pub use error::{MigrateError, Result};
pub use migrator::Migrator;
pub use schema::{ColumnDef, ColumnType, DefaultValue, TableDef};
