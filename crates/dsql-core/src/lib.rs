//! # dsql-core
//!
//! A dialect-aware SQL expression and query builder.
//!
//! This crate provides:
//! - Expression templates with parameter, identifier, and soft-identifier
//!   placeholders
//! - A statement builder for select / insert / update / delete / replace /
//!   truncate with joins, CTEs, and nested subqueries
//! - A condition compiler that validates operators per dialect and keeps
//!   LIKE and REGEXP semantics identical across platforms
//! - Six dialects: generic, MySQL (plus a 5.x profile), PostgreSQL,
//!   SQLite, SQL Server, and Oracle
//!
//! ## Building a query
//!
//! ```rust
//! use dsql_core::dialect::MYSQL;
//! use dsql_core::{Operand, Query};
//!
//! let (sql, params) = Query::new(&MYSQL)
//!     .table("user")?
//!     .field("name")
//!     .where_("id", Operand::list([1, 2]))?
//!     .render()?;
//!
//! assert_eq!(sql, "select `name` from `user` where `id` in (:a, :b)");
//! assert_eq!(params.len(), 2);
//! # Ok::<(), dsql_core::Error>(())
//! ```
//!
//! ## Expression templates
//!
//! Values are always bound as parameters; identifiers are escaped, so
//! user input never becomes SQL text:
//!
//! ```rust
//! use dsql_core::{column, expr};
//!
//! let (sql, params) = expr("[] + []").arg(column("age")).arg(1).render()?;
//!
//! assert_eq!(sql, "\"age\" + :a");
//! assert_eq!(params.len(), 1);
//! # Ok::<(), dsql_core::Error>(())
//! ```

mod condition;
pub mod dialect;
pub mod encoding;
pub mod error;
pub mod exec;
pub mod expr;
pub mod param;
pub mod query;
mod token;
pub mod value;

pub use error::{Error, Result};
pub use exec::{prepare_for_execute, Connection, ExecParams, ExecuteError, Row};
pub use expr::{
    column, debug_render, escape_identifier, escape_identifier_soft, expr, make_nary_tree, Column,
    ColumnType, Expression, Operand,
};
pub use param::{Params, RenderCtx};
pub use query::{query, ClauseKind, Mode, Query};
pub use value::{IntoValue, Value};
