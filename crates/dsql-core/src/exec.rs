//! Execution seam.
//!
//! Rendering produces SQL text plus named parameters; executing it is the
//! driver's business. The [`Connection`] trait is the narrow waist a driver
//! implements, and [`Query::execute`] / [`Query::fetch`] run a built
//! statement through it after the dialect's pre-execution rewrite
//! (named-to-positional conversion, driver type-cast wrappers).

use indexmap::IndexMap;
use thiserror::Error;

use crate::dialect::Dialect;
use crate::param::Params;
use crate::query::Query;
use crate::value::Value;

/// Parameters in the form the driver binds them.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecParams {
    /// `:name` placeholders, bound by name.
    Named(Params),
    /// `?` placeholders, bound left to right.
    Positional(Vec<Value>),
}

impl ExecParams {
    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Named(params) => params.len(),
            Self::Positional(values) => values.len(),
        }
    }

    /// Whether no parameters are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One result row, keyed by column name in select order.
pub type Row = IndexMap<String, Value>;

/// Errors surfaced when running a statement.
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// The statement could not be rendered in the first place.
    #[error("statement could not be rendered: {0}")]
    Render(#[from] crate::error::Error),

    /// The server rejected the statement.
    #[error("execution failed: {message}")]
    Server {
        /// Driver error message.
        message: String,
        /// Vendor-specific error code, when the driver reports one.
        code: Option<i64>,
        /// Statement with parameters inlined, for diagnostics.
        query: String,
    },
}

impl ExecuteError {
    /// Builds a server-side error.
    #[must_use]
    pub fn server(message: impl Into<String>, code: Option<i64>, query: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            code,
            query: query.into(),
        }
    }
}

/// Minimal driver interface the builder executes against.
pub trait Connection {
    /// Dialect this connection speaks.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Runs a statement, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &ExecParams) -> Result<u64, ExecuteError>;

    /// Runs a statement, returning its rows.
    fn query(&mut self, sql: &str, params: &ExecParams) -> Result<Vec<Row>, ExecuteError>;
}

/// Applies the dialect's pre-execution rewrite to a rendered statement.
#[must_use]
pub fn prepare_for_execute(
    dialect: &dyn Dialect,
    sql: String,
    params: Params,
) -> (String, ExecParams) {
    dialect.update_render_before_execute(sql, params)
}

impl Query {
    /// Renders and runs this statement, returning the affected row count.
    pub fn execute(&self, connection: &mut dyn Connection) -> Result<u64, ExecuteError> {
        let (sql, params) = self.prepare(connection)?;
        connection.execute(&sql, &params)
    }

    /// Renders and runs this statement, returning its rows.
    pub fn fetch(&self, connection: &mut dyn Connection) -> Result<Vec<Row>, ExecuteError> {
        let (sql, params) = self.prepare(connection)?;
        connection.query(&sql, &params)
    }

    fn prepare(&self, connection: &dyn Connection) -> Result<(String, ExecParams), ExecuteError> {
        let (sql, params) = self.render()?;
        let (sql, params) = prepare_for_execute(connection.dialect(), sql, params);
        tracing::debug!(sql = %sql, params = params.len(), "execute statement");
        Ok((sql, params))
    }
}
