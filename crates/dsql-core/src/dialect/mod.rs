//! SQL dialect support.
//!
//! The builder renders against a [`Dialect`] trait object. The generic
//! dialect emits portable SQL; the five platform dialects override
//! identifier quoting, statement templates, limit shapes, string literal
//! escaping, and the condition compilation hooks.

use std::fmt;

use crate::error::{Error, Result};
use crate::exec::ExecParams;
use crate::expr::{hex_lower, Expression, Operand};
use crate::param::Params;
use crate::query::Mode;
use crate::token::{is_quoted, PARAM_SCAN};

mod generic;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

pub use generic::{Generic, GENERIC};
pub use mssql::{Mssql, MSSQL};
pub use mysql::{Mysql, MYSQL, MYSQL_5X};
pub use oracle::{Oracle, ORACLE};
pub use postgres::{Postgres, POSTGRES};
pub use sqlite::{Sqlite, SQLITE};

/// Operators accepted by most dialects.
pub(crate) const DEFAULT_OPERATORS: &[&str] = &[
    "=", "!=", "<", ">", "<=", ">=", "in", "not in", "like", "not like", "regexp", "not regexp",
];

/// Dialect-specific rendering behavior.
///
/// Methods taking a `me: &'static dyn Dialect` argument construct nested
/// expressions or queries and need the dialect as a storable reference;
/// callers pass the same dialect the query was built on.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Dialect name for diagnostics.
    fn name(&self) -> &'static str;

    /// Identifier quote character. `]` quotes `[identifier]` style.
    fn identifier_escape_char(&self) -> char {
        '"'
    }

    /// First generated parameter name.
    fn param_base(&self) -> &'static str {
        "a"
    }

    /// Whether the driver binds `:name` parameters natively. When false,
    /// rendered statements are converted to positional `?` placeholders
    /// before execution.
    fn has_native_named_params(&self) -> bool {
        true
    }

    /// Condition operators this dialect accepts.
    fn supported_operators(&self) -> &'static [&'static str] {
        DEFAULT_OPERATORS
    }

    /// Statement template for a mode.
    fn template(&self, mode: Mode) -> Result<&'static str> {
        Ok(base_template(mode))
    }

    /// Table rendered when a select has no table (Oracle `DUAL`).
    fn implicit_select_table(&self) -> Option<&'static str> {
        None
    }

    /// Whether a one-row derived table requires a FROM clause.
    fn derived_table_needs_from(&self) -> bool {
        false
    }

    /// Renders a string as a SQL literal. Used where a value cannot be
    /// bound, and for debug rendering.
    fn escape_string_literal(&self, value: &str) -> String;

    /// Renders a binary payload as a SQL literal.
    fn escape_binary_literal(&self, bytes: &[u8]) -> String {
        format!("x'{}'", hex_lower(bytes))
    }

    /// Renders the limit clause, leading space included.
    fn render_limit(&self, cnt: u64, shift: u64, has_order: bool) -> String {
        let _ = has_order;
        format!(" limit {shift}, {cnt}")
    }

    /// Final pass over fully rendered SQL.
    fn post_render(&self, sql: String) -> String {
        sql
    }

    /// Whether `exists()` must be wrapped in a CASE expression to be
    /// usable as a value.
    fn wraps_exists_in_case(&self) -> bool {
        false
    }

    /// Aggregate string concatenation expression.
    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        let _ = (me, field, separator);
        Err(Error::UnsupportedGroupConcat {
            dialect: self.name(),
        })
    }

    /// Rewrites a condition before compilation. Used for typed-column
    /// handling and case-insensitivity casts.
    fn adapt_condition(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        operator: String,
        value: Operand,
    ) -> Result<(Operand, String, Operand)> {
        let _ = me;
        Ok((field, operator, value))
    }

    /// Renders a plain binary comparison.
    fn render_condition_binary(&self, operator: &str, sql_left: &str, sql_right: &str) -> String {
        format!("{sql_left} {operator} {sql_right}")
    }

    /// Renders an IN list over already-rendered element placeholders.
    fn render_condition_in(&self, negated: bool, sql_left: &str, sql_values: &[String]) -> String {
        let operator = if negated { "not in" } else { "in" };
        format!("{sql_left} {operator} ({})", sql_values.join(", "))
    }

    /// Renders a LIKE condition. The pattern uses `\` as escape character
    /// for `\`, `_` and `%`; any other backslash is literal.
    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        generic_condition_like(self, negated, sql_left, sql_right)
    }

    /// Renders a REGEXP condition. Case-insensitive unless `binary`.
    fn render_condition_regexp(
        &self,
        negated: bool,
        sql_left: &str,
        sql_right: &str,
        binary: bool,
    ) -> String {
        generic_condition_regexp(self, negated, sql_left, sql_right, binary)
    }

    /// Adjusts a rendered statement for execution: converts named
    /// parameters to positional when the driver needs it and wraps
    /// placeholders in casts where the driver binds types poorly.
    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        if self.has_native_named_params() {
            (sql, ExecParams::Named(params))
        } else {
            convert_to_positional(&sql, &params)
        }
    }
}

/// Portable LIKE rendering: the pattern is normalized with one
/// `regexp_replace()` so only `\\`, `\_` and `\%` act as escapes.
pub(crate) fn generic_condition_like<D: Dialect + ?Sized>(
    d: &D,
    negated: bool,
    sql_left: &str,
    sql_right: &str,
) -> String {
    let pattern = format!(
        "regexp_replace({sql_right}, {}, {})",
        d.escape_string_literal(r"(\\[\\_%])|(\\)"),
        d.escape_string_literal(r"\1\2\2"),
    );
    format!(
        "{sql_left}{} like {pattern} escape {}",
        if negated { " not" } else { "" },
        d.escape_string_literal("\\"),
    )
}

/// Portable REGEXP rendering via `regexp_like()` with dot-matches-all,
/// case-insensitive unless `binary`.
pub(crate) fn generic_condition_regexp<D: Dialect + ?Sized>(
    d: &D,
    negated: bool,
    sql_left: &str,
    sql_right: &str,
    binary: bool,
) -> String {
    format!(
        "{}regexp_like({sql_left}, {sql_right}, {})",
        if negated { "not " } else { "" },
        d.escape_string_literal(if binary { "s" } else { "is" }),
    )
}

/// Base statement templates shared by most dialects.
pub(crate) const fn base_template(mode: Mode) -> &'static str {
    match mode {
        Mode::Select => {
            "[with]select[option] [field] [from] [table][join][where][group][having][order][limit]"
        }
        Mode::Insert => "insert[option] into [tableNoalias] ([setFields]) values ([setValues])",
        Mode::Replace => "replace[option] into [tableNoalias] ([setFields]) values ([setValues])",
        Mode::Update => "[with]update [tableNoalias] set [set] [where]",
        Mode::Delete => "[with]delete [from] [tableNoalias][where][having]",
        Mode::Truncate => "truncate table [tableNoalias]",
    }
}

/// Replaces `:name` placeholders with `?`, collecting values in
/// occurrence order. Quoted tokens and `::type` casts are untouched.
pub(crate) fn convert_to_positional(sql: &str, params: &Params) -> (String, ExecParams) {
    let mut out = String::with_capacity(sql.len());
    let mut values = vec![];
    let mut last = 0;
    for m in PARAM_SCAN.find_iter(sql) {
        out.push_str(&sql[last..m.start()]);
        last = m.end();
        let t = m.as_str();
        if is_quoted(t) || t.starts_with("::") {
            out.push_str(t);
            continue;
        }
        match params.get(t) {
            Some(v) => {
                values.push(v.clone());
                out.push('?');
            }
            None => out.push_str(t),
        }
    }
    out.push_str(&sql[last..]);
    (out, ExecParams::Positional(values))
}

/// Rewrites each `:name` placeholder outside quoted tokens with the
/// closure's output. Used by the per-dialect execution cast wrappers.
pub(crate) fn map_placeholders(
    sql: &str,
    params: &Params,
    map: &mut dyn FnMut(&str, &crate::value::Value) -> String,
) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for m in PARAM_SCAN.find_iter(sql) {
        out.push_str(&sql[last..m.start()]);
        last = m.end();
        let t = m.as_str();
        if is_quoted(t) || t.starts_with("::") {
            out.push_str(t);
            continue;
        }
        match params.get(t) {
            Some(v) => out.push_str(&map(t, v)),
            None => out.push_str(t),
        }
    }
    out.push_str(&sql[last..]);
    out
}

/// Splits literal parts on NUL and joins the rendered pieces with a
/// dialect concatenation. Shared by the MySQL, PostgreSQL, and SQLite
/// string literal escapers.
pub(crate) fn concat_parts(parts: Vec<String>, join: &dyn Fn(String, String) -> String) -> String {
    crate::expr::make_nary_tree(parts, 2, &mut |mut group: Vec<String>| {
        if group.len() == 1 {
            group.pop().unwrap_or_default()
        } else {
            let right = group.pop().unwrap_or_default();
            let left = group.pop().unwrap_or_default();
            join(left, right)
        }
    })
}
