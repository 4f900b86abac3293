use super::{base_template, concat_parts, map_placeholders, Dialect};
use crate::encoding;
use crate::error::{Error, Result};
use crate::exec::ExecParams;
use crate::expr::{hex_lower, Expression, Operand};
use crate::param::Params;
use crate::query::Mode;
use crate::value::Value;

/// PostgreSQL.
#[derive(Debug)]
pub struct Postgres;

/// Shared [`Postgres`] instance.
pub static POSTGRES: Postgres = Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn template(&self, mode: Mode) -> Result<&'static str> {
        match mode {
            // multi-table update needs the join rendered after the table
            Mode::Update => Ok("update [table][join] set [set] [where]"),
            Mode::Replace => Err(Error::UnsupportedMode {
                mode: String::from(mode.as_str()),
            }),
            _ => Ok(base_template(mode)),
        }
    }

    fn escape_string_literal(&self, value: &str) -> String {
        if encoding::binary_is_encoded(value) {
            if let Ok(payload) = encoding::binary_decode(value) {
                return format!("decode('{}', 'hex')", hex_lower(&payload));
            }
        }

        let mut parts = vec![];
        for (i, v) in value.split('\0').enumerate() {
            if i > 0 {
                // raises a server error, PostgreSQL text cannot hold \0
                parts.push(String::from("convert_from(decode('00', 'hex'), 'UTF8')"));
            }
            if !v.is_empty() {
                parts.push(format!("'{}'", v.replace('\'', "''")));
            }
        }
        if parts.is_empty() {
            parts.push(String::from("''"));
        }
        concat_parts(parts, &|a, b| format!("CONCAT({a}, {b})"))
    }

    fn render_limit(&self, cnt: u64, shift: u64, has_order: bool) -> String {
        let _ = has_order;
        format!(" limit {cnt} offset {shift}")
    }

    fn adapt_condition(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        operator: String,
        value: Operand,
    ) -> Result<(Operand, String, Operand)> {
        // pattern operators must not be case-sensitive even on citext-less
        // columns, so the left side is cast explicitly
        if matches!(
            operator.as_str(),
            "like" | "not like" | "regexp" | "not regexp"
        ) {
            let field = Operand::Expr(Expression::new(me, "CAST([] AS citext)").arg(field));
            return Ok((field, operator, value));
        }
        Ok((field, operator, value))
    }

    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        let pattern = format!(
            "regexp_replace({sql_right}, {}, {}, {})",
            self.escape_string_literal(r"(\\[\\_%])|(\\)"),
            self.escape_string_literal(r"\1\2\2"),
            self.escape_string_literal("g"),
        );
        format!(
            "{sql_left}{} like {pattern} escape {}",
            if negated { " not" } else { "" },
            self.escape_string_literal("\\"),
        )
    }

    // "~*" instead of regexp_like() to keep PostgreSQL v14 support
    fn render_condition_regexp(
        &self,
        negated: bool,
        sql_left: &str,
        sql_right: &str,
        binary: bool,
    ) -> String {
        let _ = binary;
        format!(
            "{sql_left} {}~* {sql_right}",
            if negated { "!" } else { "" }
        )
    }

    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        Ok(Expression::new(me, "string_agg({}, [])")
            .arg(field)
            .arg(separator))
    }

    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        // the text protocol binds everything as text, so scalar types are
        // restated with casts
        let sql = map_placeholders(&sql, &params, &mut |name, value| match value {
            Value::Bool(_) => format!("cast({name} as BOOLEAN)"),
            Value::Int(_) => format!("cast({name} as BIGINT)"),
            Value::Float(_) => format!("cast({name} as DOUBLE PRECISION)"),
            _ => String::from(name),
        });
        (sql, ExecParams::Named(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_replace_mode() {
        assert!(matches!(
            POSTGRES.template(Mode::Replace),
            Err(Error::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn test_limit_shape() {
        assert_eq!(POSTGRES.render_limit(10, 20, false), " limit 10 offset 20");
    }

    #[test]
    fn test_like_has_global_flag() {
        let sql = POSTGRES.render_condition_like(false, "\"a\"", ":a");
        assert_eq!(
            sql,
            r#""a" like regexp_replace(:a, '(\\[\\_%])|(\\)', '\1\2\2', 'g') escape '\'"#
        );
    }

    #[test]
    fn test_regexp_operator() {
        assert_eq!(
            POSTGRES.render_condition_regexp(false, "\"a\"", ":a", false),
            "\"a\" ~* :a"
        );
        assert_eq!(
            POSTGRES.render_condition_regexp(true, "\"a\"", ":a", false),
            "\"a\" !~* :a"
        );
    }

    #[test]
    fn test_escape_string_literal_binary_envelope() {
        let encoded = encoding::binary_encode(b"\x01\x02");
        assert_eq!(
            POSTGRES.escape_string_literal(&encoded),
            "decode('0102', 'hex')"
        );
    }

    #[test]
    fn test_escape_string_literal_nul() {
        assert_eq!(
            POSTGRES.escape_string_literal("a\0"),
            "CONCAT('a', convert_from(decode('00', 'hex'), 'UTF8'))"
        );
    }

    #[test]
    fn test_execute_casts() {
        let mut params = Params::new();
        params.insert(String::from(":a"), Value::Bool(true));
        params.insert(String::from(":b"), Value::Str(String::from("x")));
        let (sql, exec) =
            POSTGRES.update_render_before_execute(String::from("select :a, :b"), params);
        assert_eq!(sql, "select cast(:a as BOOLEAN), :b");
        assert!(matches!(exec, ExecParams::Named(_)));
    }
}
