use super::{
    base_template, concat_parts, generic_condition_regexp, map_placeholders, Dialect,
};
use crate::condition::binary_reuse;
use crate::error::Result;
use crate::exec::ExecParams;
use crate::expr::{Expression, Operand};
use crate::param::Params;
use crate::query::Mode;
use crate::value::Value;

/// SQLite.
#[derive(Debug)]
pub struct Sqlite;

/// Shared [`Sqlite`] instance.
pub static SQLITE: Sqlite = Sqlite;

impl Sqlite {
    fn check_numeric_sql(&self, sql: &str) -> String {
        format!(
            "typeof({sql}) in ({}, {})",
            self.escape_string_literal("integer"),
            self.escape_string_literal("real"),
        )
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_escape_char(&self) -> char {
        '`'
    }

    fn template(&self, mode: Mode) -> Result<&'static str> {
        Ok(match mode {
            Mode::Truncate => "delete [from] [tableNoalias]",
            _ => base_template(mode),
        })
    }

    fn escape_string_literal(&self, value: &str) -> String {
        let mut parts = vec![];
        for (i, v) in value.split('\0').enumerate() {
            if i > 0 {
                parts.push(String::from("x'00'"));
            }
            if !v.is_empty() || i == 0 {
                parts.push(format!("'{}'", v.replace('\'', "''")));
            }
        }
        concat_parts(parts, &|a, b| format!("({a} || {b})"))
    }

    /// Comparisons of untyped operands follow the operand affinity, so a
    /// numeric side is cast explicitly to compare `'1'` and `1` as equal.
    fn render_condition_binary(&self, operator: &str, sql_left: &str, sql_right: &str) -> String {
        let allow_cast_right = !matches!(operator, "in" | "not in");
        binary_reuse(
            self,
            sql_left,
            sql_right,
            true,
            allow_cast_right,
            "affinity",
            &|l, r| {
                let mut res = format!(
                    "case when {} then cast({l} as numeric) {operator} {r} else ",
                    self.check_numeric_sql(l),
                );
                if allow_cast_right {
                    res.push_str(&format!(
                        "case when {} then {l} {operator} cast({r} as numeric) else ",
                        self.check_numeric_sql(r),
                    ));
                }
                res.push_str(&format!("{l} {operator} {r}"));
                if allow_cast_right {
                    res.push_str(" end");
                }
                res.push_str(" end");
                res
            },
        )
    }

    fn render_condition_in(&self, negated: bool, sql_left: &str, sql_values: &[String]) -> String {
        let inner = sql_values
            .iter()
            .map(|v| self.render_condition_binary("=", sql_left, v))
            .collect::<Vec<_>>()
            .join(" or ");
        if negated {
            format!("not ({inner})")
        } else {
            format!("({inner})")
        }
    }

    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        let inner = binary_reuse(self, sql_left, sql_right, true, true, "reuse", &|l, r| {
            let regexp_replace = |sql: String, search: &str, replacement: &str| {
                format!(
                    "regexp_replace({sql}, {}, {})",
                    self.escape_string_literal(search),
                    self.escape_string_literal(replacement),
                )
            };

            // LIKE is case-insensitive for ASCII only; non-ASCII input is
            // routed through a regexp built from the LIKE pattern
            let pattern = regexp_replace(
                regexp_replace(
                    regexp_replace(
                        regexp_replace(
                            String::from(r),
                            r"\\(?:(?=[_%])|\K\\)|(?=[.\\+*?[^\]$(){}|])",
                            r"\",
                        ),
                        r"(?<!\\)(\\\\)*\K_",
                        ".",
                    ),
                    r"(?<!\\)(\\\\)*\K%",
                    ".*",
                ),
                r"(?<!\\)(\\\\)*\K\\(?=[_%])",
                "",
            );

            format!(
                "({} and (({l} = lower({l}) and {l} = upper({l})) or {}))",
                super::generic_condition_like(self, false, l, r),
                generic_condition_regexp(
                    self,
                    false,
                    l,
                    &format!(
                        "concat({},{pattern}, {})",
                        self.escape_string_literal("^"),
                        self.escape_string_literal("$"),
                    ),
                    true,
                ),
            )
        });
        format!("{}{inner}", if negated { "not " } else { "" })
    }

    fn render_condition_regexp(
        &self,
        negated: bool,
        sql_left: &str,
        sql_right: &str,
        binary: bool,
    ) -> String {
        if binary {
            return generic_condition_regexp(self, negated, sql_left, sql_right, binary);
        }

        let inner = binary_reuse(self, sql_left, sql_right, true, true, "reuse", &|l, r| {
            format!(
                "case when {l} = lower({l}) and {l} = upper({l}) then {} else {} end",
                generic_condition_regexp(self, false, l, r, false),
                generic_condition_regexp(self, false, l, r, true),
            )
        });
        format!("{}{inner}", if negated { "not " } else { "" })
    }

    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        Ok(Expression::new(me, "group_concat({}, [])")
            .arg(field)
            .arg(separator))
    }

    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        // keep integer/float affinity across drivers binding text
        let sql = map_placeholders(&sql, &params, &mut |name, value| match value {
            Value::Int(_) => format!("cast({name} as INTEGER)"),
            Value::Float(_) => format!("cast({name} as DOUBLE PRECISION)"),
            _ => String::from(name),
        });
        (sql, ExecParams::Named(params))
    }
}
