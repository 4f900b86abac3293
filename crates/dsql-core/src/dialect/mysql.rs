use super::{base_template, concat_parts, convert_to_positional, map_placeholders, Dialect};
use crate::error::Result;
use crate::exec::ExecParams;
use crate::expr::{Expression, Operand};
use crate::param::Params;
use crate::query::Mode;
use crate::value::Value;

/// MySQL and MariaDB.
#[derive(Debug)]
pub struct Mysql {
    /// MySQL 5.x has no `regexp_replace()` and its `regexp` cannot take
    /// inline flags; LIKE patterns are rewritten with nested `replace()`
    /// calls instead.
    legacy_5x: bool,
}

/// MySQL 8.x / MariaDB.
pub static MYSQL: Mysql = Mysql { legacy_5x: false };

/// MySQL 5.x.
pub static MYSQL_5X: Mysql = Mysql { legacy_5x: true };

impl Mysql {
    fn replace_call(&self, sql: String, search: &str, replacement: &str) -> String {
        format!(
            "replace({sql}, {}, {})",
            self.escape_string_literal(search),
            self.escape_string_literal(replacement),
        )
    }

    /// Escapes a LIKE pattern without `regexp_replace()`: backslashes
    /// already escaping `\`, `_` or `%` are parked with a `*` sentinel,
    /// every remaining backslash is doubled, then the parked ones are
    /// restored.
    fn legacy_like_pattern(&self, sql_right: &str) -> String {
        let mut sql = String::from(sql_right);
        for v in ["\\", "_", "%"] {
            sql = self.replace_call(sql, &format!("\\{v}"), &format!("\\{v}*"));
        }
        sql = self.replace_call(sql, "\\", "\\\\");
        for v in ["_", "%", "\\"] {
            let doubled = v.replace('\\', "\\\\");
            sql = self.replace_call(sql, &format!("\\\\{doubled}*"), &format!("\\{v}"));
        }
        // trailing backslash after % confuses the server-side matcher
        self.replace_call(sql, "%\\", "%\\\\")
    }
}

impl Dialect for Mysql {
    fn name(&self) -> &'static str {
        if self.legacy_5x {
            "mysql-5.x"
        } else {
            "mysql"
        }
    }

    fn identifier_escape_char(&self) -> char {
        '`'
    }

    fn template(&self, mode: Mode) -> Result<&'static str> {
        Ok(match mode {
            // multi-table update needs the join rendered after the table
            Mode::Update => "update [table][join] set [set] [where]",
            _ => base_template(mode),
        })
    }

    fn escape_string_literal(&self, value: &str) -> String {
        let mut parts = vec![];
        for (i, v) in value.split('\0').enumerate() {
            if i > 0 {
                parts.push(String::from("x'00'"));
            }
            if !v.is_empty() {
                parts.push(format!(
                    "'{}'",
                    v.replace('\\', "\\\\").replace('\'', "''")
                ));
            }
        }
        if parts.is_empty() {
            parts.push(String::from("''"));
        }
        concat_parts(parts, &|a, b| format!("CONCAT({a}, {b})"))
    }

    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        let pattern = if self.legacy_5x {
            self.legacy_like_pattern(sql_right)
        } else {
            format!(
                "regexp_replace({sql_right}, {}, {})",
                self.escape_string_literal(r"\\\\|\\(?![_%])"),
                self.escape_string_literal(r"\\\\"),
            )
        };
        format!(
            "{sql_left}{} like {pattern} escape {}",
            if negated { " not" } else { "" },
            self.escape_string_literal("\\"),
        )
    }

    fn render_condition_regexp(
        &self,
        negated: bool,
        sql_left: &str,
        sql_right: &str,
        binary: bool,
    ) -> String {
        let _ = binary;
        let not = if negated { " not" } else { "" };
        if self.legacy_5x {
            format!("{sql_left}{not} regexp {sql_right}")
        } else {
            format!(
                "{sql_left}{not} regexp concat({}, {sql_right})",
                self.escape_string_literal("(?s)"),
            )
        }
    }

    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        Ok(Expression::new(
            me,
            format!(
                "group_concat({{}} separator {})",
                self.escape_string_literal(separator)
            ),
        )
        .arg(field))
    }

    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        // some drivers bind floats as text, losing the numeric affinity
        let sql = map_placeholders(&sql, &params, &mut |name, value| {
            if matches!(value, Value::Float(_)) {
                format!("({name} + 0.00)")
            } else {
                String::from(name)
            }
        });
        if self.has_native_named_params() {
            (sql, ExecParams::Named(params))
        } else {
            convert_to_positional(&sql, &params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string_literal_backslash() {
        assert_eq!(MYSQL.escape_string_literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_escape_string_literal_nul() {
        assert_eq!(
            MYSQL.escape_string_literal("a\0b"),
            "CONCAT('a', CONCAT(x'00', 'b'))"
        );
        assert_eq!(MYSQL.escape_string_literal("\0"), "x'00'");
    }

    #[test]
    fn test_like_uses_regexp_replace() {
        let sql = MYSQL.render_condition_like(false, "`name`", ":a");
        assert_eq!(
            sql,
            r"`name` like regexp_replace(:a, '\\\\\\\\|\\\\(?![_%])', '\\\\\\\\') escape '\\'"
        );
    }

    #[test]
    fn test_legacy_like_uses_replace_chain() {
        let sql = MYSQL_5X.render_condition_like(true, "`name`", ":a");
        assert!(sql.starts_with("`name` not like replace("));
        assert!(!sql.contains("regexp_replace"));
        assert!(sql.ends_with(r"escape '\\'"));
    }

    #[test]
    fn test_regexp_dot_matches_all() {
        assert_eq!(
            MYSQL.render_condition_regexp(false, "`a`", ":a", false),
            "`a` regexp concat('(?s)', :a)"
        );
        assert_eq!(
            MYSQL_5X.render_condition_regexp(true, "`a`", ":a", false),
            "`a` not regexp :a"
        );
    }

    #[test]
    fn test_float_param_wrapped() {
        let mut params = Params::new();
        params.insert(String::from(":a"), Value::Float(1.5));
        params.insert(String::from(":b"), Value::Int(2));
        let (sql, exec) = MYSQL
            .update_render_before_execute(String::from("select :a, :b"), params);
        assert_eq!(sql, "select (:a + 0.00), :b");
        assert!(matches!(exec, ExecParams::Named(p) if p.len() == 2));
    }
}
