use super::{base_template, convert_to_positional, map_placeholders, Dialect};
use crate::condition::{binary_reuse, reuse_needed};
use crate::encoding;
use crate::error::Result;
use crate::exec::ExecParams;
use crate::expr::{hex_lower, Expression, Operand};
use crate::param::Params;
use crate::query::Mode;
use crate::token::QUOTED_SCAN;
use crate::value::Value;

/// Microsoft SQL Server.
#[derive(Debug)]
pub struct Mssql;

/// Shared [`Mssql`] instance.
pub static MSSQL: Mssql = Mssql;

/// Retries the insert with IDENTITY_INSERT enabled when the server rejects
/// an explicit value for an identity column (error 544).
const INSERT_TEMPLATE: &str = "begin try
  insert[option] into [tableNoalias] ([setFields]) values ([setValues]);
end try begin catch
  if ERROR_NUMBER() = 544 begin
    set IDENTITY_INSERT [tableNoalias] on;
    begin try
      insert[option] into [tableNoalias] ([setFields]) values ([setValues]);
      set IDENTITY_INSERT [tableNoalias] off;
    end try begin catch
      set IDENTITY_INSERT [tableNoalias] off;
      throw;
    end catch
  end else begin
    throw;
  end
end catch";

impl Mssql {
    /// Reuses non-trivial operands through a derived table and converts
    /// the boolean result back to a comparable value, since a derived
    /// table column cannot hold a bare boolean expression.
    fn reuse_bool(
        &self,
        sql_left: &str,
        sql_right: &str,
        make: &dyn Fn(&str, &str) -> String,
    ) -> String {
        let reuse = reuse_needed(sql_left, sql_right, true, true);
        let wrapped = binary_reuse(self, sql_left, sql_right, true, true, "reuse", &|l, r| {
            if reuse {
                format!("iif({}, 1, 0)", make(l, r))
            } else {
                make(l, r)
            }
        });
        if reuse {
            format!("{wrapped} = 1")
        } else {
            wrapped
        }
    }
}

impl Dialect for Mssql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn identifier_escape_char(&self) -> char {
        ']'
    }

    // no regexp support on SQL Server
    fn supported_operators(&self) -> &'static [&'static str] {
        &[
            "=", "!=", "<", ">", "<=", ">=", "in", "not in", "like", "not like",
        ]
    }

    fn has_native_named_params(&self) -> bool {
        false
    }

    fn wraps_exists_in_case(&self) -> bool {
        true
    }

    fn template(&self, mode: Mode) -> Result<&'static str> {
        Ok(match mode {
            Mode::Insert => INSERT_TEMPLATE,
            _ => base_template(mode),
        })
    }

    fn escape_string_literal(&self, value: &str) -> String {
        if encoding::binary_is_encoded(value) {
            if let Ok(payload) = encoding::binary_decode(value) {
                return format!("convert(VARBINARY(MAX), '{}', 2)", hex_lower(&payload));
            }
        }

        let mut parts = vec![];
        for (i, v) in value.split('\0').enumerate() {
            if i > 0 {
                parts.push(String::from("NCHAR(0)"));
            }
            // literals over 4000 characters lose their NVARCHAR typing
            let chars: Vec<char> = v.chars().collect();
            for chunk in chars.chunks(4000) {
                if !chunk.is_empty() {
                    let part: String = chunk.iter().collect();
                    parts.push(format!("'{}'", part.replace('\'', "''")));
                }
            }
        }
        if parts.is_empty() {
            parts.push(String::from("''"));
        }
        super::concat_parts(parts, &|a, b| {
            format!("CONCAT(CAST({a} AS NVARCHAR(MAX)), {b})")
        })
    }

    fn render_limit(&self, cnt: u64, shift: u64, has_order: bool) -> String {
        let (cnt, shift) = if cnt == 0 {
            // "fetch next 0 rows" is rejected, skip past every row instead
            (1, u64::try_from(i64::MAX).unwrap_or(u64::MAX))
        } else {
            (cnt, shift)
        };
        format!(
            "{} offset {shift} rows fetch next {cnt} rows only",
            if has_order { "" } else { " order by (select null)" },
        )
    }

    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        self.reuse_bool(sql_left, sql_right, &|l, r| {
            let is_ntext = |sql: &str, negate: bool| {
                // "select top 0" collapses to a constant expression
                format!(
                    "datalength(concat((select top 0 {sql}), 0x30)) {}= 2",
                    if negate { "!" } else { "" },
                )
            };
            let is_binary = |sql: &str, negate: bool| {
                format!(
                    "isnull((select top 0 {sql}), 0x41) {}= 0x61",
                    if negate { "" } else { "!" },
                )
            };

            let make_like = |as_ntext: bool, as_binary: bool| {
                let quote = |v: &str| {
                    if as_ntext {
                        self.escape_string_literal(v)
                    } else {
                        format!("0x{}", hex_lower(v.as_bytes()))
                    }
                };
                let replace = |sql: String, search: &str, replacement: &str| {
                    format!("replace({sql}, {}, {})", quote(search), quote(replacement))
                };

                // no regexp_replace() on SQL Server, park the already
                // escaped sequences with a "*" sentinel instead
                let mut pattern = String::from(r);
                for v in ["\\", "_", "%"] {
                    pattern = replace(pattern, &format!("\\{v}"), &format!("\\{v}*"));
                }
                pattern = replace(pattern, "\\", "\\\\");
                for v in ["_", "%", "\\"] {
                    let doubled = v.replace('\\', "\\\\");
                    pattern = replace(pattern, &format!("\\\\{doubled}*"), &format!("\\{v}"));
                }
                pattern = replace(pattern, "[", "\\[");

                format!(
                    "{l}{} like {pattern}{} escape {}",
                    if negated { " not" } else { "" },
                    if as_binary {
                        " collate Latin1_General_BIN"
                    } else {
                        ""
                    },
                    quote("\\"),
                )
            };

            format!(
                "(({} and {}) or ({} and (({} and {}) or ({} and {}))))",
                is_ntext(l, false),
                make_like(true, false),
                is_ntext(l, true),
                is_binary(l, false),
                make_like(false, true),
                is_binary(l, true),
                make_like(false, false),
            )
        })
    }

    /// Converts every plain string literal to an NVARCHAR one, `'text'`
    /// to `N'text'`.
    fn post_render(&self, sql: String) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;
        for m in QUOTED_SCAN.find_iter(&sql) {
            out.push_str(&sql[last..m.start()]);
            last = m.end();
            let t = m.as_str();
            if t.starts_with('\'') && !out.ends_with('N') {
                out.push('N');
            }
            out.push_str(t);
        }
        out.push_str(&sql[last..]);
        out
    }

    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        Ok(Expression::new(
            me,
            format!("string_agg({{}}, {})", self.escape_string_literal(separator)),
        )
        .arg(field))
    }

    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        let sql = map_placeholders(&sql, &params, &mut |name, value| {
            if matches!(value, Value::Float(_)) {
                format!("cast({name} as DOUBLE PRECISION)")
            } else {
                String::from(name)
            }
        });
        convert_to_positional(&sql, &params)
    }
}
