use super::{concat_parts, generic_condition_like, Dialect};
use crate::condition::{binary_reuse, reuse_needed};
use crate::encoding::BINARY_PREFIX;
use crate::error::{Error, Result};
use crate::exec::ExecParams;
use crate::expr::{ColumnType, Expression, Operand};
use crate::param::{Params, RenderCtx};
use crate::token::{is_quoted, PARAM_SCAN};
use crate::value::Value;

/// Oracle Database.
#[derive(Debug)]
pub struct Oracle;

/// Shared [`Oracle`] instance.
pub static ORACLE: Oracle = Oracle;

/// String literals above this many bytes must travel as CLOB chunks.
const LITERAL_CHUNK_BYTES: usize = 1000;

/// Bound strings above this many bytes must travel as CLOB chunks.
const BIND_LIMIT_BYTES: usize = 4000;

impl Oracle {
    /// Reuses non-trivial operands through a derived table, mapping the
    /// boolean result to `1`/`0` so it survives the select list.
    fn reuse_bool(
        &self,
        sql_left: &str,
        sql_right: &str,
        null_from_args_only: bool,
        make: &dyn Fn(&str, &str) -> String,
    ) -> String {
        let reuse = reuse_needed(sql_left, sql_right, true, true);
        let wrapped = binary_reuse(self, sql_left, sql_right, true, true, "reuse", &|l, r| {
            let res = make(l, r);
            if reuse {
                let null_check = if null_from_args_only {
                    format!("{l} is not null and {r} is not null")
                } else {
                    res.clone()
                };
                format!("case when not({res}) then 0 else case when {null_check} then 1 end end")
            } else {
                res
            }
        });
        if reuse {
            format!("{wrapped} = 1")
        } else {
            wrapped
        }
    }

    fn render_clob_chunks(&self, value: &str, ctx: &mut RenderCtx) -> String {
        let parts = split_long_string(value, LITERAL_CHUNK_BYTES)
            .into_iter()
            .map(|chunk| {
                format!(
                    "TO_CLOB({})",
                    ctx.push_param(Value::Str(String::from(chunk)))
                )
            })
            .collect();
        concat_parts(parts, &|a, b| format!("concat({a}, {b})"))
    }
}

impl Dialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    // long enough to never collide with user-visible names after the
    // pre-execution renumbering
    fn param_base(&self) -> &'static str {
        "xxaaaa"
    }

    fn implicit_select_table(&self) -> Option<&'static str> {
        Some("DUAL")
    }

    fn derived_table_needs_from(&self) -> bool {
        true
    }

    fn wraps_exists_in_case(&self) -> bool {
        true
    }

    fn escape_string_literal(&self, value: &str) -> String {
        // a (multibyte) string literal is limited to 1332 bytes
        let chunks = split_long_string(value, LITERAL_CHUNK_BYTES);
        if chunks.len() > 1 {
            let parts = chunks
                .into_iter()
                .map(|chunk| format!("TO_CLOB({})", self.escape_string_literal(chunk)))
                .collect();
            return concat_parts(parts, &|a, b| format!("concat({a}, {b})"));
        }

        let mut parts = vec![];
        let mut rest = value;
        while let Some(pos) = rest.find('\0') {
            if pos > 0 {
                parts.push(format!("'{}'", rest[..pos].replace('\'', "''")));
            }
            let run = rest[pos..].bytes().take_while(|b| *b == 0).count();
            parts.push(if run == 1 {
                String::from("chr(0)")
            } else {
                format!("rpad(chr(0), {run}, chr(0))")
            });
            rest = &rest[pos + run..];
        }
        if !rest.is_empty() {
            parts.push(format!("'{}'", rest.replace('\'', "''")));
        }
        if parts.is_empty() {
            parts.push(String::from("''"));
        }
        concat_parts(parts, &|a, b| format!("concat({a}, {b})"))
    }

    fn render_limit(&self, cnt: u64, shift: u64, has_order: bool) -> String {
        let _ = has_order;
        format!(
            "{} fetch next {cnt} rows only",
            if shift > 0 {
                format!(" offset {shift} rows")
            } else {
                String::new()
            },
        )
    }

    /// CLOB and BLOB columns cannot be compared directly; equality goes
    /// through `dbms_lob.compare()` and text comparisons are lowercased
    /// to keep the case-insensitivity of the other dialects.
    fn adapt_condition(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        operator: String,
        value: Operand,
    ) -> Result<(Operand, String, Operand)> {
        let ty = match &field {
            Operand::Column(c) => c.ty,
            _ => None,
        };
        let Some(ty) = ty else {
            return Ok((field, operator, value));
        };

        if ty == ColumnType::Blob && matches!(operator.as_str(), "regexp" | "not regexp") {
            return Err(Error::UnsupportedTypedFieldOperator {
                operator,
                type_name: ty.type_name(),
            });
        }

        if matches!(ty, ColumnType::Text | ColumnType::Blob) {
            let lower = |operand: Operand| {
                Operand::Expr(Expression::new(me, "LOWER([])").arg(operand))
            };
            match operator.as_str() {
                "=" | "!=" => {
                    let (field, value) = if ty == ColumnType::Text {
                        (lower(field), lower(value))
                    } else {
                        (field, value)
                    };
                    let compare = Expression::new(me, "dbms_lob.compare([], [])")
                        .arg(field)
                        .arg(value);
                    return Ok((Operand::Expr(compare), operator, Operand::from(0_i64)));
                }
                "like" | "not like" => {
                    if ty == ColumnType::Text {
                        return Ok((lower(field), operator, lower(value)));
                    }
                }
                "regexp" | "not regexp" => {}
                _ => {
                    return Err(Error::UnsupportedTypedFieldOperator {
                        operator,
                        type_name: ty.type_name(),
                    })
                }
            }
        }

        Ok((field, operator, value))
    }

    fn render_condition_like(&self, negated: bool, sql_left: &str, sql_right: &str) -> String {
        let inner = self.reuse_bool(sql_left, sql_right, true, &|l, r| {
            let starts_with_prefix = |sql: &str| {
                format!(
                    "{sql} like {}",
                    self.escape_string_literal(&format!("{BINARY_PREFIX}{}%", "_".repeat(8))),
                )
            };
            // strips the envelope down to the hex payload, or hex-encodes
            // a plain string, so both sides compare in hex space
            let encode_without_prefix = |sql: &str| {
                format!(
                    "case when {} then to_char(substr({sql}, {})) \
                     else rawtohex(utl_raw.cast_to_raw({sql})) end",
                    starts_with_prefix(sql),
                    BINARY_PREFIX.len() + 9,
                )
            };

            // LIKE pattern to hex-space regexp: park escaped wildcards,
            // expand bare ones, restore the parked hex pairs
            let mut mapped = encode_without_prefix(r);
            // hex pairs for "\\", "\_", "\%", "\", "_" and "%"
            let map: [(&str, &str); 9] = [
                ("5c5c", "x"),
                ("5c5f", "y"),
                ("5c25", "z"),
                ("5c", "x"),
                ("5f", ".."),
                ("25", "(..)*"),
                ("x", "5c"),
                ("y", "5f"),
                ("z", "25"),
            ];
            for (search, replacement) in map {
                mapped = format!(
                    "replace({mapped}, {}, {})",
                    self.escape_string_literal(search),
                    self.escape_string_literal(replacement),
                );
            }

            format!(
                "case when {l} is null or {r} is null then null \
                 when {} or {} then case when {} then 1 else 0 end \
                 else case when {} then 1 else 0 end end = 1",
                starts_with_prefix(l),
                starts_with_prefix(r),
                self.render_condition_regexp(
                    false,
                    &encode_without_prefix(l),
                    &format!(
                        "concat({}, concat({mapped}, {}))",
                        self.escape_string_literal("^"),
                        self.escape_string_literal("$"),
                    ),
                    false,
                ),
                generic_condition_like(self, false, l, r),
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
        format!(
            "{}regexp_like({sql_left}, {sql_right}, {})",
            if negated { "not " } else { "" },
            self.escape_string_literal(if binary { "cn" } else { "in" }),
        )
    }

    fn group_concat_expr(
        &self,
        me: &'static dyn Dialect,
        field: Operand,
        separator: &str,
    ) -> Result<Expression> {
        Ok(
            Expression::new(me, "listagg({field}, []) within group (order by {field})")
                .named_arg("field", field)
                .arg(separator),
        )
    }

    /// Full re-parameterization pass: long strings become CLOB chunk
    /// concatenations, every surviving parameter is renumbered in
    /// occurrence order, and scalar binds get their type restated.
    fn update_render_before_execute(&self, sql: String, params: Params) -> (String, ExecParams) {
        let mut ctx = RenderCtx::new(self.param_base());
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;
        for m in PARAM_SCAN.find_iter(&sql) {
            out.push_str(&sql[last..m.start()]);
            last = m.end();
            let t = m.as_str();

            if (is_quoted(t) && !t.starts_with('\'')) || t.starts_with("::") {
                out.push_str(t);
                continue;
            }
            if t.starts_with('\'') {
                let inner = t[1..t.len() - 1].replace("''", "'");
                if inner.len() > BIND_LIMIT_BYTES {
                    out.push_str(&self.render_clob_chunks(&inner, &mut ctx));
                } else {
                    out.push_str(t);
                }
                continue;
            }

            match params.get(t) {
                None => out.push_str(t),
                Some(Value::Str(s)) if s.len() > BIND_LIMIT_BYTES => {
                    out.push_str(&self.render_clob_chunks(s, &mut ctx));
                }
                Some(v) => {
                    let name = ctx.push_param(v.clone());
                    match v {
                        Value::Bool(_) | Value::Int(_) => {
                            out.push_str(&format!("cast({name} as INTEGER)"));
                        }
                        Value::Float(_) => {
                            out.push_str(&format!("cast({name} as BINARY_DOUBLE)"));
                        }
                        _ => out.push_str(&name),
                    }
                }
            }
        }
        out.push_str(&sql[last..]);
        (out, ExecParams::Named(ctx.into_params()))
    }
}

/// Splits a string into chunks of at most `length_bytes` bytes, never
/// inside a UTF-8 sequence.
fn split_long_string(value: &str, length_bytes: usize) -> Vec<&str> {
    let mut res = vec![];
    let mut rest = value;
    while rest.len() > length_bytes {
        let mut len = length_bytes;
        while !rest.is_char_boundary(len) {
            len -= 1;
        }
        let (head, tail) = rest.split_at(len);
        res.push(head);
        rest = tail;
    }
    res.push(rest);
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column;

    #[test]
    fn test_split_long_string_respects_char_boundaries() {
        let value = format!("{}é", "a".repeat(999));
        let parts = split_long_string(&value, 1000);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "a".repeat(999));
        assert_eq!(parts[1], "é");
    }

    #[test]
    fn test_escape_string_literal_nul_runs() {
        assert_eq!(
            ORACLE.escape_string_literal("a\0\0\0b"),
            "concat('a', concat(rpad(chr(0), 3, chr(0)), 'b'))"
        );
    }

    #[test]
    fn test_escape_long_string_goes_clob() {
        let sql = ORACLE.escape_string_literal(&"x".repeat(2500));
        assert!(sql.starts_with("concat("));
        assert!(sql.contains("TO_CLOB('"));
    }

    #[test]
    fn test_limit_skips_zero_offset() {
        assert_eq!(ORACLE.render_limit(5, 0, false), " fetch next 5 rows only");
        assert_eq!(
            ORACLE.render_limit(5, 10, false),
            " offset 10 rows fetch next 5 rows only"
        );
    }

    #[test]
    fn test_regexp_flags() {
        assert_eq!(
            ORACLE.render_condition_regexp(false, "\"a\"", ":xxaaaa", false),
            "regexp_like(\"a\", :xxaaaa, 'in')"
        );
        assert_eq!(
            ORACLE.render_condition_regexp(true, "\"a\"", ":xxaaaa", true),
            "not regexp_like(\"a\", :xxaaaa, 'cn')"
        );
    }

    #[test]
    fn test_blob_regexp_rejected() {
        let field = Operand::Column(column("data").typed(ColumnType::Blob));
        let err = ORACLE
            .adapt_condition(&ORACLE, field, String::from("regexp"), Operand::from("x"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedTypedFieldOperator { type_name: "blob", .. }
        ));
    }

    #[test]
    fn test_text_equality_goes_dbms_lob() {
        let field = Operand::Column(column("notes").typed(ColumnType::Text));
        let (field, operator, value) = ORACLE
            .adapt_condition(&ORACLE, field, String::from("="), Operand::from("x"))
            .unwrap();
        assert!(matches!(field, Operand::Expr(_)));
        assert_eq!(operator, "=");
        assert!(matches!(value, Operand::Value(Value::Int(0))));
    }

    #[test]
    fn test_execute_renumbers_and_casts() {
        let mut params = Params::new();
        params.insert(String::from(":xxaaaa"), Value::Int(7));
        params.insert(String::from(":xxaaab"), Value::Str(String::from("x")));
        let (sql, exec) = ORACLE.update_render_before_execute(
            String::from("select :xxaaaa, :xxaaab from DUAL"),
            params,
        );
        assert_eq!(
            sql,
            "select cast(:xxaaaa as INTEGER), :xxaaab from DUAL"
        );
        let ExecParams::Named(new_params) = exec else {
            panic!("expected named params");
        };
        assert_eq!(
            new_params.keys().cloned().collect::<Vec<_>>(),
            vec![":xxaaaa", ":xxaaab"]
        );
    }

    #[test]
    fn test_execute_long_string_goes_clob() {
        let mut params = Params::new();
        params.insert(String::from(":xxaaaa"), Value::Str("y".repeat(4100)));
        let (sql, exec) = ORACLE
            .update_render_before_execute(String::from("update t set x=:xxaaaa"), params);
        assert!(sql.contains("concat(TO_CLOB(:xxaaaa), "));
        let ExecParams::Named(new_params) = exec else {
            panic!("expected named params");
        };
        assert_eq!(new_params.len(), 5);
    }
}
