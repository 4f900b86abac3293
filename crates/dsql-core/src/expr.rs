//! SQL expression templates.
//!
//! An [`Expression`] is a template string with three placeholder forms:
//!
//! - `[name]` / `[]` — the argument becomes a bound parameter,
//! - `{name}` / `{}` — the argument is escaped as an identifier,
//! - `{{name}}` / `{{}}` — the argument is soft-escaped, so `t.f` becomes
//!   `"t"."f"` and anything containing `(`, `*` or the escape character is
//!   passed through untouched.
//!
//! Nameless forms consume positional arguments left to right. Placeholders
//! inside string literals, quoted identifiers, and comments are not
//! expanded. Arguments may be plain values, other expressions, or whole
//! queries; nested renders share the parent's parameter counter, so names
//! stay unique across the final statement.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::dialect::{Dialect, GENERIC};
use crate::error::{Error, Result};
use crate::param::{Params, RenderCtx};
use crate::query::Query;
use crate::token::{is_quoted, PARAM_SCAN, TEMPLATE_SCAN};
use crate::value::{float_to_sql, IntoValue, Value};

/// How a consumed argument is written into the rendered SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeMode {
    /// Bind as a parameter.
    Param,
    /// Escape as an identifier, always quoted.
    Identifier,
    /// Escape as an identifier unless it contains special characters.
    IdentifierSoft,
    /// Splice verbatim.
    None,
}

/// Declared column types that change how some dialects compile conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Free-form text, possibly larger than an inline varchar.
    Text,
    /// Binary payload.
    Blob,
    /// Case-insensitive text (PostgreSQL `citext`).
    CaseInsensitiveText,
}

impl ColumnType {
    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Blob => "blob",
            Self::CaseInsensitiveText => "citext",
        }
    }
}

/// A column reference, optionally carrying its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) ty: Option<ColumnType>,
}

impl Column {
    /// Creates an untyped column reference. Dotted names soft-escape
    /// component-wise.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    /// Attaches the declared type.
    #[must_use]
    pub const fn typed(mut self, ty: ColumnType) -> Self {
        self.ty = Some(ty);
        self
    }
}

/// Shorthand for [`Column::new`].
#[must_use]
pub fn column(name: impl Into<String>) -> Column {
    Column::new(name)
}

/// A template argument: a bindable value, a column reference, a nested
/// expression or query, or a list (valid only in `in` conditions and
/// insert rows).
#[derive(Debug, Clone)]
pub enum Operand {
    /// Plain value, bound as a parameter.
    Value(Value),
    /// Column reference, soft-escaped.
    Column(Column),
    /// Nested expression.
    Expr(Expression),
    /// Nested query, rendered in parentheses.
    Query(Box<Query>),
    /// List of operands.
    List(Vec<Operand>),
}

impl Operand {
    /// Builds a list operand from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: IntoValue> From<T> for Operand {
    fn from(v: T) -> Self {
        Self::Value(v.into_value())
    }
}

impl From<Column> for Operand {
    fn from(c: Column) -> Self {
        Self::Column(c)
    }
}

impl From<Expression> for Operand {
    fn from(e: Expression) -> Self {
        Self::Expr(e)
    }
}

impl From<Query> for Operand {
    fn from(q: Query) -> Self {
        Self::Query(Box::new(q))
    }
}

/// A renderable SQL template with its arguments.
#[derive(Debug, Clone)]
pub struct Expression {
    pub(crate) dialect: &'static dyn Dialect,
    pub(crate) template: Option<String>,
    pub(crate) positional: Vec<Operand>,
    pub(crate) named: IndexMap<String, Operand>,
    pub(crate) wrap_in_parens: bool,
}

/// Creates an expression on the generic dialect.
#[must_use]
pub fn expr(template: impl Into<String>) -> Expression {
    Expression::new(&GENERIC, template)
}

impl Expression {
    /// Creates an expression bound to a dialect.
    #[must_use]
    pub fn new(dialect: &'static dyn Dialect, template: impl Into<String>) -> Self {
        Self {
            dialect,
            template: Some(template.into()),
            positional: vec![],
            named: IndexMap::new(),
            wrap_in_parens: false,
        }
    }

    /// Appends a positional argument, consumed by the next nameless tag.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Operand>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument, consumed by `[name]`/`{name}`/`{{name}}`.
    #[must_use]
    pub fn named_arg(mut self, name: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Makes nested renders wrap this expression in parentheses.
    #[must_use]
    pub const fn wrapped(mut self) -> Self {
        self.wrap_in_parens = true;
        self
    }

    /// Renders to SQL text plus named parameters.
    pub fn render(&self) -> Result<(String, Params)> {
        tracing::debug!(dialect = self.dialect.name(), "render expression");
        let mut ctx = RenderCtx::new(self.dialect.param_base());
        let sql = self.render_into(&mut ctx)?;
        let sql = self.dialect.post_render(sql);
        Ok((sql, ctx.into_params()))
    }

    pub(crate) fn render_into(&self, ctx: &mut RenderCtx) -> Result<String> {
        let template = self.template.as_deref().ok_or(Error::TemplateNotDefined)?;
        render_template(
            self.dialect,
            template,
            &self.positional,
            &self.named,
            ctx,
            &mut |_, _| Ok(None),
        )
    }

    /// Renders with parameters inlined, for logs and error messages.
    pub fn debug_sql(&self) -> Result<String> {
        let (sql, params) = self.render()?;
        Ok(debug_render(self.dialect, &sql, &params))
    }
}

/// Expands one template into `out`-style SQL, resolving tags against the
/// argument stores and falling back to `extra` for builder-provided tags.
pub(crate) fn render_template(
    dialect: &'static dyn Dialect,
    template: &str,
    positional: &[Operand],
    named: &IndexMap<String, Operand>,
    ctx: &mut RenderCtx,
    extra: &mut dyn FnMut(&str, &mut RenderCtx) -> Result<Option<String>>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut nameless = 0_usize;

    for m in TEMPLATE_SCAN.find_iter(template) {
        out.push_str(&template[last..m.start()]);
        last = m.end();
        let tag = m.as_str();
        if is_quoted(tag) {
            out.push_str(tag);
            continue;
        }

        let (mode, name) = split_tag(tag);
        let rendered = if name.is_empty() {
            let idx = nameless;
            nameless += 1;
            match positional.get(idx) {
                Some(op) => consume(dialect, op, ctx, mode)?,
                None => {
                    return Err(Error::UnresolvedTag {
                        tag: String::from(tag),
                    })
                }
            }
        } else if let Some(op) = named.get(name) {
            consume(dialect, op, ctx, mode)?
        } else if let Some(sql) = extra(name, ctx)? {
            sql
        } else {
            return Err(Error::UnresolvedTag {
                tag: String::from(name),
            });
        };
        out.push_str(&rendered);
    }
    out.push_str(&template[last..]);

    Ok(String::from(out.trim()))
}

/// Splits a matched tag into its escape mode and inner name.
fn split_tag(tag: &str) -> (EscapeMode, &str) {
    if let Some(inner) = tag.strip_prefix("{{").and_then(|t| t.strip_suffix("}}")) {
        (EscapeMode::IdentifierSoft, inner)
    } else if let Some(inner) = tag.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        (EscapeMode::Identifier, inner)
    } else {
        (
            EscapeMode::Param,
            tag.strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .unwrap_or(""),
        )
    }
}

/// Renders one operand under the given escape mode, collecting parameters
/// into `ctx`. Nested expressions and queries render with their own
/// dialect but share the parameter counter.
pub(crate) fn consume(
    dialect: &dyn Dialect,
    operand: &Operand,
    ctx: &mut RenderCtx,
    mode: EscapeMode,
) -> Result<String> {
    match operand {
        Operand::Value(v) => Ok(match mode {
            EscapeMode::Param => ctx.push_param(v.clone()),
            EscapeMode::Identifier => escape_identifier(dialect, &value_as_text(v)),
            EscapeMode::IdentifierSoft => escape_identifier_soft(dialect, &value_as_text(v)),
            EscapeMode::None => value_as_text(v),
        }),
        Operand::Column(c) => Ok(escape_identifier_soft(dialect, &c.name)),
        Operand::Expr(e) => {
            let sql = e.render_into(ctx)?;
            Ok(if e.wrap_in_parens {
                format!("({sql})")
            } else {
                sql
            })
        }
        Operand::Query(q) => q.render_nested_into(ctx),
        Operand::List(_) => Err(Error::ListValueNotAllowed),
    }
}

fn value_as_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_to_sql(*f),
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => hex_lower(b),
    }
}

/// Hard-escapes an identifier: always quoted, embedded quote characters
/// doubled. The `]` style opens with `[`.
#[must_use]
pub fn escape_identifier(dialect: &dyn Dialect, value: &str) -> String {
    let c = dialect.identifier_escape_char();
    let open = if c == ']' { '[' } else { c };
    let doubled = value.replace(c, &format!("{c}{c}"));
    format!("{open}{doubled}{c}")
}

/// Soft-escapes an identifier. `*`, anything containing `(` or the escape
/// character passes through; dotted names escape component-wise.
#[must_use]
pub fn escape_identifier_soft(dialect: &dyn Dialect, value: &str) -> String {
    if is_unescapable_identifier(dialect, value) {
        return String::from(value);
    }

    if value.contains('.') {
        return value
            .split('.')
            .map(|part| escape_identifier_soft(dialect, part))
            .collect::<Vec<_>>()
            .join(".");
    }

    escape_identifier(dialect, value)
}

fn is_unescapable_identifier(dialect: &dyn Dialect, value: &str) -> bool {
    value == "*" || value.contains('(') || value.contains(dialect.identifier_escape_char())
}

/// Folds `values` into a balanced n-ary tree. A single value is passed to
/// `combine` as a singleton; larger inputs wrap each leaf first and then
/// combine groups of at most `n`, so the tree depth is the ceiling of
/// log_n of the input length.
pub fn make_nary_tree<T>(values: Vec<T>, n: usize, combine: &mut dyn FnMut(Vec<T>) -> T) -> T {
    debug_assert!(n >= 2);
    let len = values.len();
    if len <= n {
        if len == 1 {
            return combine(values);
        }
        let wrapped = values.into_iter().map(|v| combine(vec![v])).collect();
        return combine(wrapped);
    }

    let mut depth = 1_usize;
    let mut capacity = n;
    while capacity < len {
        capacity *= n;
        depth += 1;
    }
    let per_node = n.pow(u32::try_from(depth - 1).unwrap_or(0));

    let mut groups: Vec<T> = vec![];
    let mut chunk: Vec<T> = Vec::with_capacity(per_node);
    for v in values {
        chunk.push(v);
        if chunk.len() == per_node {
            groups.push(make_nary_tree(std::mem::take(&mut chunk), n, combine));
        }
    }
    if !chunk.is_empty() {
        groups.push(make_nary_tree(chunk, n, combine));
    }
    combine(groups)
}

/// Substitutes parameters back into rendered SQL for display. Quoted
/// tokens and `::type` casts are left intact; strings over 4096 bytes are
/// summarized with their length and SHA-256.
#[must_use]
pub fn debug_render(dialect: &dyn Dialect, sql: &str, params: &Params) -> String {
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
            None => out.push_str(t),
            Some(v) => out.push_str(&debug_value(dialect, v)),
        }
    }
    out.push_str(&sql[last..]);
    out
}

fn debug_value(dialect: &dyn Dialect, v: &Value) -> String {
    match v {
        Value::Null => String::from("NULL"),
        Value::Bool(b) => String::from(if *b { "true" } else { "false" }),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_to_sql(*f),
        Value::Str(s) => {
            if s.len() > 4096 {
                long_payload_summary(s.as_bytes())
            } else {
                dialect.escape_string_literal(s)
            }
        }
        Value::Bytes(b) => {
            if b.len() > 4096 {
                long_payload_summary(b)
            } else {
                dialect.escape_binary_literal(b)
            }
        }
    }
}

fn long_payload_summary(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!(
        "*long string* (length: {} bytes, sha256: {})",
        bytes.len(),
        hex_lower(&digest)
    )
}

pub(crate) fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_param_tag() {
        let (sql, params) = expr("where [] = []").arg(column("id")).arg(5).render().unwrap();
        assert_eq!(sql, r#"where "id" = :a"#);
        assert_eq!(params[":a"], Value::Int(5));
    }

    #[test]
    fn test_render_named_tags() {
        let (sql, params) = expr("{field} = [value]")
            .named_arg("field", Value::Str(String::from("name")))
            .named_arg("value", "john")
            .render()
            .unwrap();
        assert_eq!(sql, r#""name" = :a"#);
        assert_eq!(params[":a"], Value::Str(String::from("john")));
    }

    #[test]
    fn test_soft_escape() {
        let (sql, _) = expr("{{}}")
            .arg(Value::Str(String::from("db.table.field")))
            .render()
            .unwrap();
        assert_eq!(sql, r#""db"."table"."field""#);

        let (sql, _) = expr("{{}}")
            .arg(Value::Str(String::from("count(*)")))
            .render()
            .unwrap();
        assert_eq!(sql, "count(*)");

        let (sql, _) = expr("{{}}")
            .arg(Value::Str(String::from("*")))
            .render()
            .unwrap();
        assert_eq!(sql, "*");
    }

    #[test]
    fn test_hard_escape_doubles_quotes() {
        let (sql, _) = expr("{}")
            .arg(Value::Str(String::from(r#"eve"il"#)))
            .render()
            .unwrap();
        assert_eq!(sql, r#""eve""il""#);
    }

    #[test]
    fn test_tags_inside_literals_untouched() {
        let (sql, params) = expr("select '[a]' as {x} from t where v = []")
            .named_arg("x", Value::Str(String::from("col")))
            .arg(1)
            .render()
            .unwrap();
        assert_eq!(sql, r#"select '[a]' as "col" from t where v = :a"#);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_nested_expression_shares_counter() {
        let inner = expr("[] + []").arg(1).arg(2);
        let (sql, params) = expr("[] * []").arg(inner.wrapped()).arg(3).render().unwrap();
        assert_eq!(sql, "(:a + :b) * :c");
        assert_eq!(
            params.keys().cloned().collect::<Vec<_>>(),
            vec![":a", ":b", ":c"]
        );
    }

    #[test]
    fn test_missing_tag_errors() {
        let err = expr("[missing]").render().unwrap_err();
        assert!(matches!(err, Error::UnresolvedTag { tag } if tag == "missing"));
    }

    #[test]
    fn test_no_template_errors() {
        let e = Expression {
            template: None,
            ..expr("x")
        };
        assert!(matches!(e.render(), Err(Error::TemplateNotDefined)));
    }

    #[test]
    fn test_make_nary_tree_single() {
        let out = make_nary_tree(vec![String::from("a")], 2, &mut |parts| {
            if parts.len() == 1 {
                parts.into_iter().next().unwrap_or_default()
            } else {
                format!("({})", parts.join(", "))
            }
        });
        assert_eq!(out, "a");
    }

    #[test]
    fn test_make_nary_tree_binary() {
        let leaves: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
        let out = make_nary_tree(leaves, 2, &mut |parts| {
            if parts.len() == 1 {
                parts.into_iter().next().unwrap_or_default()
            } else {
                format!("({})", parts.join("+"))
            }
        });
        // 5 leaves, depth 3: chunks of 4 then 1
        assert_eq!(out, "(((1+2)+(3+4))+5)");
    }

    #[test]
    fn test_make_nary_tree_wide() {
        let leaves: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
        let out = make_nary_tree(leaves, 10, &mut |parts| {
            if parts.len() == 1 {
                parts.into_iter().next().unwrap_or_default()
            } else {
                format!("[{}]", parts.join(","))
            }
        });
        assert_eq!(out, "[1,2,3,4,5,6,7,8,9,10]");
    }

    #[test]
    fn test_debug_render_inlines_values() {
        let (sql, params) = expr("where {} = [] and {} = []")
            .arg(Value::Str(String::from("a")))
            .arg(1)
            .arg(Value::Str(String::from("b")))
            .arg("x")
            .render()
            .unwrap();
        let dbg = debug_render(&GENERIC, &sql, &params);
        assert_eq!(dbg, r#"where "a" = 1 and "b" = 'x'"#);
    }

    #[test]
    fn test_debug_render_long_string() {
        let (sql, params) = expr("[]")
            .arg(Value::Str("x".repeat(5000)))
            .render()
            .unwrap();
        let dbg = debug_render(&GENERIC, &sql, &params);
        assert!(dbg.starts_with("*long string* (length: 5000 bytes, sha256: "));
    }

    #[test]
    fn test_debug_render_keeps_casts() {
        let params = Params::new();
        assert_eq!(
            debug_render(&GENERIC, "select '1'::BIGINT", &params),
            "select '1'::BIGINT"
        );
    }
}
