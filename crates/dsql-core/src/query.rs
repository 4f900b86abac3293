//! Statement builder.
//!
//! A [`Query`] accumulates clauses (fields, tables, joins, conditions,
//! grouping, ordering, limits, set pairs, CTEs) and renders them through
//! the statement template of its mode. Builder methods that can reject
//! their input return `Result<Self>`; everything is validated either at
//! insertion or at render time, never at execution.

use indexmap::IndexMap;

use crate::condition::{render_condition, Condition, FIELD_WITH_OPERATOR};
use crate::dialect::{Dialect, GENERIC};
use crate::error::{Error, Result};
use crate::expr::{
    consume, debug_render, escape_identifier, escape_identifier_soft, render_template, Column,
    EscapeMode, Expression, Operand,
};
use crate::param::{Params, RenderCtx};
use crate::value::Value;

/// Statement modes, each with its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `select …`
    Select,
    /// `insert into …`
    Insert,
    /// `update … set …`
    Update,
    /// `delete from …`
    Delete,
    /// `replace into …`
    Replace,
    /// `truncate table …`
    Truncate,
}

impl Mode {
    /// Lowercase mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Truncate => "truncate",
        }
    }

    /// Parses a mode name.
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.to_lowercase().as_str() {
            "select" => Ok(Self::Select),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "replace" => Ok(Self::Replace),
            "truncate" => Ok(Self::Truncate),
            _ => Err(Error::UnsupportedMode {
                mode: String::from(mode),
            }),
        }
    }
}

/// Clause stores that [`Query::reset`] can clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    /// Select fields.
    Field,
    /// Tables.
    Table,
    /// Joins.
    Join,
    /// Where conditions.
    Where,
    /// Having conditions.
    Having,
    /// Group-by entries.
    Group,
    /// Order-by entries.
    Order,
    /// Set pairs.
    Set,
    /// Mode options.
    Option,
    /// Common table expressions.
    With,
    /// Limit clause.
    Limit,
    /// Case expression parts.
    Case,
}

#[derive(Debug, Clone)]
struct Join {
    kind: String,
    foreign_table: String,
    foreign_alias: Option<String>,
    on: JoinOn,
}

#[derive(Debug, Clone)]
enum JoinOn {
    Expr(Operand),
    Deduced {
        master_table: Option<String>,
        master_field: String,
        foreign_field: String,
    },
}

#[derive(Debug, Clone)]
struct WithCursor {
    alias: String,
    fields: Option<Vec<String>>,
    cursor: Operand,
    recursive: bool,
}

#[derive(Debug, Clone)]
enum CaseWhen {
    Short(Operand),
    Cond(Condition),
}

/// A SQL statement under construction.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) dialect: &'static dyn Dialect,
    mode: Mode,
    template_override: Option<&'static str>,
    fields: Vec<(Option<String>, Operand)>,
    tables: Vec<(Option<String>, Operand)>,
    joins: Vec<Join>,
    wheres: Vec<Condition>,
    havings: Vec<Condition>,
    groups: Vec<Operand>,
    orders: Vec<(Operand, String)>,
    sets: Vec<(Operand, Operand)>,
    options: Vec<(Mode, String)>,
    withs: Vec<WithCursor>,
    limit: Option<(u64, u64)>,
    case_operand: Option<Operand>,
    case_whens: Vec<(CaseWhen, Operand)>,
    case_else: Option<Operand>,
}

/// Creates a select query on the generic dialect.
#[must_use]
pub fn query() -> Query {
    Query::new(&GENERIC)
}

impl Query {
    /// Creates a select query bound to a dialect.
    #[must_use]
    pub fn new(dialect: &'static dyn Dialect) -> Self {
        Self {
            dialect,
            mode: Mode::Select,
            template_override: None,
            fields: vec![],
            tables: vec![],
            joins: vec![],
            wheres: vec![],
            havings: vec![],
            groups: vec![],
            orders: vec![],
            sets: vec![],
            options: vec![],
            withs: vec![],
            limit: None,
            case_operand: None,
            case_whens: vec![],
            case_else: None,
        }
    }

    /// Creates an expression on the same dialect.
    #[must_use]
    pub fn expr(&self, template: impl Into<String>) -> Expression {
        Expression::new(self.dialect, template)
    }

    /// Creates an empty query on the same dialect.
    #[must_use]
    pub fn dsql(&self) -> Self {
        Self::new(self.dialect)
    }

    /// Switches the statement mode. Fails when the dialect has no
    /// template for it.
    pub fn mode(mut self, mode: Mode) -> Result<Self> {
        self.dialect.template(mode)?;
        self.mode = mode;
        Ok(self)
    }

    fn with_template(mut self, template: &'static str) -> Self {
        self.template_override = Some(template);
        self
    }

    pub(crate) fn is_plain_select(&self) -> bool {
        self.mode == Mode::Select && self.template_override.is_none()
    }

    // {{{ field / table / with

    /// Adds a select field. Strings become soft-escaped column
    /// references; expressions and subqueries render as given.
    #[must_use]
    pub fn field(mut self, field: impl Into<Operand>) -> Self {
        self.fields.push((None, normalize_column(field.into())));
        self
    }

    /// Adds a select field with an alias.
    pub fn field_as(mut self, field: impl Into<Operand>, alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        check_alias_unique(self.fields.iter().map(|(a, _)| a), &alias)?;
        self.fields
            .push((Some(alias), normalize_column(field.into())));
        Ok(self)
    }

    /// Adds a table. A subquery table requires [`Query::table_as`].
    pub fn table(mut self, table: impl Into<Operand>) -> Result<Self> {
        let table = normalize_column(table.into());
        let alias = match &table {
            Operand::Query(_) => return Err(Error::TableAliasRequired),
            Operand::Column(c) => Some(c.name.clone()),
            _ => None,
        };
        if let Some(alias) = &alias {
            check_alias_unique(self.tables.iter().map(|(a, _)| a), alias)?;
        }
        self.tables.push((alias, table));
        Ok(self)
    }

    /// Adds a table under an explicit alias.
    pub fn table_as(mut self, table: impl Into<Operand>, alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        if is_int_string(&alias) {
            return Err(Error::AliasMustBeNotNumeric);
        }
        check_alias_unique(self.tables.iter().map(|(a, _)| a), &alias)?;
        self.tables
            .push((Some(alias), normalize_column(table.into())));
        Ok(self)
    }

    /// Adds a common table expression.
    pub fn with(self, cursor: Self, alias: impl Into<String>) -> Result<Self> {
        self.with_opts(cursor, alias, None, false)
    }

    /// Adds a common table expression with an optional column list and
    /// recursion flag.
    pub fn with_opts(
        mut self,
        cursor: Self,
        alias: impl Into<String>,
        fields: Option<&[&str]>,
        recursive: bool,
    ) -> Result<Self> {
        let alias = alias.into();
        if is_int_string(&alias) {
            return Err(Error::AliasMustBeNotNumeric);
        }
        let aliases: Vec<Option<String>> = self
            .withs
            .iter()
            .map(|w| Some(w.alias.clone()))
            .collect();
        check_alias_unique(aliases.iter(), &alias)?;
        self.withs.push(WithCursor {
            alias,
            fields: fields.map(|fs| fs.iter().map(|f| String::from(*f)).collect()),
            cursor: Operand::Query(Box::new(cursor)),
            recursive,
        });
        Ok(self)
    }

    fn main_table(&self) -> Option<String> {
        if self.tables.len() == 1 {
            self.tables[0].0.clone()
        } else {
            None
        }
    }

    // }}}

    // {{{ join

    /// Left join with deduced fields: `join("address")` joins on
    /// `address.id = <main table>.address_id`, and
    /// `join("address.user_id")` joins on `address.user_id = <main>.id`.
    /// An alias can follow the table name after a space.
    #[must_use]
    pub fn join(self, foreign_table: &str) -> Self {
        self.join_kind("left", foreign_table, None, None)
    }

    /// Join with an explicit kind, master field, and alias.
    #[must_use]
    pub fn join_kind(
        mut self,
        kind: &str,
        foreign_table: &str,
        master_field: Option<&str>,
        foreign_alias: Option<&str>,
    ) -> Self {
        let (table, alias) = split_table_alias(foreign_table, foreign_alias);
        let (f1, f2) = split_once_opt(&table, '.');

        let (mut m1, mut m2) = match master_field {
            None => (None, None),
            Some(mf) => {
                let (a, b) = split_once_opt(mf, '.');
                match b {
                    None => (None, Some(a)),
                    Some(b) => (Some(a), Some(b)),
                }
            }
        };
        if m1.is_none() {
            m1 = self.main_table();
        }
        if f2.is_none() && m2.is_none() {
            m2 = Some(format!("{f1}_id"));
        }

        self.joins.push(Join {
            kind: String::from(kind),
            foreign_table: f1,
            foreign_alias: alias,
            on: JoinOn::Deduced {
                master_table: m1,
                master_field: m2.unwrap_or_else(|| String::from("id")),
                foreign_field: f2.unwrap_or_else(|| String::from("id")),
            },
        });
        self
    }

    /// Join on an explicit condition expression.
    #[must_use]
    pub fn join_expr(
        mut self,
        kind: &str,
        foreign_table: &str,
        foreign_alias: Option<&str>,
        on: impl Into<Operand>,
    ) -> Self {
        let (table, alias) = split_table_alias(foreign_table, foreign_alias);
        let (f1, _) = split_once_opt(&table, '.');
        self.joins.push(Join {
            kind: String::from(kind),
            foreign_table: f1,
            foreign_alias: alias,
            on: JoinOn::Expr(on.into()),
        });
        self
    }

    // }}}

    // {{{ where / having

    /// Adds an equality (or inferred `in`) condition.
    pub fn where_(self, field: impl Into<Operand>, value: impl Into<Operand>) -> Result<Self> {
        self.push_condition(false, field.into(), None, value.into())
    }

    /// Adds a condition with an explicit operator.
    pub fn where_op(
        self,
        field: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.push_condition(false, field.into(), Some(String::from(operator)), value.into())
    }

    /// Adds a self-contained condition, rendered in parentheses.
    pub fn where_raw(self, condition: impl Into<Operand>) -> Result<Self> {
        self.push_raw_condition(false, condition.into())
    }

    /// Like [`Query::where_`], for the having clause.
    pub fn having(self, field: impl Into<Operand>, value: impl Into<Operand>) -> Result<Self> {
        self.push_condition(true, field.into(), None, value.into())
    }

    /// Like [`Query::where_op`], for the having clause.
    pub fn having_op(
        self,
        field: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.push_condition(true, field.into(), Some(String::from(operator)), value.into())
    }

    /// Like [`Query::where_raw`], for the having clause.
    pub fn having_raw(self, condition: impl Into<Operand>) -> Result<Self> {
        self.push_raw_condition(true, condition.into())
    }

    fn push_condition(
        mut self,
        having: bool,
        field: Operand,
        operator: Option<String>,
        value: Operand,
    ) -> Result<Self> {
        let field = check_condition_field(field)?;
        let store = if having { &mut self.havings } else { &mut self.wheres };
        store.push(Condition::Triple {
            field,
            operator,
            value,
        });
        Ok(self)
    }

    fn push_raw_condition(mut self, having: bool, condition: Operand) -> Result<Self> {
        let condition = match condition {
            // a bare string is raw SQL here, not a column reference
            Operand::Value(Value::Str(s)) => Operand::Expr(self.expr(s).wrapped()),
            Operand::Expr(e) => Operand::Expr(e.wrapped()),
            Operand::Query(q) => Operand::Query(q),
            other => Operand::Expr(self.expr("[]").arg(other).wrapped()),
        };
        let store = if having { &mut self.havings } else { &mut self.wheres };
        store.push(Condition::Raw(condition));
        Ok(self)
    }

    // }}}

    // {{{ group / order / limit / set / option

    /// Adds a group-by entry.
    #[must_use]
    pub fn group(mut self, group: impl Into<Operand>) -> Self {
        self.groups.push(normalize_column(group.into()));
        self
    }

    /// Adds an order-by entry. A string may carry a trailing `asc` or
    /// `desc` keyword. Entries render in reverse insertion order, and
    /// duplicates (ignoring direction) are dropped keeping the first
    /// rendered one.
    pub fn order(self, order: impl Into<Operand>) -> Result<Self> {
        self.push_order(order.into(), None)
    }

    /// Adds a descending order-by entry.
    pub fn order_desc(self, order: impl Into<Operand>) -> Result<Self> {
        self.push_order(order.into(), Some(String::from("desc")))
    }

    /// Adds an order-by entry with a custom direction suffix, e.g.
    /// `"desc nulls last"`.
    pub fn order_dir(self, order: impl Into<Operand>, direction: &str) -> Result<Self> {
        self.push_order(order.into(), Some(String::from(direction)))
    }

    fn push_order(mut self, order: Operand, direction: Option<String>) -> Result<Self> {
        let (order, mut direction) = match order {
            Operand::Value(Value::Str(s)) => {
                if s.contains(',') {
                    return Err(Error::OrderFieldWithComma { field: s });
                }
                if direction.is_none() {
                    if let Some((name, dir)) = s.rsplit_once(' ') {
                        let dir_lc = dir.to_lowercase();
                        if dir_lc == "asc" || dir_lc == "desc" {
                            (
                                Operand::Column(Column::new(name)),
                                Some(dir_lc),
                            )
                        } else {
                            (Operand::Column(Column::new(s)), None)
                        }
                    } else {
                        (Operand::Column(Column::new(s)), None)
                    }
                } else {
                    (Operand::Column(Column::new(s)), direction)
                }
            }
            other => (other, direction),
        };
        if direction.as_deref().map(str::to_lowercase).as_deref() == Some("asc") {
            direction = None;
        }
        self.orders.push((order, direction.unwrap_or_default()));
        Ok(self)
    }

    /// Limits the number of returned rows.
    #[must_use]
    pub fn limit(mut self, cnt: u64) -> Self {
        self.limit = Some((cnt, 0));
        self
    }

    /// Limits the number of returned rows, skipping `shift` rows first.
    #[must_use]
    pub fn limit_offset(mut self, cnt: u64, shift: u64) -> Self {
        self.limit = Some((cnt, shift));
        self
    }

    /// Sets a field for insert/update statements. The field is
    /// hard-escaped; list values are rejected.
    pub fn set(mut self, field: impl Into<Operand>, value: impl Into<Operand>) -> Result<Self> {
        let value = value.into();
        if matches!(value, Operand::List(_)) {
            return Err(Error::UnsupportedSetValue);
        }
        self.sets.push((field.into(), value));
        Ok(self)
    }

    /// Sets multiple fields at once.
    pub fn set_multi<I, F, V>(mut self, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<Operand>,
        V: Into<Operand>,
    {
        for (field, value) in pairs {
            self = self.set(field, value)?;
        }
        Ok(self)
    }

    /// Adds an option keyword for select mode, e.g. `distinct`.
    #[must_use]
    pub fn option(self, option: &str) -> Self {
        self.option_for(Mode::Select, option)
    }

    /// Adds an option keyword for the given mode.
    #[must_use]
    pub fn option_for(mut self, mode: Mode, option: &str) -> Self {
        self.options.push((mode, String::from(option)));
        self
    }

    /// Clears one clause store.
    #[must_use]
    pub fn reset(mut self, kind: ClauseKind) -> Self {
        match kind {
            ClauseKind::Field => self.fields.clear(),
            ClauseKind::Table => self.tables.clear(),
            ClauseKind::Join => self.joins.clear(),
            ClauseKind::Where => self.wheres.clear(),
            ClauseKind::Having => self.havings.clear(),
            ClauseKind::Group => self.groups.clear(),
            ClauseKind::Order => self.orders.clear(),
            ClauseKind::Set => self.sets.clear(),
            ClauseKind::Option => self.options.clear(),
            ClauseKind::With => self.withs.clear(),
            ClauseKind::Limit => self.limit = None,
            ClauseKind::Case => {
                self.case_operand = None;
                self.case_whens.clear();
                self.case_else = None;
            }
        }
        self
    }

    // }}}

    // {{{ derived expressions

    /// A query rendering this query's conditions joined with OR.
    #[must_use]
    pub fn or_expr(&self) -> Self {
        self.dsql().with_template("[orwhere]")
    }

    /// A query rendering this query's conditions joined with AND, in
    /// parentheses.
    #[must_use]
    pub fn and_expr(&self) -> Self {
        self.dsql().with_template("[andwhere]")
    }

    /// A CASE expression in searched form: conditions via
    /// [`Query::case_when_cond`].
    #[must_use]
    pub fn case_expr(&self) -> Self {
        self.dsql().with_template("[case]")
    }

    /// A CASE expression in simple form comparing against `operand`:
    /// values via [`Query::case_when`].
    #[must_use]
    pub fn case_expr_on(&self, operand: impl Into<Operand>) -> Self {
        let mut q = self.dsql().with_template("[case]");
        q.case_operand = Some(normalize_column(operand.into()));
        q
    }

    /// Adds a when/then pair for the simple CASE form.
    #[must_use]
    pub fn case_when(mut self, when: impl Into<Operand>, then: impl Into<Operand>) -> Self {
        self.case_whens
            .push((CaseWhen::Short(when.into()), then.into()));
        self
    }

    /// Adds a when/then pair for the searched CASE form. `operator`
    /// `None` means equality (or `in` for list values).
    pub fn case_when_cond(
        mut self,
        field: impl Into<Operand>,
        operator: Option<&str>,
        value: impl Into<Operand>,
        then: impl Into<Operand>,
    ) -> Result<Self> {
        let field = check_condition_field(field.into())?;
        self.case_whens.push((
            CaseWhen::Cond(Condition::Triple {
                field,
                operator: operator.map(String::from),
                value: value.into(),
            }),
            then.into(),
        ));
        Ok(self)
    }

    /// Adds the else branch of a CASE expression.
    #[must_use]
    pub fn case_else(mut self, value: impl Into<Operand>) -> Self {
        self.case_else = Some(value.into());
        self
    }

    /// Wraps this query into an existence test usable as a value.
    #[must_use]
    pub fn exists(self) -> Self {
        let dialect = self.dialect;
        let outer = Self::new(dialect);
        if dialect.wraps_exists_in_case() {
            let e = Expression::new(dialect, "case when exists[] then 1 else 0 end").arg(self);
            outer.field(e)
        } else {
            outer.option("exists").field(self)
        }
    }

    /// Aggregate string concatenation of a field, dialect permitting.
    pub fn group_concat(&self, field: impl Into<Operand>, separator: &str) -> Result<Expression> {
        self.dialect
            .group_concat_expr(self.dialect, normalize_column(field.into()), separator)
    }

    /// `current_timestamp` expression, with optional fractional-second
    /// precision.
    #[must_use]
    pub fn expr_now(&self, precision: Option<u8>) -> Expression {
        match precision {
            Some(p) => self.expr("current_timestamp([])").arg(i64::from(p)),
            None => self.expr("current_timestamp()"),
        }
    }

    // }}}

    // {{{ render

    /// Renders to SQL text plus named parameters.
    pub fn render(&self) -> Result<(String, Params)> {
        tracing::debug!(
            dialect = self.dialect.name(),
            mode = self.mode.as_str(),
            "render query"
        );
        let mut ctx = RenderCtx::new(self.dialect.param_base());
        let sql = self.render_query_into(&mut ctx, false)?;
        let sql = self.dialect.post_render(sql);
        Ok((sql, ctx.into_params()))
    }

    /// Renders with parameters inlined, for logs and error messages.
    pub fn debug_sql(&self) -> Result<String> {
        let (sql, params) = self.render()?;
        Ok(debug_render(self.dialect, &sql, &params))
    }

    /// Nested render: parenthesized, and the order clause is dropped
    /// unless a limit constrains it.
    pub(crate) fn render_nested_into(&self, ctx: &mut RenderCtx) -> Result<String> {
        let sql = self.render_query_into(ctx, true)?;
        Ok(format!("({sql})"))
    }

    fn render_query_into(&self, ctx: &mut RenderCtx, nested: bool) -> Result<String> {
        let template = match self.template_override {
            Some(t) => t,
            None => self.dialect.template(self.mode)?,
        };
        let drop_order = nested && self.limit.is_none();
        let named = IndexMap::new();
        render_template(self.dialect, template, &[], &named, ctx, &mut |tag, ctx| {
            self.render_tag(tag, ctx, drop_order)
        })
    }

    #[allow(clippy::too_many_lines)]
    fn render_tag(
        &self,
        tag: &str,
        ctx: &mut RenderCtx,
        drop_order: bool,
    ) -> Result<Option<String>> {
        let d = self.dialect;
        match tag {
            "with" => {
                if self.withs.is_empty() {
                    return Ok(Some(String::new()));
                }
                let mut parts = vec![];
                let mut recursive = false;
                for w in &self.withs {
                    let mut s = escape_identifier(d, &w.alias);
                    s.push(' ');
                    if let Some(fields) = &w.fields {
                        let cols: Vec<String> =
                            fields.iter().map(|f| escape_identifier(d, f)).collect();
                        s.push_str(&format!("({}) ", cols.join(", ")));
                    }
                    s.push_str("as ");
                    s.push_str(&consume(d, &w.cursor, ctx, EscapeMode::IdentifierSoft)?);
                    recursive = recursive || w.recursive;
                    parts.push(s);
                }
                Ok(Some(format!(
                    "with {}{}\n",
                    if recursive { "recursive " } else { "" },
                    parts.join(",\n"),
                )))
            }
            "option" => {
                let opts: Vec<&str> = self
                    .options
                    .iter()
                    .filter(|(m, _)| *m == self.mode)
                    .map(|(_, o)| o.as_str())
                    .collect();
                Ok(Some(if opts.is_empty() {
                    String::new()
                } else {
                    format!(" {}", opts.join(" "))
                }))
            }
            "field" => {
                if self.fields.is_empty() {
                    return Ok(Some(String::from("*")));
                }
                let mut parts = vec![];
                for (alias, field) in &self.fields {
                    let mut sql = consume(d, field, ctx, EscapeMode::IdentifierSoft)?;
                    if let Some(alias) = alias {
                        if !alias_matches_operand(alias, field) {
                            sql.push(' ');
                            sql.push_str(&escape_identifier(d, alias));
                        }
                    }
                    parts.push(sql);
                }
                Ok(Some(parts.join(", ")))
            }
            "from" => Ok(Some(String::from(
                if self.tables.is_empty() && self.implicit_table().is_none() {
                    ""
                } else {
                    "from"
                },
            ))),
            "table" => self.render_tables(ctx, true).map(Some),
            "tableNoalias" => self.render_tables(ctx, false).map(Some),
            "join" => {
                if self.joins.is_empty() {
                    return Ok(Some(String::new()));
                }
                let mut parts = vec![];
                for j in &self.joins {
                    let mut s = format!(
                        "{} join {}",
                        j.kind,
                        escape_identifier_soft(d, &j.foreign_table),
                    );
                    if let Some(fa) = &j.foreign_alias {
                        s.push(' ');
                        s.push_str(&escape_identifier(d, fa));
                    }
                    s.push_str(" on ");
                    match &j.on {
                        JoinOn::Expr(e) => s.push_str(&consume(d, e, ctx, EscapeMode::Param)?),
                        JoinOn::Deduced {
                            master_table,
                            master_field,
                            foreign_field,
                        } => {
                            let ft = j.foreign_alias.as_ref().unwrap_or(&j.foreign_table);
                            s.push_str(&escape_identifier(d, ft));
                            s.push('.');
                            s.push_str(&escape_identifier(d, foreign_field));
                            s.push_str(" = ");
                            if let Some(mt) = master_table {
                                s.push_str(&escape_identifier(d, mt));
                                s.push('.');
                            }
                            s.push_str(&escape_identifier(d, master_field));
                        }
                    }
                    parts.push(s);
                }
                Ok(Some(format!(" {}", parts.join(" "))))
            }
            "where" => {
                if self.wheres.is_empty() {
                    return Ok(Some(String::new()));
                }
                let parts = self.render_conditions(&self.wheres, ctx)?;
                Ok(Some(format!(" where {}", parts.join(" and "))))
            }
            "having" => {
                if self.havings.is_empty() {
                    return Ok(Some(String::new()));
                }
                let parts = self.render_conditions(&self.havings, ctx)?;
                Ok(Some(format!(" having {}", parts.join(" and "))))
            }
            "orwhere" => self.render_joined_conditions(ctx, " or ").map(Some),
            "andwhere" => self.render_joined_conditions(ctx, " and ").map(Some),
            "group" => {
                if self.groups.is_empty() {
                    return Ok(Some(String::new()));
                }
                let parts = self
                    .groups
                    .iter()
                    .map(|g| consume(d, g, ctx, EscapeMode::IdentifierSoft))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(format!(" group by {}", parts.join(", "))))
            }
            "order" => {
                if self.orders.is_empty() || drop_order {
                    return Ok(Some(String::new()));
                }
                let mut parts = vec![];
                for (order, direction) in &self.orders {
                    let sql = consume(d, order, ctx, EscapeMode::IdentifierSoft)?;
                    parts.push(if direction.is_empty() {
                        sql
                    } else {
                        format!("{sql} {direction}")
                    });
                }
                parts.reverse();
                let parts = deduplicate_order(parts);
                Ok(Some(format!(" order by {}", parts.join(", "))))
            }
            "limit" => Ok(Some(self.limit.map_or_else(String::new, |(cnt, shift)| {
                d.render_limit(cnt, shift, !self.orders.is_empty())
            }))),
            "set" => {
                let mut parts = vec![];
                for (field, value) in &self.sets {
                    let f = consume(d, field, ctx, EscapeMode::Identifier)?;
                    let v = consume(d, value, ctx, EscapeMode::Param)?;
                    parts.push(format!("{f}={v}"));
                }
                Ok(Some(parts.join(", ")))
            }
            "setFields" => {
                let parts = self
                    .sets
                    .iter()
                    .map(|(f, _)| consume(d, f, ctx, EscapeMode::Identifier))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(parts.join(", ")))
            }
            "setValues" => {
                let parts = self
                    .sets
                    .iter()
                    .map(|(_, v)| consume(d, v, ctx, EscapeMode::Param))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(parts.join(", ")))
            }
            "case" => self.render_case(ctx).map(Some),
            _ => Ok(None),
        }
    }

    fn implicit_table(&self) -> Option<&'static str> {
        if self.tables.is_empty() && self.is_plain_select() {
            self.dialect.implicit_select_table()
        } else {
            None
        }
    }

    fn render_tables(&self, ctx: &mut RenderCtx, add_alias: bool) -> Result<String> {
        if let Some(implicit) = self.implicit_table() {
            return Ok(escape_identifier_soft(self.dialect, implicit));
        }
        let mut parts = vec![];
        for (alias, table) in &self.tables {
            if !add_alias && matches!(table, Operand::Query(_)) {
                return Err(Error::TableMustNotBeQuery);
            }
            let mut sql = consume(self.dialect, table, ctx, EscapeMode::IdentifierSoft)?;
            if add_alias {
                if let Some(alias) = alias {
                    if !alias_matches_operand(alias, table) {
                        sql.push(' ');
                        sql.push_str(&escape_identifier(self.dialect, alias));
                    }
                }
            }
            parts.push(sql);
        }
        Ok(parts.join(", "))
    }

    fn render_conditions(&self, store: &[Condition], ctx: &mut RenderCtx) -> Result<Vec<String>> {
        store
            .iter()
            .map(|c| render_condition(self.dialect, ctx, c))
            .collect()
    }

    fn render_joined_conditions(&self, ctx: &mut RenderCtx, sep: &str) -> Result<String> {
        if !self.wheres.is_empty() && !self.havings.is_empty() {
            return Err(Error::MixedWhereHaving);
        }
        let store = if self.havings.is_empty() {
            &self.wheres
        } else {
            &self.havings
        };
        Ok(self.render_conditions(store, ctx)?.join(sep))
    }

    fn render_case(&self, ctx: &mut RenderCtx) -> Result<String> {
        if self.case_whens.is_empty() {
            return Ok(String::new());
        }
        let d = self.dialect;
        let mut res = String::new();
        let short_form = self.case_operand.is_some();
        if let Some(operand) = &self.case_operand {
            res.push(' ');
            res.push_str(&consume(d, operand, ctx, EscapeMode::IdentifierSoft)?);
        }
        for (when, then) in &self.case_whens {
            res.push_str(" when ");
            match (short_form, when) {
                (true, CaseWhen::Short(v)) => {
                    res.push_str(&consume(d, v, ctx, EscapeMode::Param)?);
                }
                (false, CaseWhen::Cond(c)) => res.push_str(&render_condition(d, ctx, c)?),
                _ => return Err(Error::InvalidCaseWhen),
            }
            res.push_str(" then ");
            res.push_str(&consume(d, then, ctx, EscapeMode::Param)?);
        }
        if let Some(else_value) = &self.case_else {
            res.push_str(" else ");
            res.push_str(&consume(d, else_value, ctx, EscapeMode::Param)?);
        }
        Ok(format!(" case{res} end"))
    }

    // }}}
}

/// Plain string operands in field position are column references.
fn normalize_column(operand: Operand) -> Operand {
    match operand {
        Operand::Value(Value::Str(s)) => Operand::Column(Column::new(s)),
        other => other,
    }
}

fn check_condition_field(field: Operand) -> Result<Operand> {
    if let Operand::Value(Value::Str(s)) = field {
        if FIELD_WITH_OPERATOR.is_match(&s) {
            return Err(Error::FieldConditionMustBePassedSeparately { field: s });
        }
        return Ok(Operand::Column(Column::new(s)));
    }
    Ok(field)
}

fn check_alias_unique<'a>(
    existing: impl Iterator<Item = &'a Option<String>>,
    alias: &str,
) -> Result<()> {
    for a in existing {
        if a.as_deref() == Some(alias) {
            return Err(Error::AliasMustBeUnique {
                alias: String::from(alias),
            });
        }
    }
    Ok(())
}

fn alias_matches_operand(alias: &str, operand: &Operand) -> bool {
    match operand {
        Operand::Column(c) => c.name == alias,
        Operand::Value(Value::Str(s)) => s == alias,
        _ => false,
    }
}

fn is_int_string(s: &str) -> bool {
    s.parse::<i64>().is_ok_and(|v| v.to_string() == s)
}

fn split_table_alias(foreign_table: &str, foreign_alias: Option<&str>) -> (String, Option<String>) {
    match foreign_alias {
        Some(a) => (String::from(foreign_table), Some(String::from(a))),
        None => match foreign_table.split_once(' ') {
            Some((t, a)) => (String::from(t), Some(String::from(a))),
            None => (String::from(foreign_table), None),
        },
    }
}

fn split_once_opt(s: &str, sep: char) -> (String, Option<String>) {
    match s.split_once(sep) {
        Some((a, b)) => (String::from(a), Some(String::from(b))),
        None => (String::from(s), None),
    }
}

/// Drops order-by entries whose direction-stripped SQL already appeared.
fn deduplicate_order(sqls: Vec<String>) -> Vec<String> {
    static DIRECTION: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"(?i)\s+(?:asc|desc)\s*$")
            .unwrap_or_else(|e| unreachable!("order direction regex: {e}"))
    });
    let mut seen: Vec<String> = vec![];
    let mut res = vec![];
    for sql in sqls {
        let stripped = DIRECTION.replace(&sql, "").into_owned();
        if !seen.contains(&stripped) {
            seen.push(stripped);
            res.push(sql);
        }
    }
    res
}
