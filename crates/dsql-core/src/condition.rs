//! Condition compilation.
//!
//! Conditions come in two shapes: a raw SQL chunk, or a
//! field / operator / value triple. Compilation validates the operator
//! against the dialect, turns NULL comparisons into `is [not] null`,
//! expands list values into IN lists (with tautologies for empty lists),
//! and hands LIKE / REGEXP / plain comparisons to the dialect hooks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expr::{consume, escape_identifier, EscapeMode, Operand};
use crate::param::RenderCtx;
use crate::value::Value;

/// One entry of a where/having store.
#[derive(Debug, Clone)]
pub(crate) enum Condition {
    /// Pre-built SQL chunk, rendered in parentheses.
    Raw(Operand),
    /// Field, optional operator, value. A missing operator is inferred:
    /// `in` for lists and select subqueries, `=` otherwise.
    Triple {
        field: Operand,
        operator: Option<String>,
        value: Operand,
    },
}

/// Matches a field string that ends with an embedded operator, which
/// means the caller forgot to pass the operator separately.
pub(crate) static FIELD_WITH_OPERATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([><!=]|\b(?:not|is|in|like))\s*$")
        .unwrap_or_else(|e| unreachable!("field operator regex: {e}"))
});

pub(crate) fn render_condition(
    me: &'static dyn Dialect,
    ctx: &mut RenderCtx,
    condition: &Condition,
) -> Result<String> {
    let (field, operator, value) = match condition {
        Condition::Raw(op) => return consume(me, op, ctx, EscapeMode::IdentifierSoft),
        Condition::Triple {
            field,
            operator,
            value,
        } => (field, operator, value),
    };

    let operator = match operator {
        Some(op) => op.trim().to_lowercase(),
        None => String::from(infer_operator(value)),
    };

    let (field, operator, value) =
        me.adapt_condition(me, field.clone(), operator, value.clone())?;

    if !me.supported_operators().contains(&operator.as_str()) {
        return Err(Error::UnsupportedOperator { operator });
    }

    let sql_left = consume(me, &field, ctx, EscapeMode::IdentifierSoft)?;

    if matches!(value, Operand::Value(Value::Null)) {
        return match operator.as_str() {
            "=" => Ok(format!("{sql_left} is null")),
            "!=" => Ok(format!("{sql_left} is not null")),
            _ => Err(Error::UnsupportedNullOperator { operator }),
        };
    }

    if let Operand::List(items) = &value {
        if operator != "in" && operator != "not in" {
            return Err(Error::UnsupportedListOperator { operator });
        }
        if items.is_empty() {
            return Ok(String::from(if operator == "in" {
                "1 = 0" // never true
            } else {
                "1 = 1" // always true
            }));
        }
        if items
            .iter()
            .any(|item| matches!(item, Operand::Value(Value::Null)))
        {
            return Err(Error::NullInListCondition);
        }
        let sql_values = items
            .iter()
            .map(|item| consume(me, item, ctx, EscapeMode::Param))
            .collect::<Result<Vec<_>>>()?;

        return Ok(me.render_condition_in(operator == "not in", &sql_left, &sql_values));
    }

    if (operator == "in" || operator == "not in")
        && !matches!(value, Operand::Expr(_) | Operand::Query(_))
    {
        return Err(Error::UnsupportedScalarOperator { operator });
    }

    let sql_right = consume(me, &value, ctx, EscapeMode::Param)?;

    Ok(match operator.as_str() {
        "like" | "not like" => {
            me.render_condition_like(operator == "not like", &sql_left, &sql_right)
        }
        "regexp" | "not regexp" => {
            me.render_condition_regexp(operator == "not regexp", &sql_left, &sql_right, false)
        }
        _ => me.render_condition_binary(&operator, &sql_left, &sql_right),
    })
}

fn infer_operator(value: &Operand) -> &'static str {
    match value {
        Operand::List(_) => "in",
        Operand::Query(q) if q.is_plain_select() => "in",
        _ => "=",
    }
}

/// A rendered operand is reused via a derived table when it is more than
/// a bare column or placeholder.
pub(crate) fn non_trivial_sql(sql: &str) -> bool {
    sql.contains(char::is_whitespace) || sql.contains('(')
}

/// Whether [`binary_reuse`] would wrap the given operands.
pub(crate) fn reuse_needed(
    sql_left: &str,
    sql_right: &str,
    allow_left: bool,
    allow_right: bool,
) -> bool {
    (allow_left && non_trivial_sql(sql_left)) || (allow_right && non_trivial_sql(sql_right))
}

/// Builds `make(left, right)`, routing non-trivial operands through a
/// one-row derived table so each can be referenced more than once without
/// being evaluated more than once.
pub(crate) fn binary_reuse(
    dialect: &dyn Dialect,
    sql_left: &str,
    sql_right: &str,
    allow_left: bool,
    allow_right: bool,
    tag: &str,
    make: &dyn Fn(&str, &str) -> String,
) -> String {
    let left_column = (allow_left && non_trivial_sql(sql_left))
        .then(|| escape_identifier(dialect, &format!("__dsql_{tag}_left__")));
    let right_column = (allow_right && non_trivial_sql(sql_right))
        .then(|| escape_identifier(dialect, &format!("__dsql_{tag}_right__")));

    if left_column.is_none() && right_column.is_none() {
        return make(sql_left, sql_right);
    }

    let mut derived = String::from("select ");
    let left_wrapped = left_column.is_some();
    let left = left_column.map_or_else(
        || String::from(sql_left),
        |col| {
            derived.push_str(sql_left);
            derived.push(' ');
            derived.push_str(&col);
            col
        },
    );
    let right = right_column.map_or_else(
        || String::from(sql_right),
        |col| {
            if left_wrapped {
                derived.push_str(", ");
            }
            derived.push_str(sql_right);
            derived.push(' ');
            derived.push_str(&col);
            col
        },
    );

    if dialect.derived_table_needs_from() {
        derived.push_str(" from DUAL");
    }

    let inner = make(&left, &right);
    let tmp = escape_identifier(dialect, &format!("__dsql_{tag}_tmp__"));
    format!("(select {inner} from ({derived}) {tmp})")
}
