//! Tests for condition compilation: operator inference, NULL handling,
//! IN lists, raw chunks, and the OR/AND/CASE expression forms.

mod common;
use common::*;

use dsql_core::{query, Error, Operand, Value};

// ===================================================================
// Operator inference
// ===================================================================

#[test]
fn plain_value_infers_equality() {
    let q = query().table("user").unwrap().where_("name", "john").unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where "name" = :a"#);
}

#[test]
fn list_value_infers_in() {
    let q = query()
        .table("user")
        .unwrap()
        .where_("id", Operand::list([1, 2, 3]))
        .unwrap();
    let (sql, params) = render(&q);
    assert_eq!(sql, r#"select * from "user" where "id" in (:a, :b, :c)"#);
    assert_eq!(param_names(&params), vec![":a", ":b", ":c"]);
}

#[test]
fn select_subquery_infers_in() {
    let sub = query().table("expired").unwrap().field("user_id");
    let q = query().table("user").unwrap().where_("id", sub).unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select * from "user" where "id" in (select "user_id" from "expired")"#
    );
}

#[test]
fn explicit_operator_is_normalized() {
    let q = query().table("user").unwrap().where_op("age", " >= ", 21).unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where "age" >= :a"#);
}

#[test]
fn unknown_operator_is_rejected() {
    let q = query().table("user").unwrap().where_op("age", "<>", 21).unwrap();
    assert!(matches!(
        q.render(),
        Err(Error::UnsupportedOperator { operator }) if operator == "<>"
    ));
}

#[test]
fn field_with_embedded_operator_is_rejected() {
    let err = query().where_("age >=", 21).unwrap_err();
    assert!(matches!(
        err,
        Error::FieldConditionMustBePassedSeparately { .. }
    ));
}

// ===================================================================
// NULL handling
// ===================================================================

#[test]
fn equality_with_null_becomes_is_null() {
    let q = query().table("user").unwrap().where_("deleted", Value::Null).unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where "deleted" is null"#);
}

#[test]
fn inequality_with_null_becomes_is_not_null() {
    let q = query()
        .table("user")
        .unwrap()
        .where_op("deleted", "!=", Value::Null)
        .unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select * from "user" where "deleted" is not null"#
    );
}

#[test]
fn ordering_against_null_is_rejected() {
    let q = query().table("user").unwrap().where_op("age", ">", Value::Null).unwrap();
    assert!(matches!(
        q.render(),
        Err(Error::UnsupportedNullOperator { .. })
    ));
}

// ===================================================================
// IN lists
// ===================================================================

#[test]
fn empty_in_list_never_matches() {
    let q = query()
        .table("user")
        .unwrap()
        .where_("id", Operand::list(Vec::<i64>::new()))
        .unwrap();
    let (sql, params) = render(&q);
    assert_eq!(sql, r#"select * from "user" where 1 = 0"#);
    assert!(params.is_empty());
}

#[test]
fn empty_not_in_list_always_matches() {
    let q = query()
        .table("user")
        .unwrap()
        .where_op("id", "not in", Operand::list(Vec::<i64>::new()))
        .unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where 1 = 1"#);
}

#[test]
fn null_inside_in_list_is_rejected() {
    let q = query()
        .table("user")
        .unwrap()
        .where_("id", Operand::list([Value::Int(1), Value::Null]))
        .unwrap();
    assert!(matches!(q.render(), Err(Error::NullInListCondition)));
}

#[test]
fn in_with_scalar_value_is_rejected() {
    let q = query().table("user").unwrap().where_op("id", "in", 5).unwrap();
    assert!(matches!(
        q.render(),
        Err(Error::UnsupportedScalarOperator { .. })
    ));
}

#[test]
fn list_with_equality_operator_is_rejected() {
    let q = query()
        .table("user")
        .unwrap()
        .where_op("id", "=", Operand::list([1, 2]))
        .unwrap();
    assert!(matches!(
        q.render(),
        Err(Error::UnsupportedListOperator { .. })
    ));
}

// ===================================================================
// LIKE and REGEXP on the generic dialect
// ===================================================================

#[test]
fn generic_like_normalizes_pattern_escapes() {
    let q = query().table("user").unwrap().where_op("name", "like", "J%").unwrap();
    assert_eq!(
        sql_of(&q),
        "select * from \"user\" where \"name\" like regexp_replace(:a, \
         '(\\\\[\\\\_%])|(\\\\)', '\\1\\2\\2') escape '\\'"
    );
}

#[test]
fn generic_not_regexp() {
    let q = query()
        .table("user")
        .unwrap()
        .where_op("name", "not regexp", "^J")
        .unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select * from "user" where not regexp_like("name", :a, 'is')"#
    );
}

// ===================================================================
// Raw conditions and derived expression forms
// ===================================================================

#[test]
fn raw_string_condition_renders_in_parens() {
    let q = query().table("user").unwrap().where_raw("a = b").unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where (a = b)"#);
}

#[test]
fn raw_expression_condition_binds_args() {
    let cond = query().expr("[] = []").arg(1).arg(2);
    let q = query().table("user").unwrap().where_raw(cond).unwrap();
    assert_eq!(sql_of(&q), r#"select * from "user" where (:a = :b)"#);
}

#[test]
fn or_expr_joins_conditions() {
    let q = query().table("user").unwrap();
    let or = q
        .or_expr()
        .where_("name", "john")
        .unwrap()
        .where_("surname", "smith")
        .unwrap();
    let q = q.where_raw(or).unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select * from "user" where ("name" = :a or "surname" = :b)"#
    );
}

#[test]
fn and_expr_nested_inside_or() {
    let base = query();
    let and = base
        .and_expr()
        .where_("a", 1)
        .unwrap()
        .where_("b", 2)
        .unwrap();
    let or = base.or_expr().where_("c", 3).unwrap().where_raw(and).unwrap();
    let q = query().table("t").unwrap().where_raw(or).unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select * from "t" where ("c" = :a or ("a" = :b and "b" = :c))"#
    );
}

#[test]
fn or_expr_rejects_mixed_where_and_having() {
    let base = query();
    let or = base
        .or_expr()
        .where_("a", 1)
        .unwrap()
        .having("b", 2)
        .unwrap();
    assert!(matches!(or.render(), Err(Error::MixedWhereHaving)));
}

#[test]
fn having_renders_after_group() {
    let q = query()
        .table("invoice")
        .unwrap()
        .field("client_id")
        .group("client_id")
        .having_op("client_id", ">", 10)
        .unwrap();
    assert_eq!(
        sql_of(&q),
        r#"select "client_id" from "invoice" group by "client_id" having "client_id" > :a"#
    );
}

// ===================================================================
// CASE expressions
// ===================================================================

#[test]
fn simple_case_compares_operand() {
    let base = query();
    let case = base
        .case_expr_on("status")
        .case_when("open", 1)
        .case_when("closed", 2)
        .case_else(0);
    let q = query().table("order").unwrap().field(case);
    assert_eq!(
        sql_of(&q),
        r#"select (case "status" when :a then :b when :c then :d else :e end) from "order""#
    );
}

#[test]
fn searched_case_renders_conditions() {
    let base = query();
    let case = base
        .case_expr()
        .case_when_cond("age", Some(">="), 18, "adult")
        .unwrap()
        .case_else("minor");
    let q = query().table("person").unwrap().field(case);
    assert_eq!(
        sql_of(&q),
        r#"select (case when "age" >= :a then :b else :c end) from "person""#
    );
}

#[test]
fn mismatched_case_forms_are_rejected() {
    let base = query();
    let case = base.case_expr_on("status").case_when_cond("a", None, 1, 2).unwrap();
    let q = query().field(case);
    assert!(matches!(q.render(), Err(Error::InvalidCaseWhen)));
}

// ===================================================================
// exists
// ===================================================================

#[test]
fn generic_exists_renders_as_option() {
    let q = query()
        .table("user")
        .unwrap()
        .where_("id", 1)
        .unwrap()
        .exists();
    assert_eq!(
        sql_of(&q),
        r#"select exists (select * from "user" where "id" = :a)"#
    );
}
