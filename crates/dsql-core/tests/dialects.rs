//! Cross-dialect rendering tests: identifier quoting, statement
//! templates, limit shapes, implicit tables, and execution rewrites.

mod common;
use common::*;

use dsql_core::dialect::{MSSQL, MYSQL, ORACLE, POSTGRES, SQLITE};
use dsql_core::{prepare_for_execute, Error, ExecParams, Mode, Query, Value};

// ===================================================================
// MySQL
// ===================================================================

#[test]
fn mysql_quotes_with_backticks() {
    let q = Query::new(&MYSQL).table("user").unwrap().field("name");
    assert_eq!(sql_of(&q), "select `name` from `user`");
}

#[test]
fn mysql_update_renders_join_before_set() {
    let q = Query::new(&MYSQL)
        .mode(Mode::Update)
        .unwrap()
        .table("user")
        .unwrap()
        .join("address")
        .set("user.address_code", 1)
        .unwrap();
    assert_eq!(
        sql_of(&q),
        "update `user` left join `address` on `address`.`id` = `user`.`address_id` \
         set `user.address_code`=:a"
    );
}

#[test]
fn mysql_group_concat() {
    let base = Query::new(&MYSQL);
    let e = base.group_concat("name", ",").unwrap();
    let (sql, _) = e.render().unwrap();
    assert_eq!(sql, "group_concat(`name` separator ',')");
}

// ===================================================================
// PostgreSQL
// ===================================================================

#[test]
fn postgres_limit_offset_shape() {
    let q = Query::new(&POSTGRES)
        .table("user")
        .unwrap()
        .limit_offset(10, 5);
    assert_eq!(sql_of(&q), r#"select * from "user" limit 10 offset 5"#);
}

#[test]
fn postgres_has_no_replace_mode() {
    assert!(matches!(
        Query::new(&POSTGRES).mode(Mode::Replace),
        Err(Error::UnsupportedMode { .. })
    ));
}

#[test]
fn postgres_like_casts_field_to_citext() {
    let q = Query::new(&POSTGRES)
        .table("user")
        .unwrap()
        .where_op("name", "like", "J%")
        .unwrap();
    let (sql, _) = render(&q);
    assert!(sql.contains(r#"CAST("name" AS citext)"#), "got: {sql}");
    assert!(sql.contains(", 'g')"), "got: {sql}");
}

#[test]
fn postgres_regexp_uses_tilde_operator() {
    let q = Query::new(&POSTGRES)
        .table("user")
        .unwrap()
        .where_op("name", "regexp", "^J")
        .unwrap();
    let (sql, _) = render(&q);
    assert!(sql.contains("~* :a"), "got: {sql}");
}

// ===================================================================
// SQLite
// ===================================================================

#[test]
fn sqlite_truncate_is_rewritten_to_delete() {
    let q = Query::new(&SQLITE)
        .mode(Mode::Truncate)
        .unwrap()
        .table("user")
        .unwrap();
    assert_eq!(sql_of(&q), r#"delete from "user""#);
}

#[test]
fn sqlite_equality_goes_through_affinity_case() {
    let q = Query::new(&SQLITE)
        .table("user")
        .unwrap()
        .where_("id", 1)
        .unwrap();
    let (sql, _) = render(&q);
    assert!(sql.contains("typeof("), "got: {sql}");
}

#[test]
fn sqlite_in_list_expands_to_equality_chain() {
    let q = Query::new(&SQLITE)
        .table("user")
        .unwrap()
        .where_("id", dsql_core::Operand::list([1, 2]))
        .unwrap();
    let (sql, params) = render(&q);
    assert!(sql.contains(" or "), "got: {sql}");
    assert_eq!(params.len(), 2);
}

// ===================================================================
// SQL Server
// ===================================================================

#[test]
fn mssql_quotes_with_brackets_and_pads_limit() {
    let q = Query::new(&MSSQL).table("user").unwrap().limit(10);
    assert_eq!(
        sql_of(&q),
        "select * from [user] order by (select null) offset 0 rows fetch next 10 rows only"
    );
}

#[test]
fn mssql_limit_keeps_explicit_order() {
    let q = Query::new(&MSSQL)
        .table("user")
        .unwrap()
        .order("name")
        .unwrap()
        .limit(10);
    assert_eq!(
        sql_of(&q),
        "select * from [user] order by [name] offset 0 rows fetch next 10 rows only"
    );
}

#[test]
fn mssql_exists_wraps_in_case() {
    let q = Query::new(&MSSQL).table("user").unwrap().exists();
    assert_eq!(
        sql_of(&q),
        "select case when exists(select * from [user]) then 1 else 0 end"
    );
}

#[test]
fn mssql_insert_emits_identity_insert_guard() {
    let q = Query::new(&MSSQL)
        .mode(Mode::Insert)
        .unwrap()
        .table("user")
        .unwrap()
        .set("name", "john")
        .unwrap();
    let (sql, params) = render(&q);
    assert!(sql.starts_with("begin try"), "got: {sql}");
    assert!(sql.contains("set IDENTITY_INSERT [user] on;"), "got: {sql}");
    // the insert body renders twice but binds each value once per body
    assert_eq!(param_names(&params), vec![":a", ":b"]);
}

#[test]
fn mssql_execution_is_positional() {
    let q = Query::new(&MSSQL)
        .table("user")
        .unwrap()
        .where_("name", "john")
        .unwrap()
        .where_("id", 5)
        .unwrap();
    let (sql, params) = render(&q);
    let (sql, exec) = prepare_for_execute(&MSSQL, sql, params);
    assert_eq!(sql, "select * from [user] where [name] = ? and [id] = ?");
    assert!(matches!(
        exec,
        ExecParams::Positional(v)
            if v == vec![Value::Str(String::from("john")), Value::Int(5)]
    ));
}

// ===================================================================
// Oracle
// ===================================================================

#[test]
fn oracle_select_without_table_uses_dual() {
    let base = Query::new(&ORACLE);
    let one = base.expr("1");
    let q = base.field(one);
    assert_eq!(sql_of(&q), r#"select 1 from "DUAL""#);
}

#[test]
fn oracle_parameter_names_start_high() {
    let q = Query::new(&ORACLE)
        .table("user")
        .unwrap()
        .where_("id", 1)
        .unwrap();
    let (sql, params) = render(&q);
    assert_eq!(sql, r#"select * from "user" where "id" = :xxaaaa"#);
    assert_eq!(param_names(&params), vec![":xxaaaa"]);
}

#[test]
fn oracle_limit_uses_fetch_next() {
    let q = Query::new(&ORACLE).table("user").unwrap().limit_offset(10, 5);
    assert_eq!(
        sql_of(&q),
        r#"select * from "user" offset 5 rows fetch next 10 rows only"#
    );
}

#[test]
fn oracle_execution_casts_int_params() {
    let q = Query::new(&ORACLE)
        .table("user")
        .unwrap()
        .where_("id", 5)
        .unwrap();
    let (sql, params) = render(&q);
    let (sql, exec) = prepare_for_execute(&ORACLE, sql, params);
    assert_eq!(
        sql,
        r#"select * from "user" where "id" = cast(:xxaaaa as INTEGER)"#
    );
    assert_eq!(exec.len(), 1);
}
