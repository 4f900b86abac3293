//! DDL execution against a live connection.

use dsql_core::dialect::Dialect;
use dsql_core::{escape_identifier, Connection, ExecParams, Params, Query};

use crate::error::Result;
use crate::schema::TableDef;

/// Applies schema changes through a [`Connection`].
pub struct Migrator<'a> {
    connection: &'a mut dyn Connection,
}

impl<'a> Migrator<'a> {
    /// Wraps a connection.
    pub fn new(connection: &'a mut dyn Connection) -> Self {
        Self { connection }
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.connection.dialect()
    }

    /// Runs one DDL statement. Statements carry no parameters, every
    /// value is inlined as a quoted literal.
    fn run(&mut self, sql: String) -> Result<()> {
        let sql = self.dialect().post_render(sql);
        tracing::debug!(sql = %sql, "apply schema statement");
        self.connection.execute(&sql, &ExecParams::Named(Params::new()))?;
        Ok(())
    }

    /// Column clause for an auto-increment primary key.
    fn id_column_sql(&self, name: &str) -> String {
        let escaped = escape_identifier(self.dialect(), name);
        let definition = match self.dialect().name() {
            // SQLite ties auto-increment to the rowid alias, so the
            // primary key has to be declared inline
            "sqlite" => "INTEGER PRIMARY KEY AUTOINCREMENT",
            "mysql" | "mysql-5.x" => "BIGINT NOT NULL AUTO_INCREMENT",
            "postgres" => "BIGSERIAL NOT NULL",
            "mssql" => "BIGINT IDENTITY(1,1) NOT NULL",
            "oracle" => "NUMBER(19) GENERATED BY DEFAULT ON NULL AS IDENTITY NOT NULL",
            _ => "BIGINT NOT NULL",
        };
        format!("{escaped} {definition}")
    }

    /// Creates a table from its definition.
    pub fn create_table(&mut self, table: &TableDef) -> Result<()> {
        let dialect = self.dialect();
        let mut clauses = vec![];

        if let Some(id) = &table.id_column {
            clauses.push(self.id_column_sql(id));
        }
        for column in &table.columns {
            let mut clause = format!(
                "{} {}",
                escape_identifier(dialect, &column.name),
                column.ty.sql_name(dialect),
            );
            if !column.nullable {
                clause.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                clause.push_str(" DEFAULT ");
                clause.push_str(&default.to_sql(dialect));
            }
            clauses.push(clause);
        }
        if let Some(id) = &table.id_column {
            if dialect.name() != "sqlite" {
                clauses.push(format!(
                    "primary key ({})",
                    escape_identifier(dialect, id)
                ));
            }
        }

        self.run(format!(
            "create table {} ({})",
            escape_identifier(dialect, &table.name),
            clauses.join(", "),
        ))
    }

    /// Drops a table, failing when it does not exist.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        self.run(format!(
            "drop table {}",
            escape_identifier(self.dialect(), table)
        ))
    }

    /// Drops a table when it exists, otherwise does nothing.
    pub fn drop_table_if_exists(&mut self, table: &str) -> Result<()> {
        if !self.table_exists(table) {
            return Ok(());
        }
        self.drop_table(table)
    }

    /// Probes for a table with a zero-row select.
    #[must_use]
    pub fn table_exists(&mut self, table: &str) -> bool {
        let probe = Query::new(self.dialect()).table(table).map(|q| {
            let one = q.expr("1");
            q.field(one).limit(1)
        });
        match probe {
            Ok(query) => query.fetch(self.connection).is_ok(),
            Err(_) => false,
        }
    }

    /// Creates an index over the given columns.
    pub fn create_index(
        &mut self,
        table: &str,
        name: &str,
        columns: &[&str],
        unique: bool,
    ) -> Result<()> {
        let dialect = self.dialect();
        let columns = columns
            .iter()
            .map(|c| escape_identifier(dialect, c))
            .collect::<Vec<_>>()
            .join(", ");
        self.run(format!(
            "create {}index {} on {} ({columns})",
            if unique { "unique " } else { "" },
            escape_identifier(dialect, name),
            escape_identifier(dialect, table),
        ))
    }
}
