//! Schema definition types.
//!
//! These types describe tables and columns independently of any dialect;
//! the SQL type names are resolved against a [`Dialect`] when the DDL is
//! rendered. Definitions serialize to JSON so a schema snapshot can be
//! stored and compared later.

use dsql_core::dialect::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Column data types supported by the schema layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Boolean.
    Boolean,
    /// Double-precision float.
    Float,
    /// Variable-length string with a maximum length.
    String(u32),
    /// Unbounded text.
    Text,
    /// Variable-length binary data with a maximum length.
    Binary(u32),
    /// Unbounded binary data.
    Blob,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    DateTime,
    /// Decimal with precision and scale.
    Decimal(u8, u8),
    /// JSON document.
    Json,
}

impl ColumnType {
    /// SQL type name on the given dialect.
    #[must_use]
    pub fn sql_name(self, dialect: &dyn Dialect) -> String {
        let mysql = matches!(dialect.name(), "mysql" | "mysql-5.x");
        match self {
            Self::Integer => String::from(match dialect.name() {
                "mssql" => "INT",
                "oracle" => "NUMBER(10)",
                _ if mysql => "INT",
                _ => "INTEGER",
            }),
            Self::BigInt => String::from(match dialect.name() {
                "sqlite" => "INTEGER",
                "oracle" => "NUMBER(19)",
                _ => "BIGINT",
            }),
            Self::Boolean => String::from(match dialect.name() {
                "sqlite" => "INTEGER",
                "mssql" => "BIT",
                "oracle" => "NUMBER(1)",
                _ if mysql => "TINYINT(1)",
                _ => "BOOLEAN",
            }),
            Self::Float => String::from(match dialect.name() {
                "sqlite" => "REAL",
                "mssql" => "FLOAT",
                "oracle" => "BINARY_DOUBLE",
                _ if mysql => "DOUBLE",
                _ => "DOUBLE PRECISION",
            }),
            Self::String(len) => match dialect.name() {
                "mssql" => format!("NVARCHAR({len})"),
                "oracle" => format!("VARCHAR2({len})"),
                _ => format!("VARCHAR({len})"),
            },
            Self::Text => String::from(match dialect.name() {
                "mssql" => "NVARCHAR(MAX)",
                "oracle" => "CLOB",
                _ if mysql => "LONGTEXT",
                _ => "TEXT",
            }),
            Self::Binary(len) => match dialect.name() {
                "postgres" => String::from("BYTEA"),
                "sqlite" => String::from("BLOB"),
                "oracle" => format!("RAW({len})"),
                _ => format!("VARBINARY({len})"),
            },
            Self::Blob => String::from(match dialect.name() {
                "postgres" => "BYTEA",
                "mssql" => "VARBINARY(MAX)",
                "sqlite" | "oracle" => "BLOB",
                _ if mysql => "LONGBLOB",
                _ => "BLOB",
            }),
            Self::Date => String::from("DATE"),
            Self::Time => String::from(match dialect.name() {
                "oracle" => "DATE",
                _ => "TIME",
            }),
            Self::DateTime => String::from(match dialect.name() {
                "postgres" | "oracle" => "TIMESTAMP",
                "mssql" => "DATETIME2",
                _ => "DATETIME",
            }),
            Self::Decimal(precision, scale) => match dialect.name() {
                "oracle" => format!("NUMBER({precision}, {scale})"),
                _ => format!("NUMERIC({precision}, {scale})"),
            },
            Self::Json => String::from(match dialect.name() {
                "sqlite" => "TEXT",
                "mssql" => "NVARCHAR(MAX)",
                "oracle" => "CLOB",
                _ => "JSON",
            }),
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// Raw SQL expression, e.g. `CURRENT_TIMESTAMP`.
    Expression(String),
}

impl DefaultValue {
    /// Renders the default as SQL on the given dialect.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => dsql_core::value::float_to_sql(*f),
            Self::String(s) => dialect.escape_string_literal(s),
            Self::Expression(sql) => sql.clone(),
        }
    }
}

/// One column of a table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub ty: ColumnType,
    /// Whether NULL values are allowed.
    pub nullable: bool,
    /// Default value, when one is declared.
    pub default: Option<DefaultValue>,
}

impl ColumnDef {
    /// Creates a nullable column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Declares a default value.
    #[must_use]
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A table definition: an optional auto-increment primary key plus
/// ordinary columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Auto-increment primary key column name, when the table has one.
    pub id_column: Option<String>,
    /// Ordinary columns, in declaration order.
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_column: None,
            columns: vec![],
        }
    }

    /// Adds an auto-increment primary key column.
    #[must_use]
    pub fn id(mut self, name: impl Into<String>) -> Self {
        self.id_column = Some(name.into());
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Serializes the definition for snapshot storage.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a definition from snapshot storage.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsql_core::dialect::{MYSQL, ORACLE, POSTGRES, SQLITE};

    #[test]
    fn test_type_names_per_dialect() {
        assert_eq!(ColumnType::BigInt.sql_name(&SQLITE), "INTEGER");
        assert_eq!(ColumnType::BigInt.sql_name(&POSTGRES), "BIGINT");
        assert_eq!(ColumnType::String(255).sql_name(&ORACLE), "VARCHAR2(255)");
        assert_eq!(ColumnType::Text.sql_name(&MYSQL), "LONGTEXT");
        assert_eq!(ColumnType::Decimal(10, 2).sql_name(&MYSQL), "NUMERIC(10, 2)");
    }

    #[test]
    fn test_default_value_sql() {
        assert_eq!(DefaultValue::Int(5).to_sql(&MYSQL), "5");
        assert_eq!(DefaultValue::String(String::from("a'b")).to_sql(&SQLITE), "'a''b'");
        assert_eq!(
            DefaultValue::Expression(String::from("CURRENT_TIMESTAMP")).to_sql(&POSTGRES),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_table_def_round_trips_through_json() {
        let table = TableDef::new("user")
            .id("id")
            .column(ColumnDef::new("name", ColumnType::String(255)).not_null())
            .column(ColumnDef::new("balance", ColumnType::Decimal(10, 2)));
        let json = table.to_json().unwrap();
        assert_eq!(TableDef::from_json(&json).unwrap(), table);
    }
}
