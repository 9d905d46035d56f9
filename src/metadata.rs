//! Metadata types returned by the query service.
//!
//! These are single-request lookups (databases, tables, table schema); the
//! fetch methods live on [`crate::client::ConduitClient`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wire::WireRequest;

/// Databases visible to the token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Databases {
    #[serde(default, alias = "Databases")]
    pub databases: Vec<String>,
}

impl fmt::Display for Databases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for database in &self.databases {
            writeln!(f, "Database: {}", database)?;
        }
        Ok(())
    }
}

/// One table entry from a database listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    #[serde(default, alias = "Table")]
    pub table: String,
    #[serde(default, alias = "Database")]
    pub database: String,
    #[serde(default, alias = "Schema")]
    pub schema: String,
    #[serde(default, alias = "TableType")]
    pub table_type: String,
}

/// Tables in one database.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tables {
    #[serde(default, alias = "Tables")]
    pub tables: Vec<TableInfo>,
}

impl fmt::Display for Tables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.tables {
            writeln!(
                f,
                "Table: {}, from db: {}, is a part of schema: {}, and is of type: {}",
                t.table, t.database, t.schema, t.table_type
            )?;
        }
        Ok(())
    }
}

/// Column description from a table schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "ColType")]
    pub col_type: String,
    #[serde(default, alias = "LengthOpt")]
    pub length_opt: Option<String>,
    #[serde(default, alias = "ScaleOpt")]
    pub scale_opt: Option<String>,
    #[serde(default, alias = "SqlType")]
    pub sql_type: i32,
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column name: {}, colType: {}, lengthOpt: {}, scaleOpt: {}, sqlType: {}",
            self.name,
            self.col_type,
            self.length_opt.as_deref().unwrap_or(""),
            self.scale_opt.as_deref().unwrap_or(""),
            self.sql_type
        )
    }
}

/// Column layout of one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default, alias = "Database")]
    pub database: String,
    #[serde(default, alias = "Table")]
    pub table: String,
    #[serde(default, alias = "Columns")]
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// Fills in the database and table names when the server omitted them.
    pub fn with_identity(mut self, database: &str, table: &str) -> Self {
        if self.database.is_empty() {
            self.database = database.to_string();
        }
        if self.table.is_empty() {
            self.table = table.to_string();
        }
        self
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for column in &self.columns {
            writeln!(f, "{}", column)?;
        }
        Ok(())
    }
}

pub(crate) fn databases_request() -> WireRequest {
    WireRequest::get(["query", "metadata", "databases"])
}

pub(crate) fn tables_request(database: &str) -> WireRequest {
    WireRequest::get(["query", "metadata", "databases", database, "tables"])
}

pub(crate) fn table_schema_request(database: &str, table: &str) -> WireRequest {
    WireRequest::get([
        "query", "metadata", "databases", database, "tables", table, "schema",
    ])
}
