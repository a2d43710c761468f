// src/tables/loader.rs

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use tokio_postgres::types::Type;
use tokio_postgres::{GenericClient, Row};

use crate::models::table::{Column, ColumnKind, Table, Value};

/// The GeoNames reference tables read by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTable {
    Countries,
    Cities,
    AdminCodes,
    AlternateNames,
}

impl SourceTable {
    pub fn table_name(self) -> &'static str {
        match self {
            SourceTable::Countries => "countries",
            SourceTable::Cities => "cities",
            SourceTable::AdminCodes => "admin_codes",
            SourceTable::AlternateNames => "alternatenames",
        }
    }

    pub fn select_all_sql(self) -> String {
        format!("SELECT * FROM {}", self.table_name())
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

pub fn column_kind(ty: &Type) -> ColumnKind {
    match *ty {
        Type::BOOL => ColumnKind::Bool,
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => ColumnKind::Integer,
        Type::FLOAT4 | Type::FLOAT8 => ColumnKind::Float,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => ColumnKind::Text,
        _ => ColumnKind::Other,
    }
}

fn is_decodable(ty: &Type) -> bool {
    column_kind(ty) != ColumnKind::Other
        || matches!(
            *ty,
            Type::DATE | Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::JSON | Type::JSONB
        )
}

fn cell_value(row: &Row, idx: usize, ty: &Type) -> Result<Value> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool).into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(i64::from).into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(i64::from).into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| d.to_string())
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|ts| ts.to_rfc3339())
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|json| json.to_string())
            .into(),
        _ => Value::Null,
    };
    Ok(value)
}

/// Runs `SELECT *` against one source table and collects every row.
///
/// The schema comes from the prepared statement, so an empty table still
/// reports its columns. Columns of unsupported Postgres types load as null.
pub async fn load_table(client: &impl GenericClient, table: SourceTable) -> Result<Table> {
    let sql = table.select_all_sql();
    debug!("Loading table: {}", sql);

    let statement = client
        .prepare(&sql)
        .await
        .with_context(|| format!("Failed to prepare query for table '{}'", table))?;

    let types: Vec<Type> = statement.columns().iter().map(|c| c.type_().clone()).collect();
    let columns: Vec<Column> = statement
        .columns()
        .iter()
        .map(|c| Column::new(c.name(), column_kind(c.type_())))
        .collect();

    for (column, ty) in columns.iter().zip(&types) {
        if !is_decodable(ty) {
            warn!(
                "Table '{}': column '{}' has unsupported type {}; values load as null",
                table, column.name, ty
            );
        }
    }

    let rows = client
        .query(&statement, &[])
        .await
        .with_context(|| format!("Failed to load table '{}'", table))?;

    let mut loaded = Table::new(columns);
    loaded.rows.reserve(rows.len());
    for row in &rows {
        let values = types
            .iter()
            .enumerate()
            .map(|(idx, ty)| cell_value(row, idx, ty))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Failed to decode row from table '{}'", table))?;
        loaded.push_row(values)?;
    }

    info!(
        "Loaded {} rows ({} columns) from '{}'",
        loaded.len(),
        loaded.columns.len(),
        table
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_sql() {
        assert_eq!(SourceTable::Cities.select_all_sql(), "SELECT * FROM cities");
        assert_eq!(
            SourceTable::AlternateNames.select_all_sql(),
            "SELECT * FROM alternatenames"
        );
        assert_eq!(SourceTable::AdminCodes.to_string(), "admin_codes");
    }

    #[test]
    fn test_column_kind_mapping() {
        assert_eq!(column_kind(&Type::INT4), ColumnKind::Integer);
        assert_eq!(column_kind(&Type::INT8), ColumnKind::Integer);
        assert_eq!(column_kind(&Type::FLOAT8), ColumnKind::Float);
        assert_eq!(column_kind(&Type::VARCHAR), ColumnKind::Text);
        assert_eq!(column_kind(&Type::BOOL), ColumnKind::Bool);
        assert_eq!(column_kind(&Type::NUMERIC), ColumnKind::Other);
    }

    #[test]
    fn test_decodable_types() {
        assert!(is_decodable(&Type::TEXT));
        assert!(is_decodable(&Type::DATE));
        assert!(is_decodable(&Type::JSONB));
        assert!(!is_decodable(&Type::NUMERIC));
        assert!(!is_decodable(&Type::BYTEA));
    }
}
