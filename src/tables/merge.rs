// src/tables/merge.rs - Key-based joins over loaded tables

use anyhow::{bail, Context, Result};
use log::debug;
use std::collections::{HashMap, HashSet};

use crate::models::table::{Column, ColumnKind, Table, Value};

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only rows whose key matches on both sides.
    Inner,
    /// Every left row; unmatched right columns are null.
    Left,
}

/// Hashable form of a join-key cell. Integral floats collapse onto `Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl JoinKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::Int(v) => Some(JoinKey::Int(*v)),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 =>
            {
                Some(JoinKey::Int(*v as i64))
            }
            Value::Float(v) => Some(JoinKey::Float(v.to_bits())),
            Value::Text(s) => Some(JoinKey::Text(s.clone())),
        }
    }
}

fn kinds_compatible(left: ColumnKind, right: ColumnKind) -> bool {
    left == right
        || (left.is_numeric() && right.is_numeric())
        || left == ColumnKind::Other
        || right == ColumnKind::Other
}

/// Joins `right` onto `left`, matching `left_on` to `right_on`.
///
/// Output rows follow left-row order and, within one left row, right-row
/// order. Non-unique right keys multiply left rows. When both key columns
/// share a name the right key is folded into the left one; otherwise both
/// are kept. Other column names present on both sides get `_x`/`_y`.
pub fn join(
    left: &Table,
    right: &Table,
    left_on: &str,
    right_on: &str,
    how: JoinType,
) -> Result<Table> {
    let left_key = left
        .require_column(left_on)
        .context("Join key missing from left table")?;
    let right_key = right
        .require_column(right_on)
        .context("Join key missing from right table")?;

    let (left_kind, right_kind) = (left.columns[left_key].kind, right.columns[right_key].kind);
    if !kinds_compatible(left_kind, right_kind) {
        bail!(
            "Incompatible join key types: '{}' is {:?} but '{}' is {:?}",
            left_on,
            left_kind,
            right_on,
            right_kind
        );
    }

    let shared_key = left_on == right_on;
    let right_kept: Vec<usize> = (0..right.columns.len())
        .filter(|&i| !(shared_key && i == right_key))
        .collect();

    let left_names: HashSet<&str> = left.columns.iter().map(|c| c.name.as_str()).collect();
    let right_names: HashSet<&str> = right_kept
        .iter()
        .map(|&i| right.columns[i].name.as_str())
        .collect();
    let overlapping = |name: &str| {
        left_names.contains(name)
            && right_names.contains(name)
            && !(shared_key && name == left_on)
    };

    let mut columns: Vec<Column> = left
        .columns
        .iter()
        .map(|c| match overlapping(&c.name) {
            true => Column::new(format!("{}{}", c.name, LEFT_SUFFIX), c.kind),
            false => c.clone(),
        })
        .collect();
    columns.extend(right_kept.iter().map(|&i| {
        let c = &right.columns[i];
        match overlapping(&c.name) {
            true => Column::new(format!("{}{}", c.name, RIGHT_SUFFIX), c.kind),
            false => c.clone(),
        }
    }));

    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows.iter().enumerate() {
        if let Some(key) = JoinKey::from_value(&row[right_key]) {
            index.entry(key).or_default().push(row_idx);
        }
    }

    let mut merged = Table::new(columns);
    for left_row in &left.rows {
        let matches = JoinKey::from_value(&left_row[left_key]).and_then(|k| index.get(&k));
        match (matches, how) {
            (Some(right_rows), _) => {
                for &right_idx in right_rows {
                    let right_row = &right.rows[right_idx];
                    let mut row = left_row.clone();
                    row.extend(right_kept.iter().map(|&i| right_row[i].clone()));
                    merged.rows.push(row);
                }
            }
            (None, JoinType::Left) => {
                let mut row = left_row.clone();
                row.extend(right_kept.iter().map(|_| Value::Null));
                merged.rows.push(row);
            }
            (None, JoinType::Inner) => {}
        }
    }

    debug!(
        "{:?} join {} = {}: {} x {} rows -> {} rows",
        how,
        left_on,
        right_on,
        left.len(),
        right.len(),
        merged.len()
    );
    Ok(merged)
}

/// Merges `[cities, alternatenames, admin_codes, countries]`, already trimmed,
/// into one denormalized table.
pub fn merge_tables(tables: [Table; 4]) -> Result<Table> {
    let [cities, alternatenames, admin_codes, countries] = tables;

    let merged = join(&cities, &alternatenames, "geonameid", "geonameid", JoinType::Inner)
        .context("Failed to join cities with alternate names")?;

    let merged = join(&merged, &admin_codes, "geonameid", "code", JoinType::Inner)
        .context("Failed to join admin codes")?
        .drop_columns(&["code"])?;

    let merged = join(&merged, &countries, "country", "country_code", JoinType::Left)
        .context("Failed to join countries")?
        .drop_columns(&["country_code"])?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[(&str, ColumnKind)], rows: Vec<Vec<Value>>) -> Table {
        let mut t = Table::new(
            columns
                .iter()
                .map(|(name, kind)| Column::new(*name, *kind))
                .collect(),
        );
        for row in rows {
            t.push_row(row).unwrap();
        }
        t
    }

    fn cities() -> Table {
        table(
            &[
                ("geonameid", ColumnKind::Integer),
                ("name", ColumnKind::Text),
                ("region", ColumnKind::Text),
                ("country", ColumnKind::Text),
            ],
            vec![
                vec![Value::Int(1), "Paris".into(), "Ile-de-France".into(), "FR".into()],
                vec![Value::Int(2), "London".into(), "England".into(), "GB".into()],
                vec![Value::Int(3), "Atlantis".into(), Value::Null, "XX".into()],
                vec![Value::Int(4), "Nowhere".into(), Value::Null, "FR".into()],
            ],
        )
    }

    fn alternatenames() -> Table {
        table(
            &[("geonameid", ColumnKind::Integer), ("isolanguage", ColumnKind::Text)],
            vec![
                vec![Value::Int(1), "fr".into()],
                vec![Value::Int(2), "en".into()],
                vec![Value::Int(3), "en".into()],
            ],
        )
    }

    fn admin_codes() -> Table {
        table(
            &[("code", ColumnKind::Integer), ("asciiname", ColumnKind::Text)],
            vec![
                vec![Value::Int(3), "Atlantis".into()],
                vec![Value::Int(1), "Paris".into()],
                vec![Value::Int(2), "London".into()],
            ],
        )
    }

    fn countries() -> Table {
        table(
            &[("country_code", ColumnKind::Text), ("country_name", ColumnKind::Text)],
            vec![
                vec!["GB".into(), "United Kingdom".into()],
                vec!["FR".into(), "France".into()],
            ],
        )
    }

    #[test]
    fn test_inner_join_on_shared_key() {
        let joined = join(&cities(), &alternatenames(), "geonameid", "geonameid", JoinType::Inner)
            .unwrap();
        assert_eq!(
            joined.column_names(),
            vec!["geonameid", "name", "region", "country", "isolanguage"]
        );
        // geonameid 4 has no alternate name and is dropped
        let ids: Vec<_> = joined.column_values("geonameid").unwrap();
        assert_eq!(ids, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);
    }

    #[test]
    fn test_inner_join_keeps_left_order() {
        let joined = join(&cities(), &admin_codes(), "geonameid", "code", JoinType::Inner).unwrap();
        let ids: Vec<_> = joined.column_values("geonameid").unwrap();
        assert_eq!(ids, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);
        assert!(joined.column_index("code").is_some());
    }

    #[test]
    fn test_left_join_fills_nulls() {
        let joined = join(&cities(), &countries(), "country", "country_code", JoinType::Left).unwrap();
        assert_eq!(joined.len(), 4);
        let names = joined.column_values("country_name").unwrap();
        assert_eq!(names[0], &Value::from("France"));
        assert_eq!(names[2], &Value::Null);
        assert_eq!(joined.column_values("country_code").unwrap()[2], &Value::Null);
    }

    #[test]
    fn test_duplicate_right_keys_multiply_rows() {
        let dup_countries = table(
            &[("country_code", ColumnKind::Text), ("country_name", ColumnKind::Text)],
            vec![
                vec!["FR".into(), "France".into()],
                vec!["FR".into(), "République française".into()],
            ],
        );
        let joined = join(&cities(), &dup_countries, "country", "country_code", JoinType::Left)
            .unwrap();
        // Paris x2, London, Atlantis, Nowhere x2
        assert_eq!(joined.len(), 6);
        let names = joined.column_values("country_name").unwrap();
        assert_eq!(names[0], &Value::from("France"));
        assert_eq!(names[1], &Value::from("République française"));
    }

    #[test]
    fn test_null_keys_never_match() {
        let left = table(
            &[("geonameid", ColumnKind::Integer)],
            vec![vec![Value::Null], vec![Value::Int(1)]],
        );
        let right = table(
            &[("geonameid", ColumnKind::Integer), ("note", ColumnKind::Text)],
            vec![vec![Value::Null, "null".into()], vec![Value::Int(1), "one".into()]],
        );
        let joined = join(&left, &right, "geonameid", "geonameid", JoinType::Inner).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows[0], vec![Value::Int(1), Value::from("one")]);
    }

    #[test]
    fn test_integral_float_matches_int_key() {
        let left = table(&[("geonameid", ColumnKind::Integer)], vec![vec![Value::Int(7)]]);
        let right = table(
            &[("code", ColumnKind::Float)],
            vec![vec![Value::Float(7.0)], vec![Value::Float(7.5)]],
        );
        let joined = join(&left, &right, "geonameid", "code", JoinType::Inner).unwrap();
        assert_eq!(joined.len(), 1);
    }

    #[test]
    fn test_incompatible_key_types_fail() {
        let left = table(&[("geonameid", ColumnKind::Integer)], vec![vec![Value::Int(1)]]);
        let right = table(&[("code", ColumnKind::Text)], vec![vec!["US.CA".into()]]);
        let err = join(&left, &right, "geonameid", "code", JoinType::Inner).unwrap_err();
        assert!(err.to_string().contains("Incompatible join key types"));
    }

    #[test]
    fn test_overlapping_columns_are_suffixed() {
        let right = table(
            &[("code", ColumnKind::Integer), ("name", ColumnKind::Text)],
            vec![vec![Value::Int(1), "Île-de-France".into()]],
        );
        let joined = join(&cities(), &right, "geonameid", "code", JoinType::Inner).unwrap();
        assert_eq!(
            joined.column_names(),
            vec!["geonameid", "name_x", "region", "country", "code", "name_y"]
        );
        assert!(joined.select(&["name"]).is_err());
    }

    #[test]
    fn test_merge_tables() {
        let merged = merge_tables([cities(), alternatenames(), admin_codes(), countries()]).unwrap();
        assert_eq!(
            merged.column_names(),
            vec![
                "geonameid",
                "name",
                "region",
                "country",
                "isolanguage",
                "asciiname",
                "country_name"
            ]
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.rows[2][6], Value::Null);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let first = merge_tables([cities(), alternatenames(), admin_codes(), countries()]).unwrap();
        let second = merge_tables([cities(), alternatenames(), admin_codes(), countries()]).unwrap();
        assert_eq!(first, second);
    }
}
