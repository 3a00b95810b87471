//! Generic row ↔ entity mapping.
//!
//! Each entity describes its table once with an [`EntitySchema`]. Rows are
//! read into a JSON object keyed by column name (flag columns become real
//! booleans, the primary key is always exposed as `id`) and deserialised into
//! the entity record, so no repository hand-writes row conversion.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row, ToSql};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value as Json};

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Value,
    /// Stored as 0/1, surfaced as a boolean.
    Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

pub const fn col(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Value,
    }
}

pub const fn flag(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Flag,
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    /// Human name used in not-found errors.
    pub entity: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
}

impl EntitySchema {
    pub fn select(&self, tail: &str) -> String {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        format!("SELECT {} FROM {} {}", columns.join(", "), self.table, tail)
    }

    fn field_name(&self, column: &Column) -> &'static str {
        if column.name == self.primary_key {
            "id"
        } else {
            column.name
        }
    }
}

pub trait Entity: DeserializeOwned {
    const SCHEMA: &'static EntitySchema;
}

/// A column/value pair for inserts and sparse updates.
pub type Field = (&'static str, Value);

fn row_to_object(schema: &EntitySchema, row: &Row<'_>) -> rusqlite::Result<Map<String, Json>> {
    let mut object = Map::with_capacity(schema.columns.len());
    for (idx, column) in schema.columns.iter().enumerate() {
        let value = to_json(row.get_ref(idx)?, column.kind);
        object.insert(schema.field_name(column).to_string(), value);
    }
    Ok(object)
}

fn to_json(value: ValueRef<'_>, kind: ColumnKind) -> Json {
    match (kind, value) {
        (_, ValueRef::Null) => Json::Null,
        (ColumnKind::Flag, ValueRef::Integer(i)) => Json::Bool(i != 0),
        (ColumnKind::Flag, ValueRef::Real(f)) => Json::Bool(f != 0.0),
        (_, ValueRef::Integer(i)) => Json::from(i),
        (_, ValueRef::Real(f)) => Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null),
        (_, ValueRef::Text(t)) | (_, ValueRef::Blob(t)) => {
            Json::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

fn decode<E: Entity>(object: Map<String, Json>) -> Result<E> {
    serde_json::from_value(Json::Object(object)).map_err(|e| DbError::Mapping {
        table: E::SCHEMA.table,
        reason: e.to_string(),
    })
}

pub fn find_one<E: Entity>(conn: &Connection, column: &str, value: &dyn ToSql) -> Result<Option<E>> {
    let sql = E::SCHEMA.select(&format!("WHERE {} = ?1 LIMIT 1", column));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([value])?;
    match rows.next()? {
        Some(row) => Ok(Some(decode(row_to_object(E::SCHEMA, row)?)?)),
        None => Ok(None),
    }
}

/// `tail` is everything after the table name: WHERE / ORDER BY / LIMIT.
pub fn find_many<E: Entity>(conn: &Connection, tail: &str, params: &[&dyn ToSql]) -> Result<Vec<E>> {
    let sql = E::SCHEMA.select(tail);
    let mut stmt = conn.prepare(&sql)?;
    let objects = stmt
        .query_map(params, |row| row_to_object(E::SCHEMA, row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    objects.into_iter().map(decode).collect()
}

pub fn insert(conn: &Connection, schema: &EntitySchema, fields: &[Field]) -> Result<()> {
    let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table,
        names.join(", "),
        placeholders.join(", ")
    );
    let params: Vec<&dyn ToSql> = fields.iter().map(|(_, v)| v as &dyn ToSql).collect();
    conn.execute(&sql, params.as_slice())?;
    Ok(())
}

/// Write only the given columns. Returns false when no row has that id.
pub fn update_fields(conn: &Connection, schema: &EntitySchema, id: &str, fields: &[Field]) -> Result<bool> {
    if fields.is_empty() {
        let exists: bool = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", schema.table, schema.primary_key),
            [id],
            |r| r.get(0),
        )?;
        return Ok(exists);
    }

    let assignments: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{} = ?{}", name, i + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        schema.table,
        assignments.join(", "),
        schema.primary_key,
        fields.len() + 1
    );
    let mut params: Vec<&dyn ToSql> = fields.iter().map(|(_, v)| v as &dyn ToSql).collect();
    params.push(&id);
    let changed = conn.execute(&sql, params.as_slice())?;
    Ok(changed > 0)
}

pub fn delete_where(conn: &Connection, schema: &EntitySchema, column: &str, value: &dyn ToSql) -> Result<usize> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", schema.table, column);
    Ok(conn.execute(&sql, [value])?)
}

pub fn count(conn: &Connection, schema: &EntitySchema, tail: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {} {}", schema.table, tail);
    let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
    Ok(n as u64)
}

// -- Value helpers --

/// Current time truncated to what the stored text keeps, so a freshly built
/// record equals the one read back.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn stamp(at: DateTime<Utc>) -> Value {
    Value::Text(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

pub fn opt_text(s: Option<impl Into<String>>) -> Value {
    s.map(|s| Value::Text(s.into())).unwrap_or(Value::Null)
}

/// Trim and reject blank required input before anything is written.
pub fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DbError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim optional input, treating blank as absent.
pub fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
