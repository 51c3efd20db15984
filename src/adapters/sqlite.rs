use crate::domain::model::{CellValue, QueryResult};
use crate::domain::ports::{Connector, QueryParams, QuerySession};
use crate::utils::error::{ReportError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Opens the report store read-only.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: String,
}

impl SqliteConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn describe(&self) -> String {
        format!("sqlite database {}", self.path)
    }

    fn connect(&self) -> Result<SqliteSession> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| ReportError::connection(format!("{}: {}", self.path, e)))?;
        Ok(SqliteSession { conn: Some(conn) })
    }
}

/// Closes the connection when dropped.
pub struct SqliteSession {
    conn: Option<Connection>,
}

impl SqliteSession {
    fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| ReportError::connection("session already closed"))
    }
}

impl QuerySession for SqliteSession {
    fn query(&mut self, sql: &str, params: &QueryParams) -> Result<QueryResult> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;

        let start = params.range.start().format("%Y-%m-%d").to_string();
        let end = params.range.end().format("%Y-%m-%d").to_string();
        if let Some(idx) = stmt.parameter_index(":start")? {
            stmt.raw_bind_parameter(idx, &start)?;
        }
        if let Some(idx) = stmt.parameter_index(":end")? {
            stmt.raw_bind_parameter(idx, &end)?;
        }
        if let Some(idx) = stmt.parameter_index(":user")? {
            stmt.raw_bind_parameter(idx, params.access_user_id)?;
        }

        let columns: Vec<(String, bool)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), is_timestamp_type(c.decl_type())))
            .collect();

        let mut raw_rows = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, (_, timestamp)) in columns.iter().enumerate() {
                values.push(to_cell(row.get_ref(idx)?, *timestamp));
            }
            raw_rows.push(values);
        }

        let names = columns.into_iter().map(|(name, _)| name).collect();
        Ok(QueryResult::from_driver(names, raw_rows))
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => tracing::info!("🔌 Connection closed"),
                Err((_, e)) => tracing::warn!("Connection closed with error: {}", e),
            }
        }
    }
}

fn is_timestamp_type(decl_type: Option<&str>) -> bool {
    decl_type
        .map(|t| {
            let t = t.to_ascii_uppercase();
            t.contains("DATE") || t.contains("TIME")
        })
        .unwrap_or(false)
}

fn to_cell(value: ValueRef<'_>, timestamp: bool) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if timestamp {
                parse_timestamp(&text)
            } else {
                CellValue::Text(text.into_owned())
            }
        }
        ValueRef::Blob(bytes) => {
            tracing::debug!("Skipping {} byte blob value", bytes.len());
            CellValue::Null
        }
    }
}

/// Unparseable timestamps degrade to null.
pub fn parse_timestamp(raw: &str) -> CellValue {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return CellValue::DateTime(dt);
        }
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => CellValue::Date(d),
        Err(_) => CellValue::Null,
    }
}
