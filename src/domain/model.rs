use crate::utils::error::Result;
use crate::utils::validation::validate_date_order;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Scalar as handed over by the store driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for sums; text is not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    /// Company ids arrive as integers, floats or text depending on the view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One materialized result set. Every row holds exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        Self {
            columns: unique,
            rows: Vec::new(),
        }
    }

    /// Builds a result from driver output where names may repeat: the first
    /// position is kept and the last value wins.
    pub fn from_driver(names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut result = Self::new(names.clone());
        let positions: Vec<usize> = names
            .iter()
            .map(|name| result.column_index(name).unwrap_or_default())
            .collect();
        for raw in rows {
            let mut row = vec![CellValue::Null; result.columns.len()];
            for (value, &position) in raw.into_iter().zip(positions.iter()) {
                row[position] = value;
            }
            result.rows.push(row);
        }
        result
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<CellValue>] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows shorter than the header are padded with nulls, longer ones truncated.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Returns the index of `name`, appending it (null-filled) when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Null);
        }
        self.columns.len() - 1
    }
}

/// Validated inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        validate_date_order(start, end)?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `dd/mm/yyyy a dd/mm/yyyy`, as shown to the user.
    pub fn label(&self) -> String {
        format!(
            "{} a {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

/// The four result sets of one report run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData {
    pub transfers: QueryResult,
    pub payables: QueryResult,
    pub cash_closing: QueryResult,
    pub discrepancies: QueryResult,
}

impl ReportData {
    pub fn total_rows(&self) -> usize {
        self.transfers.len() + self.payables.len() + self.cash_closing.len() + self.discrepancies.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub unmapped_accounts: usize,
    pub unparsed_amounts: usize,
    pub truncated_timestamps: usize,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub data: ReportData,
    pub stats: EnrichmentStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(CellValue),
    /// Formula text (with leading `=`) plus the value computed in-process.
    Formula {
        expression: String,
        cached: Option<f64>,
    },
}

impl Cell {
    pub fn formula(&self) -> Option<&str> {
        match self {
            Cell::Formula { expression, .. } => Some(expression),
            Cell::Value(_) => None,
        }
    }

    /// Numeric content, whether plain or cached behind a formula.
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => v.as_f64(),
            Cell::Formula { cached, .. } => *cached,
        }
    }
}

impl From<CellValue> for Cell {
    fn from(value: CellValue) -> Self {
        Cell::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Registered as a filterable table region.
    Table,
    /// Authored cell by cell, amounts money formatted.
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub kind: SheetKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn from_result(name: &str, result: &QueryResult) -> Self {
        Self {
            name: name.to_string(),
            kind: SheetKind::Table,
            headers: result.columns().to_vec(),
            rows: result
                .rows()
                .iter()
                .map(|row| row.iter().cloned().map(Cell::Value).collect())
                .collect(),
        }
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        let idx = self.column_index(header)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Deliverable {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Idle,
    Connecting,
    Querying,
    Enriching,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportStage::Idle => "idle",
            ReportStage::Connecting => "connecting",
            ReportStage::Querying => "querying",
            ReportStage::Enriching => "enriching",
            ReportStage::Rendering => "rendering",
            ReportStage::Done => "done",
            ReportStage::Failed => "failed",
        };
        f.write_str(name)
    }
}
