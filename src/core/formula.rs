//! Spreadsheet formula text, addressed by header name.
//!
//! Every reference is resolved against the headers of the sheet it points at,
//! so a column moving inside a generated sheet moves its letter with it. A
//! header that does not exist yields `None` instead of a wrong letter.

use crate::domain::model::Sheet;
use rust_xlsxwriter::utility::column_number_to_name;

/// Excel row number of the `index`-th data row (header is row 1).
pub fn data_row_number(index: usize) -> usize {
    index + 2
}

pub fn column_letter(index: usize) -> String {
    column_number_to_name(index as u16)
}

/// `'Contas a Pagar'`; embedded quotes are doubled.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Quoted string literal for use inside a formula.
pub fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[derive(Debug, Clone, Copy)]
pub struct SheetLayout<'a> {
    name: &'a str,
    headers: &'a [String],
}

impl<'a> SheetLayout<'a> {
    pub fn new(name: &'a str, headers: &'a [String]) -> Self {
        Self { name, headers }
    }

    pub fn of(sheet: &'a Sheet) -> Self {
        Self::new(&sheet.name, &sheet.headers)
    }

    pub fn letter(&self, header: &str) -> Option<String> {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(column_letter)
    }

    /// Whole-column reference from another sheet: `'Fechamento Caixa'!$H:$H`.
    pub fn column_range(&self, header: &str) -> Option<String> {
        let letter = self.letter(header)?;
        Some(format!(
            "{}!${}:${}",
            quote_sheet_name(self.name),
            letter,
            letter
        ))
    }

    /// Same-sheet cell reference for a data row: `H5`.
    pub fn cell(&self, header: &str, row_index: usize) -> Option<String> {
        let letter = self.letter(header)?;
        Some(format!("{}{}", letter, data_row_number(row_index)))
    }

    /// Same-sheet cell with the column anchored: `$A5`.
    pub fn anchored_cell(&self, header: &str, row_index: usize) -> Option<String> {
        let letter = self.letter(header)?;
        Some(format!("${}{}", letter, data_row_number(row_index)))
    }
}

/// One `criteria_range, criterion` pair of a SUMIFS.
#[derive(Debug, Clone)]
pub struct Criterion {
    pub header: String,
    pub expression: String,
}

impl Criterion {
    pub fn new(header: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            expression: expression.into(),
        }
    }
}

pub fn sumifs(source: &SheetLayout<'_>, sum_header: &str, criteria: &[Criterion]) -> Option<String> {
    let mut args = vec![source.column_range(sum_header)?];
    for criterion in criteria {
        args.push(source.column_range(&criterion.header)?);
        args.push(criterion.expression.clone());
    }
    Some(format!("=SUMIFS({})", args.join(",")))
}

/// `=left-right` over same-sheet cells.
pub fn difference(
    layout: &SheetLayout<'_>,
    minuend: &str,
    subtrahends: &[&str],
    row_index: usize,
) -> Option<String> {
    let mut expr = format!("={}", layout.cell(minuend, row_index)?);
    for header in subtrahends {
        expr.push('-');
        expr.push_str(&layout.cell(header, row_index)?);
    }
    Some(expr)
}
