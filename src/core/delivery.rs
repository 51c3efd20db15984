//! Renders a [`Workbook`] to `.xlsx` bytes. No disk I/O happens here.

use crate::domain::model::{Cell, CellValue, DateRange, Deliverable, Sheet, SheetKind, Workbook};
use crate::utils::error::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{
    ExcelDateTime, Format, Formula, Table, TableColumn, Workbook as XlsxWorkbook, Worksheet,
};

pub const DATE_FORMAT: &str = "dd/mm/yyyy";
pub const DATETIME_FORMAT: &str = "dd/mm/yyyy hh:mm:ss";
pub const MONEY_FORMAT: &str = "#,##0.00";

/// `Relatorio_Consolidado_2025-01-01_a_2025-01-31.xlsx`
pub fn filename(range: &DateRange) -> String {
    format!(
        "Relatorio_Consolidado_{}_a_{}.xlsx",
        range.start().format("%Y-%m-%d"),
        range.end().format("%Y-%m-%d")
    )
}

struct Formats {
    date: Format,
    datetime: Format,
    money: Format,
    header: Format,
    plain: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            date: Format::new().set_num_format(DATE_FORMAT),
            datetime: Format::new().set_num_format(DATETIME_FORMAT),
            money: Format::new().set_num_format(MONEY_FORMAT),
            header: Format::new().set_bold(),
            plain: Format::new(),
        }
    }
}

pub fn deliver(workbook: &Workbook, range: &DateRange) -> Result<Deliverable> {
    let formats = Formats::new();
    let mut xlsx = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        match sheet.kind {
            SheetKind::Table => write_table_sheet(worksheet, sheet, &formats)?,
            SheetKind::Summary => write_summary_sheet(worksheet, sheet, &formats)?,
        }
        worksheet.autofit();
        tracing::debug!("Rendered sheet '{}' ({} rows)", sheet.name, sheet.rows.len());
    }

    let bytes = xlsx.save_to_buffer()?;
    let filename = filename(range);
    tracing::info!("📦 Rendered {} ({} bytes)", filename, bytes.len());
    Ok(Deliverable { filename, bytes })
}

fn write_table_sheet(worksheet: &mut Worksheet, sheet: &Sheet, formats: &Formats) -> Result<()> {
    write_rows(worksheet, sheet, formats, None)?;
    if sheet.headers.is_empty() {
        return Ok(());
    }

    let columns: Vec<TableColumn> = sheet
        .headers
        .iter()
        .map(|h| TableColumn::new().set_header(h))
        .collect();
    let table = Table::new().set_columns(&columns);
    // a table needs at least one data row
    let last_row = sheet.rows.len().max(1) as u32;
    let last_col = (sheet.headers.len() - 1) as u16;
    worksheet.add_table(0, 0, last_row, last_col, &table)?;
    Ok(())
}

fn write_summary_sheet(worksheet: &mut Worksheet, sheet: &Sheet, formats: &Formats) -> Result<()> {
    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &formats.header)?;
    }
    write_rows(worksheet, sheet, formats, Some(&formats.money))?;
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Data rows start below the header row. `number_format` applies to numeric
/// values and formulas; integers keep the default format.
fn write_rows(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    formats: &Formats,
    number_format: Option<&Format>,
) -> Result<()> {
    let numeric = number_format.unwrap_or(&formats.plain);
    for (row_index, cells) in sheet.rows.iter().enumerate() {
        let row = (row_index + 1) as u32;
        for (col_index, cell) in cells.iter().enumerate() {
            let col = col_index as u16;
            match cell {
                Cell::Value(value) => write_value(worksheet, row, col, value, formats, numeric)?,
                Cell::Formula { expression, cached } => {
                    let mut formula = Formula::new(expression.strip_prefix('=').unwrap_or(expression));
                    if let Some(result) = cached.filter(|v| v.is_finite()) {
                        formula = formula.set_result(result.to_string());
                    }
                    worksheet.write_formula_with_format(row, col, formula, numeric)?;
                }
            }
        }
    }
    Ok(())
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    formats: &Formats,
    numeric: &Format,
) -> Result<()> {
    match value {
        CellValue::Null => {}
        CellValue::Int(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Float(f) if f.is_finite() => {
            worksheet.write_number_with_format(row, col, *f, numeric)?;
        }
        CellValue::Float(_) => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Date(d) => match excel_date(*d) {
            Some(date) => {
                worksheet.write_datetime_with_format(row, col, &date, &formats.date)?;
            }
            None => {
                worksheet.write_string(row, col, d.format("%d/%m/%Y").to_string())?;
            }
        },
        CellValue::DateTime(dt) => match excel_datetime(*dt) {
            Some(datetime) => {
                worksheet.write_datetime_with_format(row, col, &datetime, &formats.datetime)?;
            }
            None => {
                worksheet.write_string(row, col, dt.format("%d/%m/%Y %H:%M:%S").to_string())?;
            }
        },
    }
    Ok(())
}

/// Excel serial dates cover 1900..=9999.
fn excel_date(date: NaiveDate) -> Option<ExcelDateTime> {
    if !(1900..=9999).contains(&date.year()) {
        return None;
    }
    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8).ok()
}

fn excel_datetime(dt: NaiveDateTime) -> Option<ExcelDateTime> {
    excel_date(dt.date())?
        .and_hms(dt.hour() as u16, dt.minute() as u8, dt.second() as f64)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, DataType, Reader, Xlsx};
    use std::io::Cursor;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn table(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            kind: SheetKind::Table,
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    fn read(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        Xlsx::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_filename_carries_both_bounds() {
        assert_eq!(
            filename(&range()),
            "Relatorio_Consolidado_2025-01-01_a_2025-01-31.xlsx"
        );
    }

    #[test]
    fn test_sheets_render_in_order_with_headers() {
        let workbook = Workbook {
            sheets: vec![
                table(
                    "Contas a Pagar",
                    &["Conta", "Valor"],
                    vec![vec![
                        Cell::Value(CellValue::text("SALARIO PESSOAL")),
                        Cell::Value(CellValue::Float(1000.0)),
                    ]],
                ),
                table("Vendas Trocadas", &["ID_Caixa"], vec![]),
            ],
        };

        let deliverable = deliver(&workbook, &range()).unwrap();
        let mut xlsx = read(deliverable.bytes);

        assert_eq!(xlsx.sheet_names(), vec!["Contas a Pagar", "Vendas Trocadas"]);
        let payables = xlsx.worksheet_range("Contas a Pagar").unwrap();
        assert_eq!(payables.get_value((0, 0)), Some(&Data::String("Conta".to_string())));
        assert_eq!(payables.get_value((1, 1)).and_then(|v| v.as_f64()), Some(1000.0));

        let empty = xlsx.worksheet_range("Vendas Trocadas").unwrap();
        assert_eq!(empty.get_value((0, 0)), Some(&Data::String("ID_Caixa".to_string())));
    }

    #[test]
    fn test_formula_written_with_cached_result() {
        let mut summary = table(
            "Resumo",
            &["A", "B", "C"],
            vec![vec![
                Cell::Value(CellValue::Float(10.0)),
                Cell::Value(CellValue::Float(4.0)),
                Cell::Formula {
                    expression: "=A2-B2".to_string(),
                    cached: Some(6.0),
                },
            ]],
        );
        summary.kind = SheetKind::Summary;
        let workbook = Workbook {
            sheets: vec![summary],
        };

        let mut xlsx = read(deliver(&workbook, &range()).unwrap().bytes);

        let formulas = xlsx.worksheet_formula("Resumo").unwrap();
        let text = formulas
            .used_cells()
            .map(|(_, _, f)| f.clone())
            .find(|f| !f.is_empty())
            .unwrap();
        assert_eq!(text.trim_start_matches('='), "A2-B2");

        let values = xlsx.worksheet_range("Resumo").unwrap();
        assert_eq!(values.get_value((1, 2)).and_then(|v| v.as_f64()), Some(6.0));
    }

    #[test]
    fn test_dates_and_non_finite_values() {
        let workbook = Workbook {
            sheets: vec![table(
                "Fechamento Caixa",
                &["Data_Abertura", "Valor"],
                vec![vec![
                    Cell::Value(CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())),
                    Cell::Value(CellValue::Float(f64::NAN)),
                ]],
            )],
        };

        let mut xlsx = read(deliver(&workbook, &range()).unwrap().bytes);
        let values = xlsx.worksheet_range("Fechamento Caixa").unwrap();

        let date = values.get_value((1, 0)).and_then(|v| v.as_date());
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert!(matches!(values.get_value((1, 1)), None | Some(Data::Empty)));
    }

    #[test]
    fn test_excel_date_bounds() {
        assert!(excel_date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()).is_none());
        assert!(excel_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).is_some());
    }
}
