//! Assembles the fixed sheet set from enriched results.

use crate::config::lookups::Lookups;
use crate::core::enrich::{ACCOUNT_COLUMN, BUCKET_COLUMN};
use crate::core::formula::{self, SheetLayout};
use crate::core::queries::QueryId;
use crate::core::summary::{self, SUMMARY_SHEET};
use crate::domain::model::{
    Cell, CellValue, DateRange, QueryResult, Sheet, SheetKind, TransformResult, Workbook,
};

pub const LOOKUP_SHEET: &str = "De Para";
pub const CHECK_COLUMN: &str = "Conferencia";

const CHECK_MINUEND: &str = "Apur_Ger_total";
const CHECK_SUBTRAHENDS: [&str; 2] = ["Transf_Tesour", "Ap_Ger_Nao_Trans"];

/// Sheet names in workbook order.
pub fn sheet_order() -> [&'static str; 6] {
    [
        QueryId::Transfers.sheet_name(),
        QueryId::Payables.sheet_name(),
        QueryId::CashClosing.sheet_name(),
        QueryId::Discrepancies.sheet_name(),
        LOOKUP_SHEET,
        SUMMARY_SHEET,
    ]
}

#[derive(Debug, Clone)]
pub struct SynthesisOptions<'a> {
    pub range: DateRange,
    pub formulas: bool,
    pub outflow_label: &'a str,
}

pub fn synthesize(
    result: &TransformResult,
    lookups: &Lookups,
    options: &SynthesisOptions<'_>,
) -> Workbook {
    let data = &result.data;
    let mut workbook = Workbook {
        sheets: vec![
            Sheet::from_result(QueryId::Transfers.sheet_name(), &data.transfers),
            Sheet::from_result(QueryId::Payables.sheet_name(), &data.payables),
            cash_closing_sheet(&data.cash_closing),
            Sheet::from_result(QueryId::Discrepancies.sheet_name(), &data.discrepancies),
            lookup_sheet(lookups),
        ],
    };

    // the summary references the sheets above, so it goes in last
    let summary = summary::build_summary_sheet(
        &workbook,
        &lookups.companies,
        &options.range,
        options.outflow_label,
        options.formulas,
    );
    workbook.sheets.push(summary);

    tracing::debug!("Workbook sheets: {:?}", workbook.sheet_names());
    workbook
}

/// Cash-closing detail with the `Conferencia` check column appended.
pub fn cash_closing_sheet(result: &QueryResult) -> Sheet {
    let mut sheet = Sheet::from_result(QueryId::CashClosing.sheet_name(), result);
    let existing = sheet.column_index(CHECK_COLUMN);
    if existing.is_none() {
        sheet.headers.push(CHECK_COLUMN.to_string());
    }
    let headers = sheet.headers.clone();
    let layout = SheetLayout::new(&sheet.name, &headers);

    let expression_for =
        |row_index| formula::difference(&layout, CHECK_MINUEND, &CHECK_SUBTRAHENDS, row_index);
    let mut warned = false;

    let mut rows = std::mem::take(&mut sheet.rows);
    for (row_index, row) in rows.iter_mut().enumerate() {
        let number = |header: &str| {
            headers
                .iter()
                .position(|h| h == header)
                .and_then(|idx| row.get(idx))
                .and_then(Cell::number)
                .unwrap_or(0.0)
        };
        let value = CHECK_SUBTRAHENDS
            .iter()
            .fold(number(CHECK_MINUEND), |acc, h| acc - number(h));

        let cell = match expression_for(row_index) {
            Some(expression) => Cell::Formula {
                expression,
                cached: Some(value),
            },
            None => {
                if !warned {
                    tracing::warn!(
                        "⚠️ {}: columns for {} missing, writing values",
                        sheet.name,
                        CHECK_COLUMN
                    );
                    warned = true;
                }
                Cell::Value(CellValue::Float(value))
            }
        };
        match existing {
            Some(idx) => row[idx] = cell,
            None => row.push(cell),
        }
    }
    sheet.rows = rows;
    sheet
}

pub fn lookup_sheet(lookups: &Lookups) -> Sheet {
    let table = lookups.category_table();
    Sheet {
        name: LOOKUP_SHEET.to_string(),
        kind: SheetKind::Table,
        headers: vec![ACCOUNT_COLUMN.to_string(), BUCKET_COLUMN.to_string()],
        rows: table
            .iter()
            .map(|(account, label)| {
                vec![
                    Cell::Value(CellValue::text(account)),
                    Cell::Value(CellValue::text(label)),
                ]
            })
            .collect(),
    }
}
