//! Per-company summary: aggregates computed in-process, optionally mirrored
//! as SUMIFS formulas over the generated sheets.

use crate::config::lookups::Company;
use crate::core::enrich::{AMOUNT_COLUMN, BUCKET_COLUMN};
use crate::core::formula::{self, Criterion, SheetLayout};
use crate::core::queries::QueryId;
use crate::domain::model::{Cell, CellValue, DateRange, Sheet, SheetKind, Workbook};
use chrono::NaiveDate;

pub const SUMMARY_SHEET: &str = "Resumo";

pub const COMPANY_ID: &str = "ID_Empresa";
pub const COMPANY_NAME: &str = "Empresa";
pub const START_DATE: &str = "Data Inicio";
pub const CASH_SALES: &str = "Vendas Dinheiro";
pub const MANAGER_COUNT: &str = "Apurado Gerente";
pub const TREASURY_TRANSFERS: &str = "Transf. Tesouraria";
pub const OUTFLOWS: &str = "Saídas";
pub const CASH_DIFFERENCE: &str = "Diferença Caixa";
pub const TREASURY_BALANCE: &str = "Saldo Tesouraria";

/// A conditional sum over one generated sheet, keyed by company and date.
#[derive(Debug, Clone)]
pub struct Metric {
    pub header: &'static str,
    pub source: QueryId,
    pub value_column: &'static str,
    pub company_column: &'static str,
    pub date_column: &'static str,
    pub filter: Option<(&'static str, String)>,
}

/// `header = minuend - subtrahend`, both summary headers.
#[derive(Debug, Clone, Copy)]
pub struct Difference {
    pub header: &'static str,
    pub minuend: &'static str,
    pub subtrahend: &'static str,
}

pub fn metrics(outflow_label: &str) -> Vec<Metric> {
    let closing = |header, value_column| Metric {
        header,
        source: QueryId::CashClosing,
        value_column,
        company_column: "ID_Empresa",
        date_column: "Data_Abertura",
        filter: None,
    };
    vec![
        closing(CASH_SALES, "Vendas_dinheiro"),
        closing(MANAGER_COUNT, "Apur_Ger_total"),
        closing(TREASURY_TRANSFERS, "Transf_Tesour"),
        Metric {
            header: OUTFLOWS,
            source: QueryId::Payables,
            value_column: AMOUNT_COLUMN,
            company_column: "ID_Empresa",
            date_column: "emissao",
            filter: Some((BUCKET_COLUMN, outflow_label.to_string())),
        },
    ]
}

pub const DIFFERENCES: [Difference; 2] = [
    Difference {
        header: CASH_DIFFERENCE,
        minuend: MANAGER_COUNT,
        subtrahend: CASH_SALES,
    },
    Difference {
        header: TREASURY_BALANCE,
        minuend: TREASURY_TRANSFERS,
        subtrahend: OUTFLOWS,
    },
];

pub fn summary_headers(metrics: &[Metric]) -> Vec<String> {
    let mut headers = vec![
        COMPANY_ID.to_string(),
        COMPANY_NAME.to_string(),
        START_DATE.to_string(),
    ];
    headers.extend(metrics.iter().map(|m| m.header.to_string()));
    headers.extend(DIFFERENCES.iter().map(|d| d.header.to_string()));
    headers
}

/// Group-and-sum over a rendered sheet, mirroring what the SUMIFS computes:
/// rows of `company` dated on or after `from`, passing the optional filter.
pub fn aggregate(sheet: &Sheet, metric: &Metric, company: i64, from: NaiveDate) -> f64 {
    let (Some(value_idx), Some(company_idx), Some(date_idx)) = (
        sheet.column_index(metric.value_column),
        sheet.column_index(metric.company_column),
        sheet.column_index(metric.date_column),
    ) else {
        return 0.0;
    };
    let filter_idx = match &metric.filter {
        Some((header, _)) => match sheet.column_index(header) {
            Some(idx) => Some(idx),
            None => return 0.0,
        },
        None => None,
    };

    // SUMIFS criteria ignore case
    let expected = metric.filter.as_ref().map(|(_, label)| label.to_lowercase());

    let total: f64 = sheet
        .rows
        .iter()
        .filter(|row| value_of(&row[company_idx]).and_then(|v| v.as_i64()) == Some(company))
        .filter(|row| {
            value_of(&row[date_idx])
                .and_then(|v| v.as_date())
                .is_some_and(|d| d >= from)
        })
        .filter(|row| match (&expected, filter_idx) {
            (Some(expected), Some(idx)) => value_of(&row[idx])
                .and_then(|v| v.as_str())
                .is_some_and(|label| label.to_lowercase() == *expected),
            _ => true,
        })
        .filter_map(|row| row[value_idx].number())
        .sum();
    // an empty sum is -0.0
    total + 0.0
}

fn value_of(cell: &Cell) -> Option<&CellValue> {
    match cell {
        Cell::Value(v) => Some(v),
        Cell::Formula { .. } => None,
    }
}

/// Builds the summary from sheets already present in `workbook`.
pub fn build_summary_sheet(
    workbook: &Workbook,
    companies: &[Company],
    range: &DateRange,
    outflow_label: &str,
    with_formulas: bool,
) -> Sheet {
    let metrics = metrics(outflow_label);
    let headers = summary_headers(&metrics);
    let own = SheetLayout::new(SUMMARY_SHEET, &headers);
    let mut rows = Vec::with_capacity(companies.len());

    for (row_index, company) in companies.iter().enumerate() {
        let mut row = vec![
            Cell::Value(CellValue::Int(company.id)),
            Cell::Value(CellValue::text(company.name.clone())),
            Cell::Value(CellValue::Date(range.start())),
        ];
        let mut computed: Vec<(&str, f64)> = Vec::new();

        for metric in &metrics {
            let source = workbook.sheet(metric.source.sheet_name());
            let value = source
                .map(|sheet| aggregate(sheet, metric, company.id, range.start()))
                .unwrap_or(0.0);
            computed.push((metric.header, value));

            if !with_formulas {
                row.push(Cell::Value(CellValue::Float(value)));
                continue;
            }
            let expression = source.and_then(|sheet| {
                metric_formula(&SheetLayout::of(sheet), metric, &own, row_index)
            });
            match expression {
                Some(expression) => row.push(Cell::Formula {
                    expression,
                    cached: Some(value),
                }),
                None => {
                    tracing::warn!(
                        "⚠️ {} for company {}: referenced columns missing on '{}', writing value",
                        metric.header,
                        company.id,
                        metric.source.sheet_name()
                    );
                    row.push(Cell::Value(CellValue::Float(value)));
                }
            }
        }

        for diff in DIFFERENCES {
            let get = |header: &str| {
                computed
                    .iter()
                    .find(|(h, _)| *h == header)
                    .map(|(_, v)| *v)
                    .unwrap_or(0.0)
            };
            let value = get(diff.minuend) - get(diff.subtrahend);
            let expression = if with_formulas {
                formula::difference(&own, diff.minuend, &[diff.subtrahend], row_index)
            } else {
                None
            };
            row.push(match expression {
                Some(expression) => Cell::Formula {
                    expression,
                    cached: Some(value),
                },
                None => Cell::Value(CellValue::Float(value)),
            });
        }

        rows.push(row);
    }

    Sheet {
        name: SUMMARY_SHEET.to_string(),
        kind: SheetKind::Summary,
        headers,
        rows,
    }
}

fn metric_formula(
    source: &SheetLayout<'_>,
    metric: &Metric,
    own: &SheetLayout<'_>,
    row_index: usize,
) -> Option<String> {
    let company_cell = own.anchored_cell(COMPANY_ID, row_index)?;
    let start_cell = own.anchored_cell(START_DATE, row_index)?;
    let mut criteria = vec![
        Criterion::new(metric.company_column, company_cell),
        Criterion::new(metric.date_column, format!("\">=\"&{}", start_cell)),
    ];
    if let Some((header, expected)) = &metric.filter {
        criteria.push(Criterion::new(*header, formula::string_literal(expected)));
    }
    formula::sumifs(source, metric.value_column, &criteria)
}
