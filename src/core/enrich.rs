use crate::config::lookups::{LookupTable, Lookups};
use crate::core::currency::normalize_currency;
use crate::domain::model::{CellValue, EnrichmentStats, QueryResult, ReportData, TransformResult};

pub const ACCOUNT_COLUMN: &str = "Conta";
pub const AMOUNT_COLUMN: &str = "Valor";
pub const BUCKET_COLUMN: &str = "De Para";

/// Trims the account, appends its bucket label and parses the amount in place.
/// Row count and order are preserved.
pub fn enrich_payables(result: &mut QueryResult, categories: &LookupTable) -> EnrichmentStats {
    let mut stats = EnrichmentStats::default();
    let account_idx = result.column_index(ACCOUNT_COLUMN);
    let amount_idx = result.column_index(AMOUNT_COLUMN);
    let bucket_idx = result.ensure_column(BUCKET_COLUMN);

    for row in result.rows_mut() {
        let label = match account_idx {
            Some(idx) => match &mut row[idx] {
                CellValue::Text(account) => {
                    if account.trim().len() != account.len() {
                        *account = account.trim().to_string();
                    }
                    categories.resolve(account).to_string()
                }
                CellValue::Null => String::new(),
                other => categories.resolve(&other.to_string()).to_string(),
            },
            None => String::new(),
        };
        if label.is_empty() {
            stats.unmapped_accounts += 1;
        }
        row[bucket_idx] = CellValue::Text(label);

        if let Some(idx) = amount_idx {
            let original = &row[idx];
            let parsed = normalize_currency(original);
            if parsed.is_none() && !original.is_null() {
                stats.unparsed_amounts += 1;
            }
            row[idx] = parsed.map(CellValue::Float).unwrap_or(CellValue::Null);
        }
    }

    stats
}

/// Drops the time of day from every timestamp value. Returns how many changed.
pub fn truncate_timestamps(result: &mut QueryResult) -> usize {
    let mut changed = 0;
    for row in result.rows_mut() {
        for value in row.iter_mut() {
            if let CellValue::DateTime(dt) = value {
                *value = CellValue::Date(dt.date());
                changed += 1;
            }
        }
    }
    changed
}

pub fn enrich_report(mut data: ReportData, lookups: &Lookups) -> TransformResult {
    let categories = lookups.category_table();
    let mut stats = enrich_payables(&mut data.payables, &categories);

    for result in [
        &mut data.transfers,
        &mut data.payables,
        &mut data.cash_closing,
        &mut data.discrepancies,
    ] {
        stats.truncated_timestamps += truncate_timestamps(result);
    }

    if stats.unparsed_amounts > 0 {
        tracing::warn!(
            "⚠️ {} payables amounts could not be parsed and were left empty",
            stats.unparsed_amounts
        );
    }
    if stats.unmapped_accounts > 0 {
        tracing::debug!(
            "{} payables accounts have no bucket label",
            stats.unmapped_accounts
        );
    }

    TransformResult { data, stats }
}
