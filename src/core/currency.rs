//! Locale currency strings ("R$ 1.234,56") to numbers.
//!
//! Normalization is best-effort: anything that does not parse becomes `None`
//! and the batch carries on.

use crate::domain::model::CellValue;

const CURRENCY_SYMBOL: &str = "R$";

pub fn normalize_currency(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Null => None,
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(f) => Some(*f).filter(|v| v.is_finite()),
        CellValue::Text(s) => parse_currency(s),
        CellValue::Date(_) | CellValue::DateTime(_) => None,
    }
}

/// A comma marks the decimal separator; periods are then thousands separators.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let mut s = raw.trim().replace(CURRENCY_SYMBOL, "");
    s = s.trim().to_string();

    if s.contains(',') {
        s = s.replace('.', "").replace(',', ".");
    }

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
