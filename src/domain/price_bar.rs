//! Daily price bar representation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One trading day of a symbol's history: adjusted close and traded volume.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub adjusted_close: Decimal,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, adjusted_close: Decimal, volume: u64) -> Self {
        Self {
            date,
            adjusted_close,
            volume,
        }
    }
}

/// Adjusted closes of a series, in order.
pub fn closes(bars: &[PriceBar]) -> Vec<Decimal> {
    bars.iter().map(|b| b.adjusted_close).collect()
}
