//! Daily market returns derived from a benchmark series.

use super::fixed_point::div_ratio;
use super::price_bar::PriceBar;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Simple daily returns keyed by the later bar's date.
///
/// Returns are fractions, matching the unit of portfolio return
/// contributions. A zero previous price skips that date.
pub fn market_returns(bars: &[PriceBar]) -> BTreeMap<NaiveDate, Decimal> {
    bars.windows(2)
        .filter(|w| !w[0].adjusted_close.is_zero())
        .map(|w| {
            let prev = w[0].adjusted_close;
            (w[1].date, div_ratio(w[1].adjusted_close - prev, prev))
        })
        .collect()
}
