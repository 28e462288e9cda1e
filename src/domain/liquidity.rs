//! Liquidity filter applied before any simulation work.
//!
//! A symbol is retained iff its mean daily volume over the whole series is
//! strictly greater than the threshold. Empty series are always excluded.

use crate::domain::price_bar::PriceBar;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const DEFAULT_MIN_VOLUME: u64 = 100_000;

/// Arithmetic mean of `volume`, or `None` for an empty series.
pub fn average_volume(bars: &[PriceBar]) -> Option<Decimal> {
    if bars.is_empty() {
        return None;
    }
    let total: Decimal = bars.iter().map(|b| Decimal::from(b.volume)).sum();
    Some(total / Decimal::from(bars.len()))
}

pub fn is_liquid(bars: &[PriceBar], min_volume: u64) -> bool {
    average_volume(bars).is_some_and(|avg| avg > Decimal::from(min_volume))
}

/// Symbols passing the filter, in ascending order.
pub fn filter_liquid_symbols(
    series: &BTreeMap<String, Vec<PriceBar>>,
    min_volume: u64,
) -> Vec<String> {
    series
        .iter()
        .filter(|(_, bars)| is_liquid(bars, min_volume))
        .map(|(symbol, _)| symbol.clone())
        .collect()
}
