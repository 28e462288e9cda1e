//! Technical indicator implementations.
//!
//! Every indicator is a pure function of a price slice and returns one value
//! per input price:
//! - `ewa`: exponentially weighted average
//! - `rsi`: Wilder-smoothed relative strength index
//! - `volatility`: rolling population stddev of simple returns
//!
//! `IndicatorSet` bundles the arrays the signal generator reads for one symbol.

pub mod ewa;
pub mod rsi;
pub mod volatility;

use crate::domain::price_bar::{closes, PriceBar};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ewa(usize),
    Rsi(usize),
    Volatility(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ewa(window) => write!(f, "EWA({})", window),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Volatility(lookback) => write!(f, "VOLATILITY({})", lookback),
        }
    }
}

/// Windows used to build an [`IndicatorSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub volatility_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            short_window: 50,
            long_window: 200,
            rsi_period: 14,
            volatility_lookback: volatility::DEFAULT_LOOKBACK,
        }
    }
}

impl IndicatorParams {
    pub fn indicator_types(&self) -> [IndicatorType; 4] {
        [
            IndicatorType::Ewa(self.short_window),
            IndicatorType::Ewa(self.long_window),
            IndicatorType::Rsi(self.rsi_period),
            IndicatorType::Volatility(self.volatility_lookback),
        ]
    }
}

/// Indicator arrays for one symbol, all the same length as its price series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub short_ewa: Vec<Decimal>,
    pub long_ewa: Vec<Decimal>,
    pub rsi: Vec<Decimal>,
    pub volatility: Vec<Decimal>,
}

impl IndicatorSet {
    pub fn compute(bars: &[PriceBar], params: &IndicatorParams) -> Self {
        let prices = closes(bars);
        IndicatorSet {
            short_ewa: ewa::calculate_ewa(&prices, params.short_window),
            long_ewa: ewa::calculate_ewa(&prices, params.long_window),
            rsi: rsi::calculate_rsi(&prices, params.rsi_period),
            volatility: volatility::calculate_volatility_series(
                &prices,
                params.volatility_lookback,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.short_ewa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_ewa.is_empty()
    }
}
