//! Crossover signal generation.
//!
//! A BUY fires on the bar where the short/long EWA spread crosses above the
//! volatility-scaled threshold while RSI is oversold; a SELL fires when the
//! spread crosses below the negated threshold while RSI is overbought. Both
//! also require the short average to sit above the long one.

use crate::domain::fixed_point::round_ratio;
use crate::domain::indicator::IndicatorSet;
use crate::domain::price_bar::PriceBar;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub date: NaiveDate,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    pub base_threshold: Decimal,
    pub threshold_floor: Decimal,
    pub threshold_ceiling: Decimal,
    pub rsi_overbought: Decimal,
    pub rsi_oversold: Decimal,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            base_threshold: Decimal::new(5, 2),
            threshold_floor: Decimal::new(1, 2),
            threshold_ceiling: Decimal::new(5, 2),
            rsi_overbought: Decimal::from(70),
            rsi_oversold: Decimal::from(30),
        }
    }
}

impl SignalParams {
    /// Base threshold scaled by volatility, rounded to ratio precision, then
    /// clamped to [floor, ceiling].
    pub fn dynamic_threshold(&self, volatility: Decimal) -> Decimal {
        round_ratio(self.base_threshold * volatility)
            .max(self.threshold_floor)
            .min(self.threshold_ceiling)
    }
}

/// Signals for one symbol.
///
/// Nothing is evaluated until iterated, and every call to [`Signals::iter`]
/// starts again from the first bar.
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    bars: &'a [PriceBar],
    indicators: &'a IndicatorSet,
    params: SignalParams,
}

pub fn generate_signals<'a>(
    bars: &'a [PriceBar],
    indicators: &'a IndicatorSet,
    params: &SignalParams,
) -> Signals<'a> {
    Signals {
        bars,
        indicators,
        params: *params,
    }
}

impl<'a> Signals<'a> {
    pub fn iter(&self) -> SignalIter<'a> {
        // Guard against arrays shorter than the bars; evaluation stops at the
        // shortest one.
        let len = self
            .bars
            .len()
            .min(self.indicators.short_ewa.len())
            .min(self.indicators.long_ewa.len())
            .min(self.indicators.rsi.len())
            .min(self.indicators.volatility.len());
        SignalIter {
            bars: self.bars,
            indicators: self.indicators,
            params: self.params,
            index: 1,
            len,
        }
    }

    pub fn to_vec(&self) -> Vec<Signal> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for Signals<'a> {
    type Item = Signal;
    type IntoIter = SignalIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Signals<'a> {
    type Item = Signal;
    type IntoIter = SignalIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SignalIter<'a> {
    bars: &'a [PriceBar],
    indicators: &'a IndicatorSet,
    params: SignalParams,
    index: usize,
    len: usize,
}

impl SignalIter<'_> {
    fn evaluate(&self, i: usize) -> Option<SignalKind> {
        let ind = self.indicators;
        let diff = ind.short_ewa[i] - ind.long_ewa[i];
        let prev_diff = ind.short_ewa[i - 1] - ind.long_ewa[i - 1];
        let threshold = self.params.dynamic_threshold(ind.volatility[i]);
        let rsi = ind.rsi[i];
        let uptrend = ind.short_ewa[i] > ind.long_ewa[i];

        if diff > threshold && prev_diff <= threshold && rsi < self.params.rsi_oversold && uptrend
        {
            Some(SignalKind::Buy)
        } else if diff < -threshold
            && prev_diff >= -threshold
            && rsi > self.params.rsi_overbought
            && uptrend
        {
            Some(SignalKind::Sell)
        } else {
            None
        }
    }
}

impl Iterator for SignalIter<'_> {
    type Item = Signal;

    fn next(&mut self) -> Option<Signal> {
        while self.index < self.len {
            let i = self.index;
            self.index += 1;
            if let Some(kind) = self.evaluate(i) {
                return Some(Signal {
                    date: self.bars[i].date,
                    kind,
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.len.saturating_sub(self.index)))
    }
}
