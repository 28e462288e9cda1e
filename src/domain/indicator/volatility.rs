//! Rolling volatility of simple daily returns.
//!
//! Population standard deviation over the `lookback` returns preceding an
//! index: r[j] = (P[j+1] - P[j]) / P[j] for j in index-lookback..index.
//! VOL[i] = sqrt(sum((r[j] - mean)^2) / lookback), rounded to ratio precision.
//! Indices below `lookback` are neutral (1). A return off a zero price
//! counts as 0.

use crate::domain::fixed_point::{div_ratio, round_ratio};
use rust_decimal::{Decimal, MathematicalOps};

pub const DEFAULT_LOOKBACK: usize = 20;

pub fn calculate_volatility(prices: &[Decimal], index: usize, lookback: usize) -> Decimal {
    if index < lookback || lookback == 0 || index >= prices.len() {
        return Decimal::ONE;
    }

    let n = Decimal::from(lookback);
    let returns: Vec<Decimal> = (index - lookback..index)
        .map(|j| {
            (prices[j + 1] - prices[j])
                .checked_div(prices[j])
                .map(round_ratio)
                .unwrap_or(Decimal::ZERO)
        })
        .collect();

    let mean = div_ratio(returns.iter().sum(), n);
    let squared: Decimal = returns
        .iter()
        .map(|r| {
            let diff = *r - mean;
            diff * diff
        })
        .sum();
    let variance = div_ratio(squared, n);

    round_ratio(variance.sqrt().unwrap_or(Decimal::ZERO))
}

/// Volatility evaluated at every index of the series.
pub fn calculate_volatility_series(prices: &[Decimal], lookback: usize) -> Vec<Decimal> {
    (0..prices.len())
        .map(|i| calculate_volatility(prices, i, lookback))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn volatility_neutral_before_lookback() {
        let prices: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        for i in 0..20 {
            assert_eq!(calculate_volatility(&prices, i, 20), Decimal::ONE);
        }
        assert_ne!(calculate_volatility(&prices, 20, 20), Decimal::ONE);
    }

    #[test]
    fn volatility_constant_prices_is_zero() {
        let prices = vec![Decimal::from(100); 25];
        assert_eq!(calculate_volatility(&prices, 24, 20), Decimal::ZERO);
    }

    #[test]
    fn volatility_known_values() {
        // returns: +0.1, -0.1 => mean 0, variance 0.01, stddev 0.1
        let prices = vec![d("100"), d("110"), d("99")];
        assert_eq!(calculate_volatility(&prices, 2, 2), d("0.1"));
    }

    #[test]
    fn volatility_uses_returns_before_index() {
        // returns 0.1, 0.0 => mean 0.05, variance 0.0025, stddev 0.05;
        // the jump after index 2 is ignored
        let prices = vec![d("100"), d("110"), d("110"), d("200")];
        assert_eq!(calculate_volatility(&prices, 2, 2), d("0.05"));
    }

    #[test]
    fn volatility_series_matches_pointwise() {
        let prices: Vec<Decimal> = [100, 102, 101, 105, 103, 104]
            .iter()
            .map(|&p| Decimal::from(p))
            .collect();
        let series = calculate_volatility_series(&prices, 3);
        assert_eq!(series.len(), prices.len());
        for (i, v) in series.iter().enumerate() {
            assert_eq!(*v, calculate_volatility(&prices, i, 3));
            assert!(*v >= Decimal::ZERO);
        }
    }

    #[test]
    fn volatility_zero_price_does_not_panic() {
        let prices = vec![d("10"), d("0"), d("12")];
        // returns: -1, 0 => mean -0.5, variance 0.25
        assert_eq!(calculate_volatility(&prices, 2, 2), d("0.5"));
    }
}
