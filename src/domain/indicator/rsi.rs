//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Every division rounds to ratio precision. Indices before `period` hold 0,
//! and a series with no more than `period` prices is all zeros.

use crate::domain::fixed_point::div_ratio;
use rust_decimal::Decimal;

pub fn calculate_rsi(prices: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut values = vec![Decimal::ZERO; prices.len()];
    if period == 0 || prices.len() <= period {
        return values;
    }

    let n = Decimal::from(period);
    let n_minus_1 = Decimal::from(period - 1);

    let mut gain_sum = Decimal::ZERO;
    let mut loss_sum = Decimal::ZERO;
    for i in 1..=period {
        let change = prices[i] - prices[i - 1];
        if change > Decimal::ZERO {
            gain_sum += change;
        } else {
            loss_sum -= change;
        }
    }

    let mut avg_gain = div_ratio(gain_sum, n);
    let mut avg_loss = div_ratio(loss_sum, n);
    values[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..prices.len() {
        let change = prices[i] - prices[i - 1];
        let gain = change.max(Decimal::ZERO);
        let loss = (-change).max(Decimal::ZERO);
        avg_gain = div_ratio(avg_gain * n_minus_1 + gain, n);
        avg_loss = div_ratio(avg_loss * n_minus_1 + loss, n);
        values[i] = rsi_value(avg_gain, avg_loss);
    }

    values
}

fn rsi_value(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return Decimal::ONE_HUNDRED;
    }
    let rs = div_ratio(avg_gain, avg_loss);
    Decimal::ONE_HUNDRED - div_ratio(Decimal::ONE_HUNDRED, Decimal::ONE + rs)
}
