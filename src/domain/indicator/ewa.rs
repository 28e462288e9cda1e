//! Exponentially weighted average.
//!
//! α = 2/(n+1), seeded with the first price, then EWA[i] = α·P[i] + (1−α)·EWA[i−1].
//! No warmup: every index carries a value.

use rust_decimal::Decimal;

pub fn calculate_ewa(prices: &[Decimal], window: usize) -> Vec<Decimal> {
    let Some(&seed) = prices.first() else {
        return Vec::new();
    };

    let window = window.max(1);
    let alpha = Decimal::TWO / Decimal::from(window + 1);
    let keep = Decimal::ONE - alpha;

    let mut values = Vec::with_capacity(prices.len());
    let mut ewa = seed;
    values.push(ewa);

    for &price in &prices[1..] {
        ewa = alpha * price + keep * ewa;
        values.push(ewa);
    }

    values
}
