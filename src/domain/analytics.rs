//! Performance analytics over a finished portfolio.
//!
//! Every statistic that can be undefined for degenerate input returns
//! `Result<_, AnalyticsError>` so reports can tell "not computable" apart
//! from a value.

use super::error::AnalyticsError;
use super::fixed_point::{div_ratio, round_currency, round_ratio};
use super::portfolio::Portfolio;
use super::position::Trade;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: i64 = 252;

/// Per-day risk-free rate, rounded to ratio precision.
pub fn daily_risk_free_rate(annual_rate: Decimal) -> Decimal {
    div_ratio(annual_rate, Decimal::from(TRADING_DAYS_PER_YEAR))
}

/// Mean of `returns`, rounded to ratio precision.
pub fn average_return(returns: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::NoReturns);
    }
    let sum: Decimal = returns.iter().sum();
    Ok(div_ratio(sum, Decimal::from(returns.len())))
}

/// Average return less the daily risk-free rate.
pub fn adjusted_return(returns: &[Decimal], annual_rate: Decimal) -> Result<Decimal, AnalyticsError> {
    Ok(average_return(returns)? - daily_risk_free_rate(annual_rate))
}

/// Population standard deviation of `returns`.
///
/// The variance is rounded to ratio precision before the root, so very small
/// dispersions read as zero volatility.
pub fn volatility(returns: &[Decimal]) -> Result<Decimal, AnalyticsError> {
    let mean = average_return(returns)?;
    let squares: Decimal = returns.iter().map(|r| (r - mean) * (r - mean)).sum();
    let variance = div_ratio(squares, Decimal::from(returns.len()));
    Ok(variance.sqrt().unwrap_or(Decimal::ZERO))
}

pub fn sharpe_ratio(returns: &[Decimal], annual_rate: Decimal) -> Result<Decimal, AnalyticsError> {
    let adjusted = adjusted_return(returns, annual_rate)?;
    let vol = volatility(returns)?;
    if vol.is_zero() {
        return Err(AnalyticsError::ZeroVolatility);
    }
    Ok(round_ratio(adjusted / vol))
}

/// Largest peak-to-trough decline of capital compounded from `returns`.
///
/// The running peak starts at `starting_capital`. Empty input gives 0.
pub fn max_drawdown(returns: &[Decimal], starting_capital: Decimal) -> Decimal {
    let mut capital = starting_capital;
    let mut peak = starting_capital;
    let mut max_dd = Decimal::ZERO;

    for r in returns {
        capital *= Decimal::ONE + r;
        if capital > peak {
            peak = capital;
        }
        if peak.is_zero() {
            continue;
        }
        let dd = div_ratio(peak - capital, peak);
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalAccuracy {
    pub total: usize,
    pub profitable: usize,
    pub loss_making: usize,
    /// Percentage of profitable trades, 2 dp.
    pub accuracy: Decimal,
}

pub fn signal_accuracy(trades: &[Trade]) -> Result<SignalAccuracy, AnalyticsError> {
    if trades.is_empty() {
        return Err(AnalyticsError::NoTrades);
    }
    let total = trades.len();
    let profitable = trades.iter().filter(|t| t.is_profitable()).count();
    let accuracy = round_currency(
        Decimal::from(profitable) * Decimal::ONE_HUNDRED / Decimal::from(total),
    );
    Ok(SignalAccuracy {
        total,
        profitable,
        loss_making: total - profitable,
        accuracy,
    })
}

/// An extreme of the cumulative return curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodPoint {
    pub cumulative_return: Decimal,
    /// Date of the ledger trade at the same position, if the ledger is that long.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodAnalysis {
    pub peak: PeriodPoint,
    pub trough: PeriodPoint,
}

/// Highest and lowest values of the summed return curve.
///
/// Ties resolve to the first occurrence.
pub fn analyze_periods(
    returns: &[Decimal],
    trades: &[Trade],
) -> Result<PeriodAnalysis, AnalyticsError> {
    if returns.is_empty() {
        return Err(AnalyticsError::NoReturns);
    }
    if trades.is_empty() {
        return Err(AnalyticsError::NoTrades);
    }

    let cumulative: Vec<Decimal> = returns
        .iter()
        .scan(Decimal::ZERO, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();

    let mut peak_idx = 0;
    let mut trough_idx = 0;
    for (i, value) in cumulative.iter().enumerate() {
        if *value > cumulative[peak_idx] {
            peak_idx = i;
        }
        if *value < cumulative[trough_idx] {
            trough_idx = i;
        }
    }

    let point = |idx: usize| PeriodPoint {
        cumulative_return: cumulative[idx],
        date: trades.get(idx).map(|t| t.date),
    };
    Ok(PeriodAnalysis {
        peak: point(peak_idx),
        trough: point(trough_idx),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub alpha: f64,
    pub beta: f64,
    /// `None` when the portfolio returns have no variance.
    pub r_squared: Option<f64>,
    pub samples: usize,
}

/// (market, portfolio) pairs for the dates present in both mappings.
pub fn align_returns(
    returns: &BTreeMap<NaiveDate, Decimal>,
    market_returns: &BTreeMap<NaiveDate, Decimal>,
) -> Vec<(f64, f64)> {
    returns
        .iter()
        .filter_map(|(date, r)| {
            let m = market_returns.get(date)?;
            Some((m.to_f64()?, r.to_f64()?))
        })
        .collect()
}

/// Ordinary least squares of portfolio returns on market returns.
pub fn regression(pairs: &[(f64, f64)]) -> Result<Regression, AnalyticsError> {
    const MIN_SAMPLES: usize = 2;
    if pairs.len() < MIN_SAMPLES {
        return Err(AnalyticsError::InsufficientSamples {
            have: pairs.len(),
            need: MIN_SAMPLES,
        });
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0_f64;
    let mut sxy = 0.0_f64;
    let mut syy = 0.0_f64;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return Err(AnalyticsError::ZeroMarketVariance);
    }

    let beta = sxy / sxx;
    let alpha = mean_y - beta * mean_x;
    let r_squared = if syy == 0.0 {
        None
    } else {
        let ss_res: f64 = pairs
            .iter()
            .map(|(x, y)| {
                let e = y - (alpha + beta * x);
                e * e
            })
            .sum();
        Some(1.0 - ss_res / syy)
    };

    Ok(Regression {
        alpha,
        beta,
        r_squared,
        samples: pairs.len(),
    })
}

/// Every metric for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub starting_capital: Decimal,
    pub final_capital: Decimal,
    pub total_pnl: Decimal,
    pub average_return: Result<Decimal, AnalyticsError>,
    pub adjusted_return: Result<Decimal, AnalyticsError>,
    pub volatility: Result<Decimal, AnalyticsError>,
    pub sharpe_ratio: Result<Decimal, AnalyticsError>,
    pub max_drawdown: Decimal,
    pub signal_accuracy: Result<SignalAccuracy, AnalyticsError>,
    pub periods: Result<PeriodAnalysis, AnalyticsError>,
    pub regression: Result<Regression, AnalyticsError>,
}

impl PerformanceReport {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: Decimal) -> Self {
        let returns = portfolio.return_series();
        let trades = portfolio.trades();
        let pairs = align_returns(portfolio.returns(), portfolio.market_returns());

        PerformanceReport {
            starting_capital: portfolio.starting_capital(),
            final_capital: portfolio.current_capital(),
            total_pnl: portfolio.total_pnl(),
            average_return: average_return(&returns),
            adjusted_return: adjusted_return(&returns, risk_free_rate),
            volatility: volatility(&returns),
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
            max_drawdown: max_drawdown(&returns, portfolio.starting_capital()),
            signal_accuracy: signal_accuracy(trades),
            periods: analyze_periods(&returns, trades),
            regression: regression(&pairs),
        }
    }
}
