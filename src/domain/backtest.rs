//! Backtest runner: filter, indicators, signals and execution for every symbol.
//!
//! Symbols are processed one at a time in ascending order because they share
//! the portfolio's capital and ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use super::indicator::{IndicatorParams, IndicatorSet};
use super::liquidity::{average_volume, filter_liquid_symbols, DEFAULT_MIN_VOLUME};
use super::portfolio::{ExecutionParams, Portfolio};
use super::price_bar::PriceBar;
use super::signal::{generate_signals, SignalParams};
use super::universe::LoadedSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark: String,
    pub initial_capital: Decimal,
    pub risk_free_rate: Decimal,
    pub min_volume: u64,
    pub indicators: IndicatorParams,
    pub signals: SignalParams,
    pub execution: ExecutionParams,
}

impl BacktestConfig {
    /// Defaults for everything except the date range.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            benchmark: "SPY".to_string(),
            initial_capital: Decimal::new(100_000_00, 2),
            risk_free_rate: Decimal::new(2, 2),
            min_volume: DEFAULT_MIN_VOLUME,
            indicators: IndicatorParams::default(),
            signals: SignalParams::default(),
            execution: ExecutionParams::default(),
        }
    }
}

/// What happened to one symbol during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    NoData,
    Illiquid { average_volume: Decimal },
    InsufficientData { bars: usize, minimum: usize },
    Failed { reason: String },
    Simulated { signals: usize, trades: usize },
}

impl SymbolOutcome {
    pub fn is_simulated(&self) -> bool {
        matches!(self, SymbolOutcome::Simulated { .. })
    }
}

impl fmt::Display for SymbolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolOutcome::NoData => write!(f, "no data"),
            SymbolOutcome::Illiquid { average_volume } => {
                write!(f, "illiquid (average volume {})", average_volume.round_dp(0))
            }
            SymbolOutcome::InsufficientData { bars, minimum } => {
                write!(f, "insufficient data ({} bars, need {})", bars, minimum)
            }
            SymbolOutcome::Failed { reason } => write!(f, "failed: {}", reason),
            SymbolOutcome::Simulated { signals, trades } => {
                write!(f, "simulated ({} signals, {} trades)", signals, trades)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub outcomes: BTreeMap<String, SymbolOutcome>,
}

impl BacktestResult {
    pub fn simulated_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_simulated()).count()
    }
}

pub fn run_backtest(
    series: &BTreeMap<String, Vec<PriceBar>>,
    market_returns: &BTreeMap<NaiveDate, Decimal>,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut portfolio = Portfolio::new(config.initial_capital, config.execution);
    let mut outcomes = BTreeMap::new();

    let liquid = filter_liquid_symbols(series, config.min_volume);
    let minimum = config.indicators.long_window;

    for (symbol, bars) in series {
        let outcome = if bars.is_empty() {
            warn!("{}: no data", symbol);
            SymbolOutcome::NoData
        } else if liquid.binary_search(symbol).is_err() {
            let avg = average_volume(bars).unwrap_or(Decimal::ZERO);
            warn!("{}: skipped, average volume {} below {}", symbol, avg.round_dp(0), config.min_volume);
            SymbolOutcome::Illiquid {
                average_volume: avg,
            }
        } else if bars.len() < minimum {
            warn!("{}: skipped, {} bars but need {}", symbol, bars.len(), minimum);
            SymbolOutcome::InsufficientData {
                bars: bars.len(),
                minimum,
            }
        } else {
            simulate_symbol(&mut portfolio, symbol, bars, config)
        };
        outcomes.insert(symbol.clone(), outcome);
    }

    portfolio.add_market_returns(market_returns);
    info!(
        "Backtest complete: {} of {} symbols simulated, {} trades",
        outcomes.values().filter(|o| o.is_simulated()).count(),
        outcomes.len(),
        portfolio.trades().len()
    );

    BacktestResult {
        portfolio,
        outcomes,
    }
}

/// [`run_backtest`] over freshly loaded series; fetch failures are recorded
/// as [`SymbolOutcome::Failed`].
pub fn run_loaded(
    loaded: &LoadedSeries,
    market_returns: &BTreeMap<NaiveDate, Decimal>,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut result = run_backtest(&loaded.series, market_returns, config);
    for (symbol, reason) in &loaded.failures {
        result.outcomes.insert(
            symbol.clone(),
            SymbolOutcome::Failed {
                reason: reason.clone(),
            },
        );
    }
    result
}

fn simulate_symbol(
    portfolio: &mut Portfolio,
    symbol: &str,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> SymbolOutcome {
    let indicators = IndicatorSet::compute(bars, &config.indicators);
    let signals = generate_signals(bars, &indicators, &config.signals);
    let signal_count = signals.iter().count();

    match portfolio.execute_signals(symbol, &signals, bars) {
        Ok(summary) => {
            info!(
                "{}: {} bars, {} signals, {} trades, pnl {}",
                symbol,
                bars.len(),
                signal_count,
                summary.trades,
                summary.pnl
            );
            SymbolOutcome::Simulated {
                signals: signal_count,
                trades: summary.trades,
            }
        }
        Err(e) => {
            warn!("{}: simulation failed: {}", symbol, e);
            SymbolOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn make_bars(prices: &[&str], volume: u64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceBar::new(start + chrono::Duration::days(i as i64), d(p), volume))
            .collect()
    }

    fn config() -> BacktestConfig {
        BacktestConfig::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
    }

    #[test]
    fn config_defaults() {
        let c = config();
        assert_eq!(c.benchmark, "SPY");
        assert_eq!(c.initial_capital, d("100000.00"));
        assert_eq!(c.risk_free_rate, d("0.02"));
        assert_eq!(c.min_volume, 100_000);
        assert_eq!(c.indicators.long_window, 200);
    }

    #[test]
    fn short_series_is_skipped() {
        let mut series = BTreeMap::new();
        series.insert(
            "AAPL".to_string(),
            make_bars(
                &["100", "101", "99", "95", "90", "92", "97", "103", "108", "112"],
                500_000,
            ),
        );

        let result = run_backtest(&series, &BTreeMap::new(), &config());
        assert_eq!(
            result.outcomes.get("AAPL"),
            Some(&SymbolOutcome::InsufficientData {
                bars: 10,
                minimum: 200
            })
        );
        assert!(result.portfolio.trades().is_empty());
        assert!(result.portfolio.returns().is_empty());
        assert_eq!(result.portfolio.current_capital(), d("100000.00"));
    }

    #[test]
    fn outcomes_for_every_symbol() {
        let mut series = BTreeMap::new();
        series.insert("EMPTY".to_string(), Vec::new());
        series.insert("THIN".to_string(), make_bars(&["10", "11"], 10));
        series.insert("FLAT".to_string(), make_bars(&["50"; 250], 200_000));

        let result = run_backtest(&series, &BTreeMap::new(), &config());

        assert_eq!(result.outcomes.get("EMPTY"), Some(&SymbolOutcome::NoData));
        assert!(matches!(
            result.outcomes.get("THIN"),
            Some(SymbolOutcome::Illiquid { .. })
        ));
        assert_eq!(
            result.outcomes.get("FLAT"),
            Some(&SymbolOutcome::Simulated {
                signals: 0,
                trades: 0
            })
        );
        assert_eq!(result.simulated_count(), 1);
    }

    #[test]
    fn bad_price_marks_symbol_failed() {
        let mut config = config();
        config.indicators = IndicatorParams {
            short_window: 2,
            long_window: 3,
            rsi_period: 2,
            volatility_lookback: 2,
        };
        // Wide RSI bands and a zero threshold let the first upward crossing through.
        config.signals = SignalParams {
            base_threshold: d("0"),
            threshold_floor: d("0"),
            threshold_ceiling: d("0"),
            rsi_overbought: d("-1"),
            rsi_oversold: d("101"),
        };

        let mut series = BTreeMap::new();
        series.insert(
            "BAD".to_string(),
            make_bars(&["10", "12", "14", "0", "15"], 500_000),
        );
        series.insert("GOOD".to_string(), make_bars(&["10", "12", "14", "16"], 500_000));

        let result = run_backtest(&series, &BTreeMap::new(), &config);

        assert!(matches!(
            result.outcomes.get("BAD"),
            Some(SymbolOutcome::Failed { .. })
        ));
        assert!(result.portfolio.trades().iter().all(|t| t.symbol == "GOOD"));
        assert_eq!(
            result.portfolio.current_capital(),
            result.portfolio.starting_capital() + result.portfolio.total_pnl()
        );
    }

    #[test]
    fn market_returns_installed() {
        let mut market = BTreeMap::new();
        market.insert(NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(), d("0.01"));
        let result = run_backtest(&BTreeMap::new(), &market, &config());
        assert_eq!(result.portfolio.market_returns(), &market);
        assert!(result.outcomes.is_empty());
    }

    #[test]
    fn run_loaded_reports_fetch_failures() {
        let mut loaded = LoadedSeries::default();
        loaded.series.insert("GONE".to_string(), Vec::new());
        loaded
            .failures
            .insert("BAD".to_string(), "data access error: bad row".to_string());

        let result = run_loaded(&loaded, &BTreeMap::new(), &config());
        assert_eq!(result.outcomes["GONE"], SymbolOutcome::NoData);
        assert_eq!(
            result.outcomes["BAD"],
            SymbolOutcome::Failed {
                reason: "data access error: bad row".to_string()
            }
        );
        assert_eq!(result.simulated_count(), 0);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(SymbolOutcome::NoData.to_string(), "no data");
        assert_eq!(
            SymbolOutcome::InsufficientData {
                bars: 10,
                minimum: 200
            }
            .to_string(),
            "insufficient data (10 bars, need 200)"
        );
    }
}
