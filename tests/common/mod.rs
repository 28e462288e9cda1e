#![allow(dead_code)]

use chrono::NaiveDate;
use ewatrader::domain::backtest::BacktestConfig;
use ewatrader::domain::error::EwatraderError;
pub use ewatrader::domain::price_bar::PriceBar;
use ewatrader::domain::indicator::IndicatorParams;
use ewatrader::domain::signal::SignalParams;
use ewatrader::ports::data_port::DataPort;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EwatraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EwatraderError::DataAccess {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EwatraderError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EwatraderError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let first = bars.first().map(|b| b.date);
                let last = bars.last().map(|b| b.date);
                Ok(first.zip(last).map(|(f, l)| (f, l, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn make_bar(date: NaiveDate, close: &str, volume: u64) -> PriceBar {
    PriceBar::new(date, d(close), volume)
}

/// One bar per calendar day from `start`.
pub fn bars_from(start: NaiveDate, prices: &[&str], volume: u64) -> Vec<PriceBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| make_bar(start + chrono::Duration::days(i as i64), p, volume))
        .collect()
}

/// `count` bars at a constant price.
pub fn generate_bars(start: NaiveDate, count: usize, price: &str, volume: u64) -> Vec<PriceBar> {
    (0..count)
        .map(|i| make_bar(start + chrono::Duration::days(i as i64), price, volume))
        .collect()
}

/// Rises, dips far enough to trip a 2% stop, then recovers.
pub const STOP_OUT_PRICES: [&str; 5] = ["10", "12", "11.5", "11.8", "13"];

pub fn sample_config() -> BacktestConfig {
    BacktestConfig::new(date(2024, 1, 1), date(2024, 12, 31))
}

/// Short windows, a zero threshold and RSI bands no value can miss, so the
/// first upward EWA crossing always buys.
pub fn crossover_config() -> BacktestConfig {
    BacktestConfig {
        indicators: IndicatorParams {
            short_window: 2,
            long_window: 3,
            rsi_period: 2,
            volatility_lookback: 2,
        },
        signals: SignalParams {
            base_threshold: Decimal::ZERO,
            threshold_floor: Decimal::ZERO,
            threshold_ceiling: Decimal::ZERO,
            rsi_overbought: d("-1"),
            rsi_oversold: d("101"),
        },
        ..sample_config()
    }
}
