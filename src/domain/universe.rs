//! Symbol universe: which series a run covers and loading them.
//!
//! Codes come from configuration or, when none are configured, from every
//! symbol the data port knows about except the benchmark. Loading keeps
//! "no data" apart from a fetch that failed.

use crate::domain::error::EwatraderError;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

/// The symbols to backtest.
///
/// `configured` wins when present; otherwise every listed symbol other than
/// `benchmark` is used.
pub fn resolve_symbols(
    data_port: &dyn DataPort,
    configured: Option<Vec<String>>,
    benchmark: &str,
) -> Result<Vec<String>, EwatraderError> {
    match configured {
        Some(codes) => Ok(codes),
        None => Ok(data_port
            .list_symbols()?
            .into_iter()
            .filter(|s| !s.eq_ignore_ascii_case(benchmark))
            .collect()),
    }
}

/// Series fetched for a run, plus the symbols whose fetch failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSeries {
    pub series: BTreeMap<String, Vec<PriceBar>>,
    pub failures: BTreeMap<String, String>,
}

/// Fetch every symbol's series in `[start_date, end_date]`.
///
/// A symbol the port has no data for is kept with an empty series; any
/// other fetch error lands in `failures` with its message.
pub fn load_series(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> LoadedSeries {
    let mut loaded = LoadedSeries::default();
    for symbol in symbols {
        match data_port.fetch_prices(symbol, start_date, end_date) {
            Ok(bars) => {
                info!("{}: {} bars loaded", symbol, bars.len());
                loaded.series.insert(symbol.clone(), bars);
            }
            Err(EwatraderError::NoData { .. }) => {
                warn!("{}: no data available", symbol);
                loaded.series.insert(symbol.clone(), Vec::new());
            }
            Err(e) => {
                warn!("{}: fetch failed ({})", symbol, e);
                loaded.failures.insert(symbol.clone(), e.to_string());
            }
        }
    }
    loaded
}
