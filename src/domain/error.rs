//! Domain error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A precondition violation found while simulating one symbol.
///
/// Fatal for that symbol only: the portfolio is left as it was before the
/// symbol started.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("non-positive price {price} for {symbol} on {date}")]
    NonPositivePrice {
        symbol: String,
        date: NaiveDate,
        price: Decimal,
    },

    #[error("dates out of order for {symbol}: {date} does not follow {previous}")]
    UnorderedDates {
        symbol: String,
        previous: NaiveDate,
        date: NaiveDate,
    },
}

/// A metric that was computed but is statistically undefined for its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("no return contributions recorded")]
    NoReturns,

    #[error("no trades recorded")]
    NoTrades,

    #[error("return volatility is zero")]
    ZeroVolatility,

    #[error("have {have} paired samples, need at least {need}")]
    InsufficientSamples { have: usize, need: usize },

    #[error("market returns have zero variance")]
    ZeroMarketVariance,
}

/// Top-level error type for ewatrader.
#[derive(Debug, thiserror::Error)]
pub enum EwatraderError {
    #[error("data access error: {reason}")]
    DataAccess { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EwatraderError> for std::process::ExitCode {
    fn from(err: &EwatraderError) -> Self {
        let code: u8 = match err {
            EwatraderError::Io(_) => 1,
            EwatraderError::ConfigParse { .. }
            | EwatraderError::ConfigMissing { .. }
            | EwatraderError::ConfigInvalid { .. } => 2,
            EwatraderError::DataAccess { .. } => 3,
            EwatraderError::NoData { .. } | EwatraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
