//! Configuration validation.
//!
//! Validates every `[backtest]` and `[strategy]` key before a run starts.

use crate::domain::error::EwatraderError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    validate_data_dir(config)?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_min_volume(config)?;
    validate_codes(config)?;
    validate_benchmark(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    validate_windows(config)?;
    validate_rsi_bands(config)?;
    validate_thresholds(config)?;
    validate_execution(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> EwatraderError {
    EwatraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Decimal value of `key`, `default` when absent, error when unparseable.
pub fn read_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Decimal,
) -> Result<Decimal, EwatraderError> {
    config
        .get_decimal(section, key, default)
        .map_err(|raw| invalid(section, key, &format!("{:?} is not a decimal number", raw)))
}

/// Integer value of `key`, `default` when absent, error when unparseable.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, EwatraderError> {
    config
        .get_int(section, key, default)
        .map_err(|raw| invalid(section, key, &format!("{:?} is not an integer", raw)))
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, EwatraderError> {
    match value {
        None => Err(EwatraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    match config.get_string("backtest", "data_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(EwatraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let value = read_decimal(config, "backtest", "initial_capital", Decimal::ONE)?;
    if value <= Decimal::ZERO {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let value = read_decimal(config, "backtest", "risk_free_rate", Decimal::ZERO)?;
    if value < Decimal::ZERO || value >= Decimal::ONE {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_min_volume(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    if read_int(config, "backtest", "min_volume", 0)? < 0 {
        return Err(invalid(
            "backtest",
            "min_volume",
            "min_volume must be non-negative",
        ));
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    match config.get_string("backtest", "codes") {
        None => Ok(()),
        Some(codes) => parse_codes(&codes)
            .map(|_| ())
            .map_err(|e| invalid("backtest", "codes", &e.to_string())),
    }
}

fn validate_benchmark(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    match config.get_string("backtest", "benchmark") {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "backtest",
            "benchmark",
            "benchmark must not be empty",
        )),
        _ => Ok(()),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    for key in ["short_window", "long_window", "rsi_period", "volatility_lookback"] {
        if read_int(config, "strategy", key, 1)? < 1 {
            return Err(invalid("strategy", key, &format!("{} must be at least 1", key)));
        }
    }
    let short = read_int(config, "strategy", "short_window", 50)?;
    let long = read_int(config, "strategy", "long_window", 200)?;
    if long <= short {
        return Err(invalid(
            "strategy",
            "long_window",
            "long_window must be greater than short_window",
        ));
    }
    Ok(())
}

fn validate_rsi_bands(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let hundred = Decimal::ONE_HUNDRED;
    let overbought = read_decimal(config, "strategy", "rsi_overbought", Decimal::from(70))?;
    let oversold = read_decimal(config, "strategy", "rsi_oversold", Decimal::from(30))?;

    for (key, value) in [("rsi_overbought", overbought), ("rsi_oversold", oversold)] {
        if value < Decimal::ZERO || value > hundred {
            return Err(invalid("strategy", key, &format!("{} must be within 0..=100", key)));
        }
    }
    if oversold >= overbought {
        return Err(invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let base = read_decimal(config, "strategy", "base_threshold", Decimal::new(5, 2))?;
    let floor = read_decimal(config, "strategy", "threshold_floor", Decimal::new(1, 2))?;
    let ceiling = read_decimal(config, "strategy", "threshold_ceiling", Decimal::new(5, 2))?;

    if base < Decimal::ZERO {
        return Err(invalid(
            "strategy",
            "base_threshold",
            "base_threshold must be non-negative",
        ));
    }
    if floor > ceiling {
        return Err(invalid(
            "strategy",
            "threshold_ceiling",
            "threshold_ceiling must not be below threshold_floor",
        ));
    }
    Ok(())
}

fn validate_execution(config: &dyn ConfigPort) -> Result<(), EwatraderError> {
    let positive = [
        ("stop_loss", Decimal::new(2, 2)),
        ("max_volatility", Decimal::new(5, 2)),
        ("volatility_estimate", Decimal::new(1, 2)),
    ];
    for (key, default) in positive {
        if read_decimal(config, "strategy", key, default)? <= Decimal::ZERO {
            return Err(invalid("strategy", key, &format!("{} must be positive", key)));
        }
    }

    let fraction = read_decimal(
        config,
        "strategy",
        "max_position_fraction",
        Decimal::new(10, 2),
    )?;
    if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
        return Err(invalid(
            "strategy",
            "max_position_fraction",
            "max_position_fraction must be between 0 and 1",
        ));
    }
    Ok(())
}
