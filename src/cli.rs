//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::analytics::PerformanceReport;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, SymbolOutcome};
use crate::domain::benchmark::market_returns;
use crate::domain::config_validation::{
    parse_date, read_decimal, read_int, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::EwatraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::liquidity::DEFAULT_MIN_VOLUME;
use crate::domain::portfolio::ExecutionParams;
use crate::domain::signal::SignalParams;
use crate::domain::universe::{load_series, parse_codes, resolve_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ewatrader", about = "EWA crossover strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            code,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref(), code.as_deref())
            }
        }
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EwatraderError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| EwatraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn data_port(config: &dyn ConfigPort) -> Result<CsvAdapter, EwatraderError> {
    let dir = config
        .get_string("backtest", "data_dir")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EwatraderError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir.trim())))
}

fn negative(section: &str, key: &str) -> EwatraderError {
    EwatraderError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{} must be non-negative", key),
    }
}

fn read_usize(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, EwatraderError> {
    let value = read_int(config, "strategy", key, default as i64)?;
    usize::try_from(value).map_err(|_| negative("strategy", key))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, EwatraderError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let defaults = BacktestConfig::new(start_date, end_date);
    let ind = IndicatorParams::default();
    let sig = SignalParams::default();
    let exec = ExecutionParams::default();

    Ok(BacktestConfig {
        benchmark: config
            .get_string("backtest", "benchmark")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(defaults.benchmark),
        initial_capital: read_decimal(
            config,
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        )?,
        risk_free_rate: read_decimal(config, "backtest", "risk_free_rate", defaults.risk_free_rate)?,
        min_volume: u64::try_from(read_int(
            config,
            "backtest",
            "min_volume",
            DEFAULT_MIN_VOLUME as i64,
        )?)
        .map_err(|_| negative("backtest", "min_volume"))?,
        indicators: IndicatorParams {
            short_window: read_usize(config, "short_window", ind.short_window)?,
            long_window: read_usize(config, "long_window", ind.long_window)?,
            rsi_period: read_usize(config, "rsi_period", ind.rsi_period)?,
            volatility_lookback: read_usize(config, "volatility_lookback", ind.volatility_lookback)?,
        },
        signals: SignalParams {
            base_threshold: read_decimal(config, "strategy", "base_threshold", sig.base_threshold)?,
            threshold_floor: read_decimal(config, "strategy", "threshold_floor", sig.threshold_floor)?,
            threshold_ceiling: read_decimal(
                config,
                "strategy",
                "threshold_ceiling",
                sig.threshold_ceiling,
            )?,
            rsi_overbought: read_decimal(config, "strategy", "rsi_overbought", sig.rsi_overbought)?,
            rsi_oversold: read_decimal(config, "strategy", "rsi_oversold", sig.rsi_oversold)?,
        },
        execution: ExecutionParams {
            stop_loss: read_decimal(config, "strategy", "stop_loss", exec.stop_loss)?,
            max_position_fraction: read_decimal(
                config,
                "strategy",
                "max_position_fraction",
                exec.max_position_fraction,
            )?,
            max_volatility: read_decimal(config, "strategy", "max_volatility", exec.max_volatility)?,
            volatility_estimate: read_decimal(
                config,
                "strategy",
                "volatility_estimate",
                exec.volatility_estimate,
            )?,
        },
        start_date,
        end_date,
    })
}

/// Codes from `--code`, then `[backtest] codes`; `None` means "everything".
pub fn configured_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Option<Vec<String>>, EwatraderError> {
    if let Some(c) = code_override {
        return Ok(Some(vec![c.trim().to_uppercase()]));
    }
    match config.get_string("backtest", "codes") {
        Some(codes) => parse_codes(&codes)
            .map(Some)
            .map_err(|e| EwatraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "codes".into(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn validated_config(config_path: &Path) -> Result<(FileConfigAdapter, BacktestConfig), EwatraderError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    Ok((adapter, bt_config))
}

pub fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    code_override: Option<&str>,
) -> Result<(), EwatraderError> {
    let (adapter, bt_config) = validated_config(config_path)?;
    let data_port = data_port(&adapter)?;

    let symbols = resolve_symbols(
        &data_port,
        configured_codes(code_override, &adapter)?,
        &bt_config.benchmark,
    )?;
    if symbols.is_empty() {
        return Err(EwatraderError::NoData {
            code: "all".to_string(),
        });
    }

    info!(
        "Loading {} symbols, {} to {}",
        symbols.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let loaded = load_series(&data_port, &symbols, bt_config.start_date, bt_config.end_date);

    let market = match data_port.fetch_prices(
        &bt_config.benchmark,
        bt_config.start_date,
        bt_config.end_date,
    ) {
        Ok(bars) => market_returns(&bars),
        Err(e) => {
            warn!(
                "benchmark {} unavailable ({}); regression will be undefined",
                bt_config.benchmark, e
            );
            BTreeMap::new()
        }
    };

    let result = backtest_engine::run_loaded(&loaded, &market, &bt_config);
    check_any_usable(&result.outcomes)?;

    let report = PerformanceReport::compute(&result.portfolio, bt_config.risk_free_rate);
    let reporter = TextReportAdapter::new();
    match output_path {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            reporter.write(&result, &report, &mut out)?;
            info!("Report written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            reporter.write(&result, &report, &mut out)?;
        }
    }
    Ok(())
}

/// Fails when every symbol lacked data or history.
fn check_any_usable(outcomes: &BTreeMap<String, SymbolOutcome>) -> Result<(), EwatraderError> {
    let unusable = |o: &SymbolOutcome| {
        matches!(
            o,
            SymbolOutcome::NoData | SymbolOutcome::InsufficientData { .. }
        )
    };
    if !outcomes.values().all(unusable) {
        return Ok(());
    }

    let short = outcomes.iter().find_map(|(code, o)| match o {
        SymbolOutcome::InsufficientData { bars, minimum } => Some((code, *bars, *minimum)),
        _ => None,
    });
    Err(match short {
        Some((code, bars, minimum)) if outcomes.len() == 1 => EwatraderError::InsufficientData {
            code: code.clone(),
            bars,
            minimum,
        },
        Some((_, bars, minimum)) => EwatraderError::InsufficientData {
            code: "all".to_string(),
            bars,
            minimum,
        },
        None => EwatraderError::NoData {
            code: "all".to_string(),
        },
    })
}

pub fn run_dry_run(config_path: &Path) -> Result<(), EwatraderError> {
    let (adapter, bt_config) = validated_config(config_path)?;
    let codes = configured_codes(None, &adapter)?;

    let mut out = io::stdout().lock();
    writeln!(out, "Configuration is valid")?;
    writeln!(out, "\nPeriod: {} to {}", bt_config.start_date, bt_config.end_date)?;
    writeln!(out, "Initial capital: {}", bt_config.initial_capital)?;
    writeln!(out, "Benchmark: {}", bt_config.benchmark)?;
    writeln!(out, "\nIndicators to compute:")?;
    for ind in bt_config.indicators.indicator_types() {
        writeln!(out, "  {}", ind)?;
    }
    writeln!(out, "\nUniverse:")?;
    match codes {
        Some(codes) => writeln!(out, "  codes: {}", codes.join(", "))?,
        None => writeln!(
            out,
            "  every symbol in the data directory except {}",
            bt_config.benchmark
        )?,
    }
    writeln!(out, "\nDry run complete")?;
    Ok(())
}

pub fn run_list_symbols(config_path: &Path) -> Result<(), EwatraderError> {
    let config = load_config(config_path)?;
    let symbols = data_port(&config)?.list_symbols()?;

    if symbols.is_empty() {
        warn!("No symbols found");
    } else {
        let mut out = io::stdout().lock();
        for symbol in &symbols {
            writeln!(out, "{}", symbol)?;
        }
        info!("{} symbols found", symbols.len());
    }
    Ok(())
}

pub fn run_info(config_path: &Path, code: Option<&str>) -> Result<(), EwatraderError> {
    let config = load_config(config_path)?;
    let port = data_port(&config)?;
    let codes = match configured_codes(code, &config)? {
        Some(codes) => codes,
        None => port.list_symbols()?,
    };

    let mut out = io::stdout().lock();
    for c in &codes {
        match port.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                writeln!(out, "{}: {} bars, {} to {}", c, count, min_date, max_date)?;
            }
            Ok(None) => warn!("{}: no data found", c),
            Err(e) => warn!("error querying {}: {}", c, e),
        }
    }
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), EwatraderError> {
    let (_, bt_config) = validated_config(config_path)?;
    let mut out = io::stdout().lock();
    writeln!(out, "Configuration is valid.")?;
    writeln!(
        out,
        "  windows: short {}, long {}, rsi {}, volatility {}",
        bt_config.indicators.short_window,
        bt_config.indicators.long_window,
        bt_config.indicators.rsi_period,
        bt_config.indicators.volatility_lookback
    )?;
    writeln!(
        out,
        "  stop loss {}, max position fraction {}",
        bt_config.execution.stop_loss, bt_config.execution.max_position_fraction
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn build_config_defaults() {
        let adapter = config("[backtest]\ndata_dir = d\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let c = build_backtest_config(&adapter).unwrap();
        assert_eq!(c.benchmark, "SPY");
        assert_eq!(c.initial_capital, d("100000.00"));
        assert_eq!(c.min_volume, 100_000);
        assert_eq!(c.indicators, IndicatorParams::default());
        assert_eq!(c.signals, SignalParams::default());
        assert_eq!(c.execution, ExecutionParams::default());
    }

    #[test]
    fn build_config_overrides() {
        let adapter = config(
            "[backtest]\nstart_date = 2020-01-01\nend_date = 2021-01-01\nbenchmark = qqq\n\
             initial_capital = 5000.50\nmin_volume = 10\n\
             [strategy]\nshort_window = 5\nlong_window = 20\nstop_loss = 0.03\nrsi_oversold = 25\n",
        );
        let c = build_backtest_config(&adapter).unwrap();
        assert_eq!(c.benchmark, "QQQ");
        assert_eq!(c.initial_capital, d("5000.50"));
        assert_eq!(c.min_volume, 10);
        assert_eq!(c.indicators.short_window, 5);
        assert_eq!(c.indicators.long_window, 20);
        assert_eq!(c.execution.stop_loss, d("0.03"));
        assert_eq!(c.signals.rsi_oversold, d("25"));
    }

    #[test]
    fn build_config_missing_date() {
        let adapter = config("[backtest]\nstart_date = 2020-01-01\n");
        let err = build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, EwatraderError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn build_config_rejects_non_numeric_window() {
        let adapter = config(
            "[backtest]\nstart_date = 2020-01-01\nend_date = 2021-01-01\n\
             [strategy]\nshort_window = five\n",
        );
        let err = build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, EwatraderError::ConfigInvalid { key, .. } if key == "short_window"));
    }

    #[test]
    fn build_config_rejects_negative_min_volume() {
        let adapter = config(
            "[backtest]\nstart_date = 2020-01-01\nend_date = 2021-01-01\nmin_volume = -5\n",
        );
        let err = build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, EwatraderError::ConfigInvalid { key, .. } if key == "min_volume"));
    }

    #[test]
    fn configured_codes_precedence() {
        let adapter = config("[backtest]\ncodes = aapl, msft\n");
        assert_eq!(
            configured_codes(Some("goog"), &adapter).unwrap(),
            Some(vec!["GOOG".to_string()])
        );
        assert_eq!(
            configured_codes(None, &adapter).unwrap(),
            Some(vec!["AAPL".to_string(), "MSFT".to_string()])
        );
        assert_eq!(configured_codes(None, &config("[backtest]\n")).unwrap(), None);
    }

    #[test]
    fn all_unusable_outcomes_fail() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "AAPL".to_string(),
            SymbolOutcome::InsufficientData {
                bars: 10,
                minimum: 200,
            },
        );
        let err = check_any_usable(&outcomes).unwrap_err();
        assert!(matches!(err, EwatraderError::InsufficientData { ref code, .. } if code == "AAPL"));

        outcomes.insert("MSFT".to_string(), SymbolOutcome::NoData);
        assert!(check_any_usable(&outcomes).is_err());

        outcomes.insert(
            "GOOG".to_string(),
            SymbolOutcome::Simulated {
                signals: 0,
                trades: 0,
            },
        );
        assert!(check_any_usable(&outcomes).is_ok());
    }

    #[test]
    fn only_empty_series_is_no_data() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("AAPL".to_string(), SymbolOutcome::NoData);
        assert!(matches!(
            check_any_usable(&outcomes),
            Err(EwatraderError::NoData { .. })
        ));
    }
}
