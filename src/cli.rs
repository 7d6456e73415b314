//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, TIMESTAMP_FORMAT};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::load_strategy;
use crate::domain::error::MohoError;
use crate::domain::ohlcv::{Candle, resample};
use crate::domain::params::{ParamValue, Space, param_specs};
use crate::domain::pipeline::{AnalyzedFrame, analyze};
use crate::domain::position::{OpenPosition, TradeSide};
use crate::domain::signal::SideSignal;
use crate::domain::strategy::{ExitAssessment, Strategy};
use crate::ports::candle_port::CandlePort;

#[derive(Parser, Debug)]
#[command(
    name = "moho",
    about = "Indicator, signal and exit-decision core for an offset-MA strategy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze candles and print per-candle entry/exit signals as CSV
    Signals {
        /// INI configuration; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding <pair>_<timeframe>.csv files
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        pair: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only print rows where a signal fired
        #[arg(long)]
        only_signals: bool,
        /// Extra indicator columns to include
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Evaluate exit decisions for an open position against the latest candle
    Exit {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        pair: String,
        /// long or short
        #[arg(long, default_value = "long")]
        side: String,
        #[arg(long)]
        entry_rate: f64,
        /// Entry time, "%Y-%m-%d %H:%M:%S"
        #[arg(long)]
        entry_time: String,
        /// Most favourable rate since entry; defaults to the better of entry and current
        #[arg(long)]
        best_rate: Option<f64>,
        /// Defaults to the latest close
        #[arg(long)]
        current_rate: Option<f64>,
        /// Host-computed profit ratio, fees included; derived from the rates when omitted
        #[arg(long, allow_hyphen_values = true)]
        current_profit: Option<f64>,
    },
    /// Validate an INI configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List parameter keys with defaults and accepted ranges
    Params {
        /// buy or sell
        #[arg(long)]
        space: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Signals {
            config,
            data_dir,
            pair,
            output,
            only_signals,
            columns,
        } => run_signals(
            config.as_deref(),
            &data_dir,
            &pair,
            output.as_deref(),
            only_signals,
            &columns,
        ),
        Command::Exit {
            config,
            data_dir,
            pair,
            side,
            entry_rate,
            entry_time,
            best_rate,
            current_rate,
            current_profit,
        } => run_exit(
            config.as_deref(),
            &data_dir,
            &pair,
            &ExitArgs {
                side,
                entry_rate,
                entry_time,
                best_rate,
                current_rate,
                current_profit,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Params { space } => run_params(space.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MohoError> {
    FileConfigAdapter::from_file(path)
}

/// Strategy from an INI file, or the built-in defaults.
pub fn build_strategy(config_path: Option<&Path>) -> Result<Strategy, MohoError> {
    match config_path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            load_strategy(&load_config(path)?)
        }
        None => Strategy::defaults(),
    }
}

/// Primary and informative candles for `pair`; informative candles are
/// resampled from the primary ones when no informative file exists.
pub fn load_candles(
    port: &dyn CandlePort,
    strategy: &Strategy,
    pair: &str,
) -> Result<(Vec<Candle>, Vec<Candle>), MohoError> {
    let settings = &strategy.settings;
    let primary = port.fetch_candles(pair, &settings.timeframe)?;
    let informative = if port.has_candles(pair, &settings.informative_timeframe) {
        port.fetch_candles(pair, &settings.informative_timeframe)?
    } else {
        warn!(
            pair,
            timeframe = %settings.informative_timeframe,
            "no informative candles, resampling primary"
        );
        resample(&primary, &settings.timeframe, &settings.informative_timeframe)?
    };
    Ok((primary, informative))
}

pub fn analyze_pair(
    port: &dyn CandlePort,
    strategy: &Strategy,
    pair: &str,
) -> Result<AnalyzedFrame, MohoError> {
    let (primary, informative) = load_candles(port, strategy, pair)?;
    info!(pair, primary = primary.len(), informative = informative.len(), "analyzing");
    analyze(strategy, &primary, &informative)
}

fn run_signals(
    config_path: Option<&Path>,
    data_dir: &Path,
    pair: &str,
    output: Option<&Path>,
    only_signals: bool,
    columns: &[String],
) -> Result<(), MohoError> {
    let strategy = build_strategy(config_path)?;
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let analyzed = analyze_pair(&adapter, &strategy, pair)?;

    if let Some(missing) = columns.iter().find(|c| !analyzed.frame().contains(c)) {
        return Err(MohoError::Data {
            reason: format!("no such column {}", missing),
        });
    }

    match output {
        Some(path) => write_signals(File::create(path)?, &analyzed, columns, only_signals),
        None => write_signals(io::stdout().lock(), &analyzed, columns, only_signals),
    }
}

fn csv_error(e: csv::Error) -> MohoError {
    MohoError::Io(e.into())
}

fn fired_list(signal: &SideSignal) -> String {
    signal
        .fired
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the analyzed frame as CSV: OHLCV, signal columns, then `columns`.
pub fn write_signals<W: Write>(
    writer: W,
    analyzed: &AnalyzedFrame,
    columns: &[String],
    only_signals: bool,
) -> Result<(), MohoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<String> = [
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "entry",
        "entry_tag",
        "entry_groups",
        "exit",
        "exit_tag",
        "exit_groups",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(columns.iter().cloned());
    wtr.write_record(&header).map_err(csv_error)?;

    for index in 0..analyzed.len() {
        let Some((row, signal)) = analyzed.row(index) else {
            continue;
        };
        if only_signals && !signal.entry.active && !signal.exit.active {
            continue;
        }
        let mut record = vec![row.timestamp().format(TIMESTAMP_FORMAT).to_string()];
        for name in ["open", "high", "low", "close", "volume"] {
            record.push(format_value(row.get(name)));
        }
        record.push(u8::from(signal.entry.active).to_string());
        record.push(signal.entry.tag.clone().unwrap_or_default());
        record.push(fired_list(&signal.entry));
        record.push(u8::from(signal.exit.active).to_string());
        record.push(signal.exit.tag.clone().unwrap_or_default());
        record.push(fired_list(&signal.exit));
        for name in columns {
            record.push(format_value(row.get(name)));
        }
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct ExitArgs {
    pub side: String,
    pub entry_rate: f64,
    pub entry_time: String,
    pub best_rate: Option<f64>,
    pub current_rate: Option<f64>,
    pub current_profit: Option<f64>,
}

/// Position snapshot as of the latest analyzed candle's close.
pub fn build_position(
    pair: &str,
    args: &ExitArgs,
    analyzed: &AnalyzedFrame,
    strategy: &Strategy,
) -> Result<OpenPosition, MohoError> {
    let invalid = |key: &str, reason: String| MohoError::InvalidParameter {
        key: key.to_string(),
        reason,
    };
    let side = TradeSide::parse(&args.side)
        .ok_or_else(|| invalid("side", format!("'{}' is not long or short", args.side)))?;
    let entry_time = NaiveDateTime::parse_from_str(args.entry_time.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| invalid("entry_time", e.to_string()))?;
    if !(args.entry_rate.is_finite() && args.entry_rate > 0.0) {
        return Err(invalid("entry_rate", "must be a positive number".to_string()));
    }
    if args.current_profit.is_some_and(|p| !(p.is_finite() && p > -1.0)) {
        return Err(invalid("current_profit", "must be a ratio above -1".to_string()));
    }

    let last = analyzed.last_row().ok_or_else(|| MohoError::Data {
        reason: "no analyzed candles".to_string(),
    })?;
    let current_rate = match args.current_rate {
        Some(rate) => rate,
        None => last.get("close").ok_or_else(|| MohoError::Data {
            reason: "latest close is undefined".to_string(),
        })?,
    };
    let best_rate = args.best_rate.unwrap_or(match side {
        TradeSide::Long => args.entry_rate.max(current_rate),
        TradeSide::Short => args.entry_rate.min(current_rate),
    });

    Ok(OpenPosition {
        pair: pair.to_string(),
        side,
        entry_rate: args.entry_rate,
        entry_time,
        best_rate,
        current_rate,
        current_time: last.timestamp() + strategy.settings.timeframe.duration(),
        reported_profit: args.current_profit,
    })
}

/// Write an exit assessment as `field,value` CSV rows.
pub fn write_assessment<W: Write>(
    writer: W,
    position: &OpenPosition,
    assessment: &ExitAssessment,
) -> Result<(), MohoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let rows = [
        ("pair", position.pair.clone()),
        ("side", position.side.to_string()),
        ("profit", format!("{:.6}", assessment.profit)),
        ("max_profit", format!("{:.6}", position.max_profit())),
        ("trade_minutes", position.trade_minutes().to_string()),
        (
            "custom_exit",
            assessment
                .custom_exit
                .map(|d| d.reason.to_string())
                .unwrap_or_default(),
        ),
        (
            "custom_stoploss",
            assessment.custom_stoploss.clone().unwrap_or_default(),
        ),
        ("roi_reached", assessment.roi_reached.to_string()),
        ("exit_signal", assessment.exit_signal.to_string()),
        ("trailing_stop_rate", format_value(assessment.trailing_stop_rate)),
        ("stop_rate", assessment.stop_rate.to_string()),
    ];
    wtr.write_record(["field", "value"]).map_err(csv_error)?;
    for (field, value) in rows {
        wtr.write_record([field, value.as_str()]).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_exit(
    config_path: Option<&Path>,
    data_dir: &Path,
    pair: &str,
    args: &ExitArgs,
) -> Result<(), MohoError> {
    let strategy = build_strategy(config_path)?;
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let analyzed = analyze_pair(&adapter, &strategy, pair)?;
    let position = build_position(pair, args, &analyzed, &strategy)?;
    let assessment = strategy.assess_exit(&analyzed, &position);
    write_assessment(io::stdout().lock(), &position, &assessment)
}

fn run_validate(config_path: &Path) -> Result<(), MohoError> {
    eprintln!("Validating configuration: {}", config_path.display());
    let strategy = build_strategy(Some(config_path))?;

    let changed: Vec<(&str, ParamValue)> = strategy
        .params
        .iter()
        .filter(|(key, value)| {
            param_specs()
                .iter()
                .find(|s| s.key == *key)
                .is_some_and(|s| s.default != *value)
        })
        .collect();

    eprintln!(
        "  timeframe: {} / {}",
        strategy.settings.timeframe, strategy.settings.informative_timeframe
    );
    eprintln!("  startup candles: {}", strategy.settings.startup_candle_count);
    eprintln!("  minimal ROI: {}", strategy.settings.minimal_roi);
    eprintln!("  parameters overridden: {}", changed.len());
    for (key, value) in &changed {
        eprintln!("    {} = {}", key, value);
    }
    eprintln!("Configuration is valid.");
    Ok(())
}

/// Write the parameter table as CSV, optionally limited to one space.
pub fn write_params<W: Write>(writer: W, space: Option<Space>) -> Result<(), MohoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["key", "space", "kind", "default", "min", "max"])
        .map_err(csv_error)?;
    for spec in param_specs()
        .iter()
        .filter(|s| space.is_none_or(|sp| s.space == sp))
    {
        let (min, max) = spec.accepted_range();
        let (default, min, max) = (spec.default.to_string(), min.to_string(), max.to_string());
        wtr.write_record([
            spec.key.as_str(),
            spec.space.section(),
            spec.default.kind(),
            default.as_str(),
            min.as_str(),
            max.as_str(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_params(space: Option<&str>) -> Result<(), MohoError> {
    let space = match space.map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("buy") => Some(Space::Buy),
        Some("sell") => Some(Space::Sell),
        Some(other) => {
            return Err(MohoError::InvalidParameter {
                key: "space".to_string(),
                reason: format!("'{}' is not buy or sell", other),
            });
        }
    };
    write_params(io::stdout().lock(), space)
}
