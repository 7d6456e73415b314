//! CLI integration tests for the signals, exit, validate and params commands.
//!
//! Tests cover:
//! - Strategy loading from INI files on disk (build_strategy)
//! - Candle loading through the CSV adapter, with and without informative files
//! - Signal CSV output (write_signals)
//! - Open-position snapshots and exit assessments (build_position, write_assessment)
//! - Parameter listing (write_params)
//! - Argument parsing

mod common;

use clap::Parser;
use common::*;
use moho::adapters::csv_adapter::{CsvAdapter, TIMESTAMP_FORMAT};
use moho::cli::{self, Cli, Command, ExitArgs};
use moho::domain::error::MohoError;
use moho::domain::params::Space;
use moho::domain::strategy::Strategy;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_candles(dir: &Path, name: &str, candles: &[Candle]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.timestamp.format(TIMESTAMP_FORMAT),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        ));
    }
    std::fs::write(dir.join(name), content).unwrap();
}

fn data_dir(with_informative: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_candles(dir.path(), "BTC_USDT_5m.csv", &wave_candles(400, 5));
    if with_informative {
        write_candles(dir.path(), "BTC_USDT_1h.csv", &wave_candles(40, 60));
    }
    dir
}

fn output_lines(bytes: Vec<u8>) -> Vec<String> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

const VALID_INI: &str = r#"
[strategy]
timeframe = 5m
informative_timeframe = 1h
startup_candle_count = 250
stoploss = -0.2
minimal_roi = 0:0.1, 20:0.05

[buy]
buy_rsi_1 = 30
buy_condition_3_enable = false

[sell]
sell_custom_profit_4 = 0.4

[entry_rules]
group_1 = AND(BELOW(close, sma_offset_buy), BELOW(rsi, $buy_rsi_1))
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_strategy_from_file() {
        let file = write_temp_ini(VALID_INI);
        let strategy = cli::build_strategy(Some(file.path())).unwrap();

        assert_eq!(strategy.settings.startup_candle_count, 250);
        assert_eq!(strategy.settings.stoploss, -0.2);
        assert_eq!(strategy.settings.minimal_roi.to_string(), "0:0.1,20:0.05");
        assert_eq!(strategy.params.decimal("buy_rsi_1").unwrap(), 30.0);
        assert_eq!(strategy.params.decimal("sell_custom_profit_4").unwrap(), 0.4);

        let entry = strategy.rules.groups(moho::domain::signal::Side::Entry);
        assert!(!entry[2].enabled);
        assert!(!entry[0].expression.contains("mfi"));
    }

    #[test]
    fn build_strategy_defaults_without_file() {
        let strategy = cli::build_strategy(None).unwrap();
        assert_eq!(strategy, Strategy::defaults().unwrap());
    }

    #[test]
    fn missing_file_fails() {
        let result = cli::build_strategy(Some(Path::new("/nonexistent/moho.ini")));
        assert!(matches!(result, Err(MohoError::ConfigParse { .. })));
    }

    #[test]
    fn unknown_parameter_fails() {
        let file = write_temp_ini("[buy]\nbuy_rsi_9 = 30\n");
        let result = cli::build_strategy(Some(file.path()));
        assert!(matches!(result, Err(MohoError::UnknownParameter { .. })));
    }

    #[test]
    fn out_of_range_parameter_fails() {
        let file = write_temp_ini("[buy]\nbuy_rsi_1 = 95\n");
        let result = cli::build_strategy(Some(file.path()));
        assert!(matches!(result, Err(MohoError::InvalidParameter { .. })));
    }

    #[test]
    fn broken_rule_fails() {
        let file = write_temp_ini("[exit_rules]\ngroup_2 = ABOVE(close\n");
        let result = cli::build_strategy(Some(file.path()));
        assert!(matches!(result, Err(MohoError::RuleParse(_))));
    }

    #[test]
    fn rule_reading_unknown_column_fails() {
        let file = write_temp_ini("[exit_rules]\ngroup_2 = ABOVE(close, no_such_column)\n");
        let result = cli::build_strategy(Some(file.path()));
        assert!(matches!(result, Err(MohoError::RuleInvalid { .. })));
    }
}

mod candle_loading {
    use super::*;

    #[test]
    fn reads_both_timeframes() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();

        let (primary, informative) = cli::load_candles(&adapter, &strategy, "BTC/USDT").unwrap();
        assert_eq!(primary.len(), 400);
        assert_eq!(informative.len(), 40);
    }

    #[test]
    fn resamples_when_informative_file_is_absent() {
        let dir = data_dir(false);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();

        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();
        assert_eq!(analyzed.len(), 400);
        assert!(analyzed.frame().value("rsi_1h", 399).is_some());
    }

    #[test]
    fn unknown_pair_fails() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();

        let result = cli::analyze_pair(&adapter, &strategy, "ETH/USDT");
        assert!(matches!(result, Err(MohoError::Data { .. })));
    }
}

mod signal_output {
    use super::*;

    const HEADER: &str =
        "timestamp,open,high,low,close,volume,entry,entry_tag,entry_groups,exit,exit_tag,exit_groups";

    #[test]
    fn writes_one_row_per_candle() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();

        let mut out = Vec::new();
        cli::write_signals(&mut out, &analyzed, &[], false).unwrap();
        let lines = output_lines(out);

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 401);
        assert!(lines[1].starts_with("2024-01-01 00:00:00,"));
        // startup rows carry no signal
        assert!(lines[1].ends_with(",0,,,0,,"));
    }

    #[test]
    fn extra_columns_are_appended() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();

        let mut out = Vec::new();
        let columns = vec!["rsi".to_string(), "rsi_1h".to_string()];
        cli::write_signals(&mut out, &analyzed, &columns, false).unwrap();
        let lines = output_lines(out);

        assert_eq!(lines[0], format!("{},rsi,rsi_1h", HEADER));
        // leading rows have no RSI yet
        assert!(lines[1].ends_with(",,"));
        let last: Vec<&str> = lines[400].split(',').collect();
        assert!(last[12].parse::<f64>().is_ok());
        assert!(last[13].parse::<f64>().is_ok());
    }

    #[test]
    fn only_signals_filters_quiet_rows() {
        let dir = TempDir::new().unwrap();
        write_candles(dir.path(), "BTC_USDT_5m.csv", &flat_candles(400, 5, 100.0));
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();

        let mut out = Vec::new();
        cli::write_signals(&mut out, &analyzed, &[], true).unwrap();
        assert_eq!(output_lines(out), vec![HEADER.to_string()]);
    }

    #[test]
    fn entry_rows_list_fired_groups() {
        let dir = TempDir::new().unwrap();
        write_candles(dir.path(), "BTC_USDT_5m.csv", &crash_candles(320, 15));
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();

        let mut out = Vec::new();
        cli::write_signals(&mut out, &analyzed, &[], true).unwrap();
        let lines = output_lines(out);

        assert!(lines.len() > 1);
        for line in &lines[1..] {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields[6], "1");
            let lowest = fields[8].split('|').next().unwrap();
            assert_eq!(fields[7], format!("buy_{}", lowest));
        }
    }
}

mod exit_assessment {
    use super::*;

    fn args(side: &str, entry_rate: f64) -> ExitArgs {
        ExitArgs {
            side: side.to_string(),
            entry_rate,
            entry_time: "2024-01-01 12:00:00".to_string(),
            best_rate: None,
            current_rate: None,
            current_profit: None,
        }
    }

    #[test]
    fn position_snapshot_uses_latest_candle() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();
        let last_close = analyzed.frame().value("close", 399).unwrap();

        let position = cli::build_position("BTC/USDT", &args("long", 90.0), &analyzed, &strategy).unwrap();

        assert_eq!(position.current_rate, last_close);
        assert_eq!(position.best_rate, last_close.max(90.0));
        // 400 five-minute candles end at 33:20 after the start
        assert_eq!(position.current_time, start() + chrono::Duration::minutes(2000));
        assert_eq!(position.trade_minutes(), 2000 - 720);
    }

    #[test]
    fn host_profit_is_carried_into_the_assessment() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();
        let position = cli::build_position(
            "BTC/USDT",
            &ExitArgs {
                current_rate: Some(100.0),
                current_profit: Some(-0.0123),
                ..args("long", 100.0)
            },
            &analyzed,
            &strategy,
        )
        .unwrap();

        assert_eq!(position.reported_profit, Some(-0.0123));
        let assessment = strategy.assess_exit(&analyzed, &position);
        assert_eq!(assessment.profit, -0.0123);
    }

    #[test]
    fn invalid_arguments_fail() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();

        for bad in [
            args("sideways", 90.0),
            args("long", 0.0),
            ExitArgs {
                entry_time: "yesterday".to_string(),
                ..args("long", 90.0)
            },
            ExitArgs {
                current_profit: Some(-1.5),
                ..args("long", 90.0)
            },
        ] {
            let result = cli::build_position("BTC/USDT", &bad, &analyzed, &strategy);
            assert!(matches!(result, Err(MohoError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn assessment_is_written_as_field_value_rows() {
        let dir = data_dir(true);
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let strategy = Strategy::defaults().unwrap();
        let analyzed = cli::analyze_pair(&adapter, &strategy, "BTC/USDT").unwrap();
        let position = cli::build_position(
            "BTC/USDT",
            &ExitArgs {
                current_rate: Some(80.0),
                ..args("long", 100.0)
            },
            &analyzed,
            &strategy,
        )
        .unwrap();
        let assessment = strategy.assess_exit(&analyzed, &position);

        let mut out = Vec::new();
        cli::write_assessment(&mut out, &position, &assessment).unwrap();
        let lines = output_lines(out);

        assert_eq!(lines[0], "field,value");
        assert!(lines.contains(&"pair,BTC/USDT".to_string()));
        assert!(lines.contains(&"side,long".to_string()));
        assert!(lines.contains(&"profit,-0.200000".to_string()));
        assert!(lines.contains(&"roi_reached,false".to_string()));
        assert!(lines.contains(&format!("exit_signal,{}", assessment.exit_signal)));
        assert!(lines.contains(&"stop_rate,85".to_string()));
    }
}

mod params_listing {
    use super::*;

    #[test]
    fn lists_every_parameter() {
        let mut out = Vec::new();
        cli::write_params(&mut out, None).unwrap();
        let lines = output_lines(out);

        assert_eq!(lines[0], "key,space,kind,default,min,max");
        assert!(lines.iter().any(|l| l.starts_with("buy_rsi_1,buy,decimal,36,")));
        assert!(lines.iter().any(|l| l.starts_with("base_nb_candles_sell,sell,int,20,")));
        assert!(lines.iter().any(|l| l == "buy_condition_21_enable,buy,bool,true,0,1"));
        assert!(lines.iter().any(|l| l.starts_with("sell_custom_stoploss_under_rsi_diff_1,sell,")));
    }

    #[test]
    fn filters_by_space() {
        let mut out = Vec::new();
        cli::write_params(&mut out, Some(Space::Sell)).unwrap();
        let lines = output_lines(out);

        assert!(lines.len() > 1);
        assert!(lines[1..].iter().all(|l| l.split(',').nth(1) == Some("sell")));
    }
}

mod argument_parsing {
    use super::*;

    #[test]
    fn signals_command_splits_columns() {
        let cli = Cli::parse_from([
            "moho",
            "signals",
            "--data-dir",
            "data",
            "--pair",
            "BTC/USDT",
            "--columns",
            "rsi,mfi",
            "--only-signals",
        ]);
        match cli.command {
            Command::Signals {
                config,
                pair,
                columns,
                only_signals,
                ..
            } => {
                assert!(config.is_none());
                assert_eq!(pair, "BTC/USDT");
                assert_eq!(columns, vec!["rsi", "mfi"]);
                assert!(only_signals);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn exit_command_defaults_to_long() {
        let cli = Cli::parse_from([
            "moho",
            "exit",
            "-d",
            "data",
            "-p",
            "BTC/USDT",
            "--entry-rate",
            "101.5",
            "--entry-time",
            "2024-01-01 00:00:00",
        ]);
        match cli.command {
            Command::Exit {
                side,
                entry_rate,
                best_rate,
                ..
            } => {
                assert_eq!(side, "long");
                assert_eq!(entry_rate, 101.5);
                assert!(best_rate.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn exit_command_accepts_negative_profit() {
        let cli = Cli::parse_from([
            "moho",
            "exit",
            "-d",
            "data",
            "-p",
            "BTC/USDT",
            "--entry-rate",
            "100",
            "--entry-time",
            "2024-01-01 00:00:00",
            "--current-profit",
            "-0.02",
        ]);
        match cli.command {
            Command::Exit { current_profit, .. } => assert_eq!(current_profit, Some(-0.02)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn validate_requires_config() {
        assert!(Cli::try_parse_from(["moho", "validate"]).is_err());
    }
}
