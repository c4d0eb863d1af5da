use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tradecost_core::Side;
use tradecost_engine::{CostQuery, EngineConfig, load_config};
use tradecost_runner::{ReplayConfig, ReplaySession, RunnerError};

fn print_help() {
    eprintln!(
        r#"Trade-Cost Replay - feed recorded L2 snapshots through the cost engine

USAGE:
    replay [OPTIONS] [FILE]

Reads newline-delimited JSON snapshots from FILE, or stdin when omitted.

OPTIONS:
    --config <PATH>       Load engine configuration from JSON file
    --quantity <QTY>      Order size for sampled queries (default: 1.0)
    --side <buy|sell>     Order side (default: buy)
    --vol <SENS>          Volatility sensitivity (default: 0.5)
    --tier <1-3>          Fee tier (default: 1)
    --interval-ms <MS>    Sampling period (default: 100)
    --symbol <NAME>       Symbol for payloads without one (default: DEFAULT)
    --help                Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG              Log level filter

EXAMPLES:
    # Replay a capture with defaults
    replay book.jsonl

    # Sell 5 units at tier 3, sampling every 250ms
    replay --side sell --quantity 5 --tier 3 --interval-ms 250 book.jsonl

    # Stream from another process
    capture | replay --config engine.json
"#
    );
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, RunnerError> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| RunnerError::Usage(format!("{} requires a value", flag)))
}

fn number<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, RunnerError> {
    raw.parse()
        .map_err(|_| RunnerError::Usage(format!("{} got an invalid value: {}", flag, raw)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut input: Option<String> = None;
    let mut quantity = 1.0;
    let mut side = Side::Buy;
    let mut sensitivity = 0.5;
    let mut tier = 1u8;
    let mut interval_ms = 100u64;
    let mut symbol: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                config_path = Some(value(&args, i, flag)?.to_string());
            }
            "--quantity" | "-q" => {
                i += 1;
                quantity = number(value(&args, i, flag)?, flag)?;
            }
            "--side" => {
                i += 1;
                side = value(&args, i, flag)?.parse().map_err(RunnerError::Usage)?;
            }
            "--vol" => {
                i += 1;
                sensitivity = number(value(&args, i, flag)?, flag)?;
            }
            "--tier" => {
                i += 1;
                tier = number(value(&args, i, flag)?, flag)?;
            }
            "--interval-ms" => {
                i += 1;
                interval_ms = number(value(&args, i, flag)?, flag)?;
            }
            "--symbol" => {
                i += 1;
                symbol = Some(value(&args, i, flag)?.to_string());
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            path => input = Some(path.to_string()),
        }
        i += 1;
    }

    let engine = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            load_config(&path)?
        }
        None => {
            log::info!("Using default configuration");
            EngineConfig::default()
        }
    };

    let mut config = ReplayConfig {
        engine,
        query: CostQuery::new(quantity, side)
            .with_volatility_sensitivity(sensitivity)
            .with_fee_tier(tier),
        query_interval: Duration::from_millis(interval_ms.max(1)),
        ..Default::default()
    };
    if let Some(symbol) = symbol {
        config.default_symbol = symbol;
    }

    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => {
            log::info!("Replaying {}", path);
            Box::new(BufReader::new(File::open(path)?))
        }
        None => {
            log::info!("Replaying stdin");
            Box::new(BufReader::new(std::io::stdin()))
        }
    };

    let session = ReplaySession::new(config)?;
    let report = session.run(reader).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
