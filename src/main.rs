use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use courier_dispatch::{CompleteRequest, Config, DispatchError, DispatchService, SqliteStore};

const USAGE: &str = "Usage:
  courier-dispatch import-couriers <file.json>
  courier-dispatch import-orders <file.json>
  courier-dispatch assign <courier_id>
  courier-dispatch complete <courier_id> <order_id> <complete_time>
  courier-dispatch info <courier_id>";

fn main() -> Result<()> {
    let config = Config::from_env()?;
    setup_tracing(&config);

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {:?}", config.db_path))?;
    let mut service = DispatchService::new(&mut store);

    let outcome = match (command.as_str(), &args[2..]) {
        ("import-couriers", [file]) => {
            let records = load_records(Path::new(file))?;
            service.import_couriers(&records).map(|ids| {
                println!("✓ Imported {} couriers: {:?}", ids.len(), ids);
            })
        }
        ("import-orders", [file]) => {
            let records = load_records(Path::new(file))?;
            service.import_orders(&records).map(|ids| {
                println!("✓ Imported {} orders: {:?}", ids.len(), ids);
            })
        }
        ("assign", [courier_id]) => {
            let courier_id = parse_id(courier_id)?;
            service
                .assign_orders(courier_id)
                .and_then(|result| print_json(&result))
        }
        ("complete", [courier_id, order_id, complete_time]) => {
            let request = CompleteRequest {
                courier_id: Some(parse_id(courier_id)?),
                order_id: Some(parse_id(order_id)?),
                complete_time: Some(complete_time.clone()),
            };
            service.complete_order(&request).map(|order_id| {
                println!("✓ Order {} completed", order_id);
            })
        }
        ("info", [courier_id]) => {
            let courier_id = parse_id(courier_id)?;
            service
                .courier_info(courier_id)
                .and_then(|info| print_json(&info))
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(err) if !err.is_client_error() => Err(err.into()),
        Err(err) => {
            eprintln!("❌ {}", err);
            if let DispatchError::Validation { invalid, .. } = &err {
                eprintln!("   Rejected ids: {:?}", invalid);
            }
            std::process::exit(1);
        }
    }
}

fn setup_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Accepts either `{"data": [...]}` or a bare array
fn load_records(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let json: Value = serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {:?}", path))?;

    match json {
        Value::Array(records) => Ok(records),
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => bail!("{:?} has no data array", path),
        },
        _ => bail!("{:?} must hold a JSON array or object", path),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse().with_context(|| format!("Invalid id: {}", raw))
}

fn print_json<T: serde::Serialize>(value: &T) -> courier_dispatch::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(anyhow::Error::from)?;
    println!("{}", text);
    Ok(())
}
