//! dockv CLI: drive the asynchronous client from the command line.
//!
//! `dockv test-db` reads "abc" then stores 54 under it. `get` and `put` do a
//! single request. Every result is printed to stderr as it completes:
//! - `RESULT: <json>` for a fetched document (`null` when absent)
//! - `DONE` for a successful store
//! - `ERROR` when the write policy could not be honoured

mod commands;
mod parse;

use std::process;
use std::time::Duration;

use dockv_client::{Callback, DbClient, StorePolicy, Value};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use parse::{matches_to_action, matches_to_config, CliAction};

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let exit_code = match run(&matches) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &clap::ArgMatches) -> Result<(), String> {
    let action = matches_to_action(matches)?;
    let config = matches_to_config(matches)?;
    tracing::debug!(?action, host = %config.host, bucket = %config.bucket, "running command");
    let client = DbClient::create(config).map_err(|e| format!("Failed to connect: {}", e))?;

    match action {
        CliAction::TestDb => {
            client.get("abc", print_result).map_err(|e| e.to_string())?;
            drain(&client)?;
            put(&client, "abc", Value::Int(54), StorePolicy::SetUnconditionally)?;
            drain(&client)
        }
        CliAction::Get { key, lock } => {
            client
                .get_and_lock(key, lock, print_result)
                .map_err(|e| e.to_string())?;
            drain(&client)
        }
        CliAction::Put {
            key,
            document,
            policy,
        } => {
            put(&client, &key, document, policy)?;
            drain(&client)
        }
    }
}

fn put(client: &DbClient, key: &str, document: Value, policy: StorePolicy) -> Result<(), String> {
    let on_conflict: Callback = Box::new(|| eprintln!("ERROR"));
    client
        .put(key, document, || eprintln!("DONE"), Some(on_conflict), policy)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn drain(client: &DbClient) -> Result<(), String> {
    client
        .process(Duration::ZERO)
        .map(|_| ())
        .map_err(|e| format!("Database error: {}", e))
}

fn print_result(value: Value) {
    eprintln!("RESULT: {}", format_result(&value));
}

fn format_result(value: &Value) -> String {
    dockv_wire::encode_document(value)
}
