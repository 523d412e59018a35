//! ArgMatches → configuration and action.

use clap::ArgMatches;
use dockv_client::{ClientConfig, StorePolicy, Value};

/// What the invocation asks for.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Get "abc", then set it to 54
    TestDb,
    /// Fetch one key, optionally locking it
    Get { key: String, lock: u32 },
    /// Store one document
    Put {
        key: String,
        document: Value,
        policy: StorePolicy,
    },
}

/// Build the client configuration: file first, then command-line flags.
///
/// Without `--config` the `DOCKV_CONFIG` / `DOCKV__*` environment is used.
pub fn matches_to_config(matches: &ArgMatches) -> Result<ClientConfig, String> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ClientConfig::load_from_path(path),
        None => ClientConfig::load_from_env(),
    }
    .map_err(|e| format!("Failed to load configuration: {}", e))?;

    if let Some(host) = matches.get_one::<String>("host") {
        config = config.host(host.clone());
    }
    if let Some(bucket) = matches.get_one::<String>("bucket") {
        config = config.bucket(bucket.clone());
    }
    if let Some(user) = matches.get_one::<String>("user") {
        config.user = user.clone();
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = password.clone();
    }
    Ok(config)
}

/// Translate the selected subcommand.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub, m) = matches.subcommand().ok_or("No command given")?;
    match sub {
        "test-db" => Ok(CliAction::TestDb),
        "get" => {
            let key = required(m, "key")?;
            let lock = match m.get_one::<String>("lock") {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid lock duration: {}", raw))?,
                None => 0,
            };
            Ok(CliAction::Get { key, lock })
        }
        "put" => {
            let key = required(m, "key")?;
            let raw = required(m, "document")?;
            let document = dockv_wire::decode_document(&raw)
                .map_err(|e| format!("Invalid document: {}", e))?;
            let policy = required(m, "policy")?
                .parse::<StorePolicy>()
                .map_err(|e| e.to_string())?;
            Ok(CliAction::Put {
                key,
                document,
                policy,
            })
        }
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn required(m: &ArgMatches, name: &str) -> Result<String, String> {
    m.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing argument: {}", name))
}
