//! Clap command tree for the `dockv` binary.

use clap::{Arg, ArgAction, Command};

/// Build the full command tree.
pub fn build_cli() -> Command {
    Command::new("dockv")
        .about("Talk to a document key-value store through the asynchronous client")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("PATH")
                .help("TOML configuration file (defaults to $DOCKV_CONFIG)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .global(true)
                .help("Backend host"),
        )
        .arg(
            Arg::new("bucket")
                .long("bucket")
                .short('b')
                .global(true)
                .help("Bucket to open"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .short('u')
                .global(true)
                .help("User name (empty for anonymous access)"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .short('p')
                .global(true)
                .help("Password"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log client activity to stderr"),
        )
        .subcommand(
            Command::new("test-db")
                .about("Read \"abc\", then store 54 under it, printing each result"),
        )
        .subcommand(
            Command::new("get")
                .about("Fetch a document")
                .arg(Arg::new("key").required(true))
                .arg(
                    Arg::new("lock")
                        .long("lock")
                        .value_name("SECS")
                        .help("Also lock the key for SECS seconds"),
                ),
        )
        .subcommand(
            Command::new("put")
                .about("Store a JSON document")
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("document").required(true).help("Document as JSON"))
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .default_value("set")
                        .help("Write policy: add, replace or set"),
                ),
        )
}
