use clap::{Parser, Subcommand};
use log::{error, info};
use persistence_network::configuration::config::NetworkConfig;
use persistence_network::error_handling::types::{ConfigError, NetworkError};
use persistence_network::network::PersistenceNetwork;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "persistence-network")]
#[command(version)]
#[command(about = "Route dot-separated keys to many storage backends as one key-value store")]
struct Args {
    /// TOML network configuration
    #[arg(long, env = "PERSISTENCE_CONFIG", conflicts_with = "filters")]
    config: Option<PathBuf>,

    /// Filter rule file, used when no --config is given
    #[arg(long)]
    filters: Option<PathBuf>,

    /// Connection for keys no filter rule matches, used when no --config is given
    #[arg(long, default_value = "file://persistence.db")]
    default_uri: String,

    /// Log routing decisions
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the value of a key
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Exit with status 0 if the key is set, 1 otherwise
    Has { key: String },
    /// Remove a key
    Clear { key: String },
    /// Print every key and value under a namespace as JSON
    Namespace { prefix: String },
    /// Print the connection a key routes to
    Resolve { key: String },
    /// Print the effective filter rules
    Rules,
}

fn load_config(args: &Args) -> Result<NetworkConfig, ConfigError> {
    match &args.config {
        Some(path) => NetworkConfig::from_file(path),
        None => {
            let mut config = NetworkConfig::new(&args.default_uri);
            config.filters = args.filters.clone();
            config.apply_env_overrides();
            Ok(config)
        }
    }
}

/// Runs one command and returns the process exit code.
fn run(network: &PersistenceNetwork, command: Command) -> Result<i32, NetworkError> {
    match command {
        Command::Get { key } => match network.get(key.as_str())? {
            Some(value) => println!("{}", value),
            None => return Ok(1),
        },
        Command::Set { key, value } => {
            let changed = network.set(key.as_str(), &value)?;
            info!("{} {}", key, if changed { "updated" } else { "unchanged" });
        }
        Command::Has { key } => {
            if !network.has_key(key.as_str())? {
                return Ok(1);
            }
        }
        Command::Clear { key } => network.clear_key(key.as_str())?,
        Command::Namespace { prefix } => {
            let values: serde_json::Map<String, serde_json::Value> = network
                .get_namespace(prefix.as_str())?
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                .collect();
            let text = serde_json::to_string_pretty(&values)
                .unwrap_or_else(|_| String::from("{}"));
            println!("{}", text);
        }
        Command::Resolve { key } => println!("{}", network.resolve(key.as_str())?),
        Command::Rules => {
            for rule in network.filter().rules() {
                println!("{}", rule);
            }
        }
    }
    Ok(0)
}

fn main() {
    let args = Args::parse();

    // https://docs.rs/env_logger/latest/env_logger/
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_target(false)
        .init();

    let config = load_config(&args).unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(2);
    });

    let network = PersistenceNetwork::from_config(&config).unwrap_or_else(|e| {
        error!("Unable to build the persistence network: {}", e);
        std::process::exit(2);
    });

    let code = run(&network, args.command).unwrap_or_else(|e| {
        error!("{}", e);
        2
    });
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence_network::configuration::types::ConnectionOptions;

    #[test]
    fn test_parse_set_command() {
        let args = Args::try_parse_from([
            "persistence-network",
            "--filters",
            "rules.ini",
            "--default-uri",
            "mem://d",
            "set",
            "a.b",
            "value",
        ])
        .unwrap();
        assert_eq!(args.filters, Some(PathBuf::from("rules.ini")));
        assert_eq!(args.default_uri, "mem://d");
        assert_eq!(
            args.command,
            Command::Set {
                key: "a.b".into(),
                value: "value".into()
            }
        );
    }

    #[test]
    fn test_config_conflicts_with_filters() {
        let parsed = Args::try_parse_from([
            "persistence-network",
            "--config",
            "net.toml",
            "--filters",
            "rules.ini",
            "rules",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_run_commands() {
        let network =
            PersistenceNetwork::new("a.**=mem://a", "mem://d", ConnectionOptions::new(".")).unwrap();
        assert_eq!(run(&network, Command::Get { key: "a.x".into() }).unwrap(), 1);
        assert_eq!(
            run(&network, Command::Set { key: "a.x".into(), value: "1".into() }).unwrap(),
            0
        );
        assert_eq!(run(&network, Command::Has { key: "a.x".into() }).unwrap(), 0);
        assert_eq!(run(&network, Command::Clear { key: "a.x".into() }).unwrap(), 0);
        assert_eq!(run(&network, Command::Has { key: "a.x".into() }).unwrap(), 1);
        assert!(run(&network, Command::Get { key: "a..x".into() }).is_err());
    }
}
