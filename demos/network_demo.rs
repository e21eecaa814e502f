use env_logger::Env;
use log::{info, warn};
use persistence_network::storage::DataSourceFactory;
use persistence_network::{ConnectionOptions, PersistenceNetwork};
use std::env;
use std::fs;
use std::path::PathBuf;

const RULES: &str = "\
# player profiles live in one JSON document
$profiles=json://profiles.json
players.*.profile=$profiles
# everything else about a player goes to a file per player
players.*.**=file://players/$1.properties
# session data is not worth keeping
session.**=mem://session
stats.**=sqlite://stats.sqlite3
";

fn main() {
    // Initialize logger (RUST_LOG can override; default to info)
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();

    // Choose an output directory for the backends
    let out_dir: PathBuf = env::var("PERSISTENCE_DEMO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::current_dir()
                .expect("cwd")
                .join("target")
                .join("network_demo")
        });
    fs::create_dir_all(&out_dir).expect("create output dir");
    info!("Backends write under {}", out_dir.display());
    info!("Registered schemes: {:?}", DataSourceFactory::global().schemes());

    let network = PersistenceNetwork::new(
        RULES,
        "file://default.properties",
        ConnectionOptions::new(&out_dir),
    )
    .expect("build network");

    for rule in network.filter().rules() {
        info!("rule: {}", rule);
    }

    network
        .set("players.alice.profile", "{\"name\":\"Alice\"}")
        .expect("set profile");
    network.set("players.alice.level", "12").expect("set level");
    network.set("players.bob.level", "3").expect("set level");
    network.set("session.token", "abc123").expect("set token");
    network.set("stats.logins", "2").expect("set stat");
    network.set("motd", "welcome").expect("set motd");

    for key in ["players.alice.level", "session.token", "stats.logins", "motd"] {
        info!(
            "{} -> {} (from {})",
            key,
            network.get(key).expect("get").unwrap_or_default(),
            network.resolve(key).expect("resolve")
        );
    }

    match network.get_namespace("players.alice") {
        Ok(values) => {
            for (key, value) in values {
                info!("players.alice namespace: {} = {}", key, value);
            }
        }
        Err(e) => warn!("Namespace query failed: {}", e),
    }

    // `players.*.**` captures a segment the namespace `players` leaves open.
    if let Err(e) = network.get_namespace("players") {
        warn!("Expected failure querying all players: {}", e);
    }

    network.clear_key("session.token").expect("clear token");
    info!(
        "session.token present after clear: {}",
        network.has_key("session.token").expect("has_key")
    );
    info!("{} connection(s) opened", network.open_connections());
}
