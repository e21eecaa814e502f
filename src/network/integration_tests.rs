#[cfg(test)]
mod integration_tests {
    //! End to end tests of the persistence network over real backends.

    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    use crate::configuration::config::NetworkConfig;
    use crate::configuration::types::ConnectionOptions;
    use crate::error_handling::types::{NetworkError, StorageError};
    use crate::filter::key::Key;
    use crate::network::PersistenceNetwork;
    use crate::storage::factory::DataSourceFactory;
    use crate::storage::memory_storage::MemoryStorage;
    use crate::storage::storage_trait::DataSource;
    use crate::storage::types::ConnectionUri;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    fn network(dir: &TempDir, rules: &str, default_uri: &str) -> PersistenceNetwork {
        PersistenceNetwork::new(rules, default_uri, ConnectionOptions::new(dir.path())).unwrap()
    }

    #[test]
    fn test_namespace_aggregation_example() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "a.*.c=file://a.cfg", "file://default.cfg");

        assert_eq!(net.resolve(["a", "x", "c"]).unwrap().to_string(), "file://a.cfg");
        assert_eq!(net.resolve(["z"]).unwrap().to_string(), "file://default.cfg");

        assert!(net.set(["a", "x", "c"], "v1").unwrap());
        let values = net.get_namespace(["a"]).unwrap();
        assert_eq!(values.get(&key("a.x.c")), Some(&"v1".to_string()));

        let stored = fs::read_to_string(dir.path().join("a.cfg")).unwrap();
        assert!(stored.contains("a.x.c=v1"));
        let default = fs::read_to_string(dir.path().join("default.cfg")).unwrap();
        assert!(!default.contains("a.x.c"));
    }

    #[test]
    fn test_round_trip_and_change_detection() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "", "mem://default");
        assert!(net.set("k.one", "v").unwrap());
        assert_eq!(net.get("k.one").unwrap(), Some("v".to_string()));
        assert!(!net.set("k.one", "v").unwrap());
        assert!(net.set("k.one", "v2").unwrap());
        assert_eq!(net.get(vec!["k", "one"]).unwrap(), Some("v2".to_string()));
    }

    #[test]
    fn test_clear_key_then_has_key() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "data.**=json://data.json", "mem://default");
        net.set("data.x", "1").unwrap();
        assert!(net.has_key("data.x").unwrap());
        net.clear_key("data.x").unwrap();
        assert!(!net.has_key("data.x").unwrap());
        assert_eq!(net.get("data.x").unwrap(), None);
        net.clear_key("data.never.set").unwrap();
    }

    #[test]
    fn test_connection_is_reused() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "a.**=mem://a\nb.**=mem://b", "mem://default");
        net.set("a.one", "1").unwrap();
        // A fresh MemoryStorage would have forgotten the value.
        assert_eq!(net.get("a.one").unwrap(), Some("1".to_string()));
        net.set("a.two", "2").unwrap();
        assert_eq!(net.open_connections(), 1);
        net.get("b.one").unwrap();
        assert_eq!(net.open_connections(), 2);
    }

    static OPENED: AtomicUsize = AtomicUsize::new(0);

    fn counted(uri: &ConnectionUri, _: &ConnectionOptions) -> Result<Box<dyn DataSource>, StorageError> {
        OPENED.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStorage::new(uri.clone())))
    }

    #[test]
    fn test_one_instance_per_uri_under_concurrency() {
        let dir = TempDir::new().unwrap();
        let factory = DataSourceFactory::builder().register("counted", counted).build();
        let net = Arc::new(
            network(&dir, "shared.**=counted://shared", "counted://default").with_factory(factory),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let net = Arc::clone(&net);
                thread::spawn(move || {
                    for j in 0..25 {
                        net.set(format!("shared.t{}.k{}", i, j), "x").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(OPENED.load(Ordering::SeqCst), 1);
        assert_eq!(net.get_namespace("shared").unwrap().len(), 8 * 25);
        assert_eq!(net.get_namespace("shared.t3").unwrap().len(), 25);
        // the namespace query also consults the default connection
        assert_eq!(OPENED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_namespace_reads_through_owner_only() {
        let dir = TempDir::new().unwrap();
        // Left over from an earlier configuration that routed a.* to the default file.
        fs::write(
            dir.path().join("default.cfg"),
            "a.x.c=stale\na.y.c=orphan\na.x=plain\n",
        )
        .unwrap();
        let net = network(&dir, "a.*.c=file://a.cfg", "file://default.cfg");
        net.set("a.x.c", "fresh").unwrap();

        let values = net.get_namespace("a").unwrap();
        let mut expected = BTreeMap::new();
        expected.insert(key("a.x"), "plain".to_string());
        expected.insert(key("a.x.c"), "fresh".to_string());
        assert_eq!(values, expected);
    }

    #[test]
    fn test_namespace_spans_backends() {
        let dir = TempDir::new().unwrap();
        let net = network(
            &dir,
            "users.*.profile=json://profiles.json\nusers.**=sqlite://users.sqlite3",
            "mem://default",
        );
        net.set("users.alice.profile", "p1").unwrap();
        net.set("users.alice.score", "10").unwrap();
        net.set("users.bob.profile", "p2").unwrap();
        net.set("teams.red", "r").unwrap();

        let values = net.get_namespace("users").unwrap();
        let keys: Vec<String> = values.keys().map(ToString::to_string).collect();
        assert_eq!(
            keys,
            vec!["users.alice.profile", "users.alice.score", "users.bob.profile"]
        );
        assert_eq!(net.get_namespace("users.alice").unwrap().len(), 2);
        assert!(net.get_namespace("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_readonly_backend_rejects_writes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("fixed.db"), "config.motd=hello\n").unwrap();
        let net = network(&dir, "config.**=readonly:file://fixed.db", "mem://default");
        assert_eq!(net.get("config.motd").unwrap(), Some("hello".to_string()));
        let err = net.set("config.motd", "bye").unwrap_err();
        assert!(err.is_read_only());
        assert!(net.clear_key("config.motd").unwrap_err().is_read_only());
        assert!(net.set("other", "fine").unwrap());
    }

    #[test]
    fn test_backend_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "x.**=yml://x.yml", "mem://default");
        assert!(matches!(
            net.get("x.a"),
            Err(NetworkError::Storage(StorageError::UnknownScheme(_)))
        ));
        assert_eq!(net.open_connections(), 0);
        assert!(net.get("y").unwrap().is_none());
    }

    #[test]
    fn test_unresolved_capture_propagates() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "worlds.*.**=file://worlds/$1.db", "mem://default");
        net.set("worlds.nether.spawn", "0,64,0").unwrap();
        assert!(dir.path().join("worlds/nether.db").exists());
        assert!(matches!(
            net.get_namespace("worlds"),
            Err(NetworkError::UnresolvedCapture(_))
        ));
        let nether = net.get_namespace("worlds.nether").unwrap();
        assert_eq!(nether.get(&key("worlds.nether.spawn")), Some(&"0,64,0".to_string()));
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "", "mem://default");
        assert!(matches!(net.get(""), Err(NetworkError::InvalidKey(_))));
        assert!(matches!(net.set("a..b", "v"), Err(NetworkError::InvalidKey(_))));
        assert!(matches!(net.get_namespace(Vec::<String>::new()), Err(NetworkError::InvalidKey(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let rules = dir.path().join("persistence.ini");
        fs::write(&rules, "# routing\nlogs.**=mem://logs\n").unwrap();
        let net = PersistenceNetwork::from_file(&rules, "mem://default", ConnectionOptions::new(dir.path())).unwrap();
        assert_eq!(net.resolve("logs.today").unwrap().to_string(), "mem://logs");
        assert!(PersistenceNetwork::from_file(
            dir.path().join("missing.ini"),
            "mem://default",
            ConnectionOptions::new(dir.path())
        )
        .is_err());
    }

    #[test]
    fn test_network_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PersistenceNetwork>();
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = NetworkConfig::new("json://default.json");
        config.filter_rules = Some("cache.**=mem://cache".to_string());
        config.working_directory = Some(dir.path().to_path_buf());

        let net = PersistenceNetwork::from_config(&config).unwrap();
        assert_eq!(net.resolve("cache.page").unwrap().to_string(), "mem://cache");
        net.set("name", "demo").unwrap();
        assert!(dir.path().join("default.json").exists());
    }

    #[test]
    fn test_failed_write_does_not_leave_phantom_value() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "a.**=file://sub/a.cfg", "mem://default");
        net.set("a.one", "1").unwrap();
        fs::remove_dir_all(dir.path().join("sub")).unwrap();

        assert!(net.set("a.two", "2").is_err());
        assert_eq!(net.get("a.two").unwrap(), None);

        fs::create_dir_all(dir.path().join("sub")).unwrap();
        assert!(net.set("a.two", "2").unwrap());
        let fresh = network(&dir, "a.**=file://sub/a.cfg", "mem://default");
        assert_eq!(fresh.get("a.two").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_captured_segment_stays_in_working_directory() {
        let dir = TempDir::new().unwrap();
        let net = network(&dir, "files.*=file://$1.db", "mem://default");
        let segment = "/persistence-network-escape-check";

        assert!(net.set(["files", segment], "x").unwrap());
        assert!(!std::path::Path::new("/persistence-network-escape-check.db").exists());
        let written: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written, vec!["%2Fpersistence-network-escape-check.db".to_string()]);
        assert_eq!(net.get(["files", segment]).unwrap(), Some("x".to_string()));
    }
}
