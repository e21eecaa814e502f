#[cfg(test)]
mod tests {
    use crate::error_handling::types::ConfigError;
    use crate::filter::{DataSourceFilter, IntoKey, Key};
    use crate::storage::types::ConnectionUri;

    // Helper to parse a key
    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    fn uri(s: &str) -> ConnectionUri {
        ConnectionUri::parse(s).unwrap()
    }

    fn filter(config: &str) -> DataSourceFilter {
        DataSourceFilter::new(config, "file://default.cfg").unwrap()
    }

    #[test]
    fn test_routing_example() {
        let f = filter("a.*.c=file://a.cfg");
        assert_eq!(f.resolve(&key("a.x.c")), uri("file://a.cfg"));
        assert_eq!(f.resolve(&key("z")), uri("file://default.cfg"));
        assert_eq!(f.resolve(&key("a.x")), uri("file://default.cfg"));
    }

    #[test]
    fn test_default_rule_is_appended_once() {
        let f = filter("a.*.c=file://a.cfg");
        assert_eq!(f.rules().len(), 2);
        assert!(f.rules()[1].pattern().is_catch_all());
        assert_eq!(f.rules()[1].line(), None);

        let explicit = filter("**=mem://everything\na=file://a.cfg");
        assert_eq!(explicit.rules().len(), 2);
        assert_eq!(explicit.resolve(&key("a")), uri("mem://everything"));
        assert_eq!(
            explicit.rules().iter().filter(|r| r.pattern().is_catch_all()).count(),
            1
        );
    }

    #[test]
    fn test_first_match_wins_over_specific() {
        let f = filter("a.**=mem://broad\na.b.c=mem://narrow");
        assert_eq!(f.resolve(&key("a.b.c")), uri("mem://broad"));

        let f = filter("a.b.c=mem://narrow\na.**=mem://broad");
        assert_eq!(f.resolve(&key("a.b.c")), uri("mem://narrow"));
        assert_eq!(f.resolve(&key("a.b")), uri("mem://broad"));
        assert_eq!(f.resolve(&key("a")), uri("mem://broad"));
    }

    #[test]
    fn test_resolve_is_total() {
        let f = filter("a=mem://a\nb.*=mem://b");
        for k in ["a", "a.b", "b", "b.c", "b.c.d", "zz.top", "A"] {
            let resolved = f.resolve(&key(k));
            assert!(!resolved.scheme().is_empty());
        }
    }

    #[test]
    fn test_comments_blank_lines_and_whitespace() {
        let f = filter("# comment\n; another\n\n   a.b  =  mem://ab  \n");
        assert_eq!(f.rules().len(), 2);
        assert_eq!(f.resolve(&key("a.b")), uri("mem://ab"));
        assert_eq!(f.rules()[0].line(), Some(4));
    }

    #[test]
    fn test_malformed_configuration_fails() {
        let bad = [
            "a.**.b=mem://x",
            "a..b=mem://x",
            "=mem://x",
            "a.b",
            "a.b=",
            "a.b=not a uri",
            "a.b=weird:mem://x",
            "**=mem://x\n**=mem://y",
        ];
        for config in bad {
            assert!(
                DataSourceFilter::new(config, "mem://default").is_err(),
                "expected failure for {:?}",
                config
            );
        }
        assert!(matches!(
            DataSourceFilter::new("a.b=mem://x", "nope"),
            Err(ConfigError::InvalidUri(_))
        ));
        assert!(matches!(
            DataSourceFilter::new("a\nb.c=mem://x", "mem://d"),
            Err(ConfigError::MalformedRule { line: 1, .. })
        ));
    }

    #[test]
    fn test_captures_are_substituted() {
        let f = filter("worlds.*.spawn=file://worlds/$1.db\nusers.*.**=json://users/$1/$2.json");
        assert_eq!(f.resolve(&key("worlds.nether.spawn")), uri("file://worlds/nether.db"));
        assert_eq!(
            f.resolve(&key("users.bob.a.b")),
            uri("json://users/bob/a.b.json")
        );
        assert_eq!(f.resolve(&key("users.bob")), uri("json://users/bob/.json"));
    }

    #[test]
    fn test_capture_reference_out_of_range() {
        assert!(matches!(
            DataSourceFilter::new("a.*=file://$2.db", "mem://d"),
            Err(ConfigError::BadCaptureReference(_))
        ));
        assert!(matches!(
            DataSourceFilter::new("a.b=file://$1.db", "mem://d"),
            Err(ConfigError::BadCaptureReference(_))
        ));
    }

    #[test]
    fn test_aliases() {
        let f = filter("$main=sqlite://main.sqlite3\nplayers.**=$main\nother=$main");
        assert_eq!(f.resolve(&key("players.alice")), uri("sqlite://main.sqlite3"));
        assert_eq!(f.resolve(&key("other")), uri("sqlite://main.sqlite3"));
        assert!(matches!(
            DataSourceFilter::new("a=$missing", "mem://d"),
            Err(ConfigError::UnknownAlias(_))
        ));
        assert!(matches!(
            DataSourceFilter::new("$1bad=mem://x", "mem://d"),
            Err(ConfigError::MalformedRule { .. })
        ));
    }

    #[test]
    fn test_resolve_all_collects_compatible_targets() {
        let f = filter("a.*.c=file://a.cfg\nb.**=file://b.cfg\na.x=file://ax.cfg");
        assert_eq!(
            f.resolve_all(&key("a")).unwrap(),
            vec![uri("file://a.cfg"), uri("file://ax.cfg"), uri("file://default.cfg")]
        );
        assert_eq!(
            f.resolve_all(&key("a.y")).unwrap(),
            vec![uri("file://a.cfg"), uri("file://default.cfg")]
        );
        assert_eq!(
            f.resolve_all(&key("b.q")).unwrap(),
            vec![uri("file://b.cfg"), uri("file://default.cfg")]
        );
        assert_eq!(f.resolve_all(&key("z")).unwrap(), vec![uri("file://default.cfg")]);
    }

    #[test]
    fn test_resolve_all_deduplicates() {
        let f = DataSourceFilter::new("a.b=mem://same\na.c=mem://same", "mem://same").unwrap();
        assert_eq!(f.resolve_all(&key("a")).unwrap(), vec![uri("mem://same")]);
    }

    #[test]
    fn test_resolve_all_with_bound_capture() {
        let f = filter("worlds.*.**=file://worlds/$1.db");
        assert_eq!(
            f.resolve_all(&key("worlds.nether")).unwrap(),
            vec![uri("file://worlds/nether.db"), uri("file://default.cfg")]
        );
    }

    #[test]
    fn test_resolve_all_with_unbound_capture_fails() {
        let f = filter("worlds.*.**=file://worlds/$1.db");
        let err = f.resolve_all(&key("worlds")).unwrap_err();
        assert_eq!(err.capture, 1);
        assert_eq!(err.namespace, "worlds");

        let f = filter("logs.**=file://logs/$1.db");
        assert!(f.resolve_all(&key("logs.today")).is_err());
        // Rules that cannot hold keys under the prefix are not consulted.
        assert!(f.resolve_all(&key("other")).is_ok());
    }

    #[test]
    fn test_captured_segments_cannot_change_the_path() {
        let f = filter("files.*=file://$1.db\nhome.**=file://homes/$1.db");
        assert_eq!(
            f.resolve(&["files", "/tmp/target"].into_key().unwrap()),
            uri("file://%2Ftmp%2Ftarget.db")
        );
        assert_eq!(
            f.resolve(&["files", "a\\b"].into_key().unwrap()),
            uri("file://a%5Cb.db")
        );
        assert_eq!(
            f.resolve(&["home", "~root", "C:", "50%"].into_key().unwrap()),
            uri("file://homes/%7Eroot.C%3A.50%25.db")
        );
        assert_eq!(f.resolve(&key("files.plain")), uri("file://plain.db"));
    }
}
