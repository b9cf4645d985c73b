//! Unit tests for the store module.

use std::{collections::HashMap, fs, time::Duration};

use futures::StreamExt;
use tempfile::TempDir;
use tokio::time::timeout;

use crate::{
    core::StorageError,
    store::{FileStore, FileWatcher, KeyValueStore, MemoryStore, StoredValue, ValueKind},
};

const WAIT: Duration = Duration::from_secs(1);
const QUIET: Duration = Duration::from_millis(50);

mod values {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(StoredValue::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(StoredValue::Integer(1).kind(), ValueKind::Integer);
        assert_eq!(StoredValue::Double(1.5).kind(), ValueKind::Double);
        assert_eq!(StoredValue::Data(vec![1]).kind(), ValueKind::Data);
        assert_eq!(StoredValue::String("x".into()).kind(), ValueKind::String);
        assert_eq!(StoredValue::Url("https://a.b".into()).kind(), ValueKind::Url);
    }

    #[test]
    fn parses_text_per_kind() {
        assert_eq!(
            StoredValue::parse(ValueKind::Bool, "yes").unwrap(),
            StoredValue::Bool(true)
        );
        assert_eq!(
            StoredValue::parse(ValueKind::Integer, "-12").unwrap(),
            StoredValue::Integer(-12)
        );
        assert_eq!(
            StoredValue::parse(ValueKind::Double, "2.5").unwrap(),
            StoredValue::Double(2.5)
        );
        assert_eq!(
            StoredValue::parse(ValueKind::Data, "00ff").unwrap(),
            StoredValue::Data(vec![0x00, 0xff])
        );
        assert_eq!(
            StoredValue::parse(ValueKind::String, "hello world").unwrap(),
            StoredValue::String("hello world".into())
        );
        assert_eq!(
            StoredValue::parse(ValueKind::Url, "file:///tmp/a").unwrap(),
            StoredValue::Url("file:///tmp/a".into())
        );
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(matches!(
            StoredValue::parse(ValueKind::Integer, "twelve"),
            Err(StorageError::InvalidValue { .. })
        ));
        assert!(StoredValue::parse(ValueKind::Bool, "maybe").is_err());
        assert!(StoredValue::parse(ValueKind::Data, "zz").is_err());
        assert!(StoredValue::parse(ValueKind::Url, "no scheme here").is_err());
        assert!(StoredValue::parse(ValueKind::Url, "1http://x").is_err());
    }

    #[test]
    fn kind_names_round_trip_through_from_str() {
        for kind in [
            ValueKind::Bool,
            ValueKind::Integer,
            ValueKind::Double,
            ValueKind::Data,
            ValueKind::String,
            ValueKind::Url,
        ] {
            assert_eq!(kind.to_string().parse::<ValueKind>().unwrap(), kind);
        }
        assert!("matrix".parse::<ValueKind>().is_err());
    }

    #[test]
    fn serializes_as_tagged_json() {
        let json = serde_json::to_string(&StoredValue::Integer(42)).unwrap();
        assert_eq!(json, r#"{"kind":"integer","value":42}"#);

        let parsed: StoredValue =
            serde_json::from_str(r#"{"kind":"url","value":"https://example.com"}"#).unwrap();
        assert_eq!(parsed, StoredValue::Url("https://example.com".into()));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(StoredValue::String("a".into()).to_string(), "\"a\"");
        assert_eq!(StoredValue::Data(vec![0xab, 0x01]).to_string(), "<ab01>");
        assert_eq!(StoredValue::Bool(false).to_string(), "false");
    }
}

mod memory {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", Some(StoredValue::Integer(1)));
        assert_eq!(store.get("k"), Some(StoredValue::Integer(1)));

        store.remove("k");
        assert_eq!(store.get("k"), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();

        clone.set("shared", Some(StoredValue::Bool(true)));
        assert_eq!(store.get("shared"), Some(StoredValue::Bool(true)));
    }

    #[tokio::test]
    async fn observe_emits_current_value_first() {
        let store = MemoryStore::with_values([("k", StoredValue::Integer(5))]);
        let mut values = store.observe("k");

        let first = timeout(WAIT, values.next()).await.unwrap();
        assert_eq!(first, Some(Some(StoredValue::Integer(5))));
    }

    #[tokio::test]
    async fn observe_absent_key_emits_none_then_updates() {
        let store = MemoryStore::new();
        let mut values = store.observe("k");

        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(None));

        store.set("k", Some(StoredValue::String("a".into())));
        store.remove("k");

        assert_eq!(
            timeout(WAIT, values.next()).await.unwrap(),
            Some(Some(StoredValue::String("a".into())))
        );
        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(None));
    }

    #[tokio::test]
    async fn observers_of_other_keys_are_not_notified() {
        let store = MemoryStore::new();
        let mut values = store.observe("a");
        let _ = values.next().await;

        store.set("b", Some(StoredValue::Integer(1)));
        assert!(timeout(QUIET, values.next()).await.is_err());
    }

    #[tokio::test]
    async fn dropped_observers_are_released() {
        let store = MemoryStore::new();
        let first = store.observe("k");
        let second = store.observe("k");
        assert_eq!(store.observer_count("k"), 2);

        drop(first);
        assert_eq!(store.observed_keys(), 1);
        drop(second);
        assert_eq!(store.observer_count("k"), 0);
        assert_eq!(store.observed_keys(), 0);

        store.set("k", Some(StoredValue::Integer(1)));
        assert_eq!(store.observer_count("k"), 0);

        let mut fresh = store.observe("k");
        assert_eq!(
            timeout(WAIT, fresh.next()).await.unwrap(),
            Some(Some(StoredValue::Integer(1)))
        );
    }

    #[test]
    fn observing_a_key_that_is_never_written_leaves_nothing_behind() {
        let store = MemoryStore::new();

        for key in ["a", "b", "c"] {
            let observation = store.observe(key);
            assert_eq!(store.observed_keys(), 1);
            drop(observation);
        }

        assert_eq!(store.observed_keys(), 0);
        assert!(format!("{store:?}").contains("observed_keys: 0"));
    }

    #[tokio::test]
    async fn replace_all_notifies_only_changed_keys() {
        let store = MemoryStore::with_values([
            ("same", StoredValue::Integer(1)),
            ("changed", StoredValue::Integer(2)),
            ("removed", StoredValue::Integer(3)),
        ]);

        let mut same = store.observe("same");
        let mut changed = store.observe("changed");
        let mut removed = store.observe("removed");
        let _ = (same.next().await, changed.next().await, removed.next().await);

        let changes = store.replace_all(HashMap::from([
            ("same".to_string(), StoredValue::Integer(1)),
            ("changed".to_string(), StoredValue::Integer(20)),
            ("added".to_string(), StoredValue::Bool(true)),
        ]));

        assert_eq!(changes, vec!["added", "changed", "removed"]);
        assert_eq!(
            timeout(WAIT, changed.next()).await.unwrap(),
            Some(Some(StoredValue::Integer(20)))
        );
        assert_eq!(timeout(WAIT, removed.next()).await.unwrap(), Some(None));
        assert!(timeout(QUIET, same.next()).await.is_err());
        assert_eq!(store.get("added"), Some(StoredValue::Bool(true)));
    }
}

mod file {
    use super::*;

    #[test]
    fn missing_file_is_empty_domain() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("nested/domain.json")).unwrap();

        assert!(store.snapshot().is_empty());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn writes_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("count", Some(StoredValue::Integer(3)));
            store.set("name", Some(StoredValue::String("lamp".into())));
            store.remove("name");
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("count"), Some(StoredValue::Integer(3)));
        assert_eq!(reopened.get("name"), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn invalid_file_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Persistence { .. })
        ));
    }

    #[tokio::test]
    async fn reload_notifies_observers_of_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");

        let store = FileStore::open(&path).unwrap();
        store.set("level", Some(StoredValue::Integer(1)));

        let mut values = store.observe("level");
        assert_eq!(
            timeout(WAIT, values.next()).await.unwrap(),
            Some(Some(StoredValue::Integer(1)))
        );

        let other = FileStore::open(&path).unwrap();
        other.set("level", Some(StoredValue::Integer(2)));

        let changed = store.reload().unwrap();
        assert_eq!(changed, vec!["level"]);
        assert_eq!(
            timeout(WAIT, values.next()).await.unwrap(),
            Some(Some(StoredValue::Integer(2)))
        );
    }

    #[test]
    fn non_finite_double_keeps_domain_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("name", Some(StoredValue::String("kept".into())));
            store.set("ratio", Some(StoredValue::Double(f64::NAN)));
            store.set("ceiling", Some(StoredValue::Double(f64::INFINITY)));
            store.set("floor", Some(StoredValue::Double(f64::NEG_INFINITY)));
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("name"), Some(StoredValue::String("kept".into())));
        assert!(matches!(
            reopened.get("ratio"),
            Some(StoredValue::Double(value)) if value.is_nan()
        ));
        assert_eq!(
            reopened.get("ceiling"),
            Some(StoredValue::Double(f64::INFINITY))
        );
        assert_eq!(
            reopened.get("floor"),
            Some(StoredValue::Double(f64::NEG_INFINITY))
        );

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"NaN\""));
        assert!(!content.contains("null"));
    }

    #[test]
    fn reloading_unchanged_nan_reports_no_change() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("domain.json")).unwrap();
        store.set("ratio", Some(StoredValue::Double(f64::NAN)));

        assert!(store.reload().unwrap().is_empty());
    }

    #[test]
    fn every_kind_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");
        let entries = [
            ("bool", StoredValue::Bool(false)),
            ("integer", StoredValue::Integer(i64::MIN)),
            ("double", StoredValue::Double(-0.125)),
            ("whole_double", StoredValue::Double(3.0)),
            ("data", StoredValue::Data(vec![0, 255, 16])),
            ("empty_data", StoredValue::Data(Vec::new())),
            ("string", StoredValue::String("with \"quotes\" and ünïcode".into())),
            ("empty_string", StoredValue::String(String::new())),
            ("url", StoredValue::Url("mailto:someone@example.com".into())),
            ("not_a_url", StoredValue::Url("no scheme here".into())),
        ];

        {
            let store = FileStore::open(&path).unwrap();
            for (key, value) in &entries {
                store.set(key, Some(value.clone()));
            }
        }

        let reopened = FileStore::open(&path).unwrap();
        for (key, value) in &entries {
            assert_eq!(reopened.get(key).as_ref(), Some(value), "key {key}");
            assert_eq!(reopened.get(key).map(|v| v.kind()), Some(value.kind()));
        }
    }

    #[test]
    fn double_accepts_plain_json_numbers() {
        let parsed: StoredValue = serde_json::from_str(r#"{"kind":"double","value":2}"#).unwrap();
        assert_eq!(parsed, StoredValue::Double(2.0));

        let rejected = serde_json::from_str::<StoredValue>(r#"{"kind":"double","value":"lots"}"#);
        assert!(rejected.is_err());
    }

    #[tokio::test]
    async fn watcher_reports_only_its_own_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");
        let (watcher, mut events) = FileWatcher::new(&path).unwrap();
        assert_eq!(watcher.path(), path);

        fs::write(dir.path().join("other.json"), "{}").unwrap();
        fs::write(&path, "{}").unwrap();

        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path.file_name(), path.file_name());
    }

    #[test]
    fn failed_reload_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domain.json");

        let store = FileStore::open(&path).unwrap();
        store.set("k", Some(StoredValue::Bool(true)));
        fs::write(&path, "[broken").unwrap();

        assert!(store.reload().is_err());
        assert_eq!(store.get("k"), Some(StoredValue::Bool(true)));
    }
}
