//! Unit tests for typed storage bindings.

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::time::timeout;

use crate::{
    dependencies::{CollectingReporter, ExecutionContext, with_dependencies},
    raw_representable,
    storage::{AppStorage, RawRepresentable, StorageValue, Uri},
    store::{KeyValueStore, MemoryStore, SharedStore, StoredValue},
};

const WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Light,
    Dark,
}

raw_representable!(Theme: String {
    Theme::Light => "light",
    Theme::Dark => "dark",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    Low,
    High,
}

raw_representable!(Priority: i64 {
    Priority::Low => 1,
    Priority::High => 10,
});

fn memory() -> (MemoryStore, SharedStore) {
    let store = MemoryStore::new();
    let shared: SharedStore = Arc::new(store.clone());
    (store, shared)
}

mod codecs {
    use super::*;

    #[test]
    fn primitives_decode_only_their_own_kind() {
        assert_eq!(bool::decode(StoredValue::Bool(true)), Some(true));
        assert_eq!(bool::decode(StoredValue::Integer(1)), None);
        assert_eq!(i64::decode(StoredValue::Integer(-4)), Some(-4));
        assert_eq!(i64::decode(StoredValue::Double(1.0)), None);
        assert_eq!(f64::decode(StoredValue::Double(0.5)), Some(0.5));
        assert_eq!(String::decode(StoredValue::Url("a:b".into())), None);
        assert_eq!(
            Vec::<u8>::decode(StoredValue::Data(vec![1, 2])),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn narrow_integers_reject_out_of_range_values() {
        assert_eq!(i32::decode(StoredValue::Integer(7)), Some(7));
        assert_eq!(i32::decode(StoredValue::Integer(i64::MAX)), None);
        assert_eq!(u32::decode(StoredValue::Integer(-1)), None);
        assert_eq!(5u32.encode(), Some(StoredValue::Integer(5)));
    }

    #[test]
    fn optional_none_encodes_as_absence() {
        assert_eq!(None::<i64>.encode(), None);
        assert_eq!(Some(3i64).encode(), Some(StoredValue::Integer(3)));
        assert_eq!(
            Option::<i64>::decode(StoredValue::Integer(3)),
            Some(Some(3))
        );
    }

    #[test]
    fn uri_requires_scheme() {
        let uri = Uri::parse("https://example.com/a").unwrap();
        assert_eq!(uri.scheme(), "https");
        assert_eq!(uri.as_str(), "https://example.com/a");
        assert_eq!(uri.encode(), Some(StoredValue::Url(uri.to_string())));

        assert!(Uri::parse("example.com").is_none());
        assert_eq!(Uri::decode(StoredValue::String("https://x".into())), None);
    }

    #[test]
    fn raw_representable_maps_variants() {
        assert_eq!(Theme::Dark.to_raw(), "dark");
        assert_eq!(Theme::from_raw("light".to_string()), Some(Theme::Light));
        assert_eq!(Theme::from_raw("sepia".to_string()), None);
        assert_eq!(Priority::High.to_raw(), 10);
        assert_eq!(Priority::from_raw(1), Some(Priority::Low));
    }
}

mod bindings {
    use super::*;

    #[test]
    fn default_fallback_set_and_reset() {
        let (store, shared) = memory();
        let storage = AppStorage::with_store("k", 42i64, shared);

        assert_eq!(storage.get(), 42);

        storage.set(99);
        assert_eq!(storage.get(), 99);
        assert_eq!(store.get("k"), Some(StoredValue::Integer(99)));

        storage.reset();
        assert_eq!(storage.get(), 42);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn mismatched_kind_reads_as_default() {
        let (store, shared) = memory();
        store.set("volume", Some(StoredValue::String("loud".into())));

        let storage = AppStorage::with_store("volume", 0.5f64, shared);
        assert_eq!(storage.get(), 0.5);
    }

    #[test]
    fn optional_binding_removes_key_on_none() {
        let (store, shared) = memory();
        let storage = AppStorage::<Option<String>>::optional_with_store("name", shared);

        assert_eq!(storage.get(), None);

        storage.set(Some("ada".to_string()));
        assert_eq!(store.get("name"), Some(StoredValue::String("ada".into())));

        storage.set(None);
        assert_eq!(store.get("name"), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn raw_representable_binding_stores_raw_value() {
        let (store, shared) = memory();
        let theme = AppStorage::raw_with_store("theme", Theme::Light, shared);

        theme.set(Theme::Dark);
        assert_eq!(store.get("theme"), Some(StoredValue::String("dark".into())));
        assert_eq!(theme.get(), Theme::Dark);

        store.set("theme", Some(StoredValue::String("neon".into())));
        assert_eq!(theme.get(), Theme::Light);
    }

    #[test]
    fn raw_optional_binding_uses_ambient_store() {
        let (store, shared) = memory();

        let priority = with_dependencies(
            |deps| deps.set_store(shared),
            || AppStorage::<Option<Priority>>::raw_optional("priority"),
        );

        assert_eq!(priority.get(), None);

        priority.set(Some(Priority::High));
        assert_eq!(store.get("priority"), Some(StoredValue::Integer(10)));

        priority.reset();
        assert_eq!(priority.get(), None);
        assert_eq!(store.get("priority"), None);
    }

    #[test]
    fn custom_codec_via_parts() {
        let (store, shared) = memory();
        let storage = AppStorage::from_parts(
            "celsius",
            20.0f64,
            Some(shared),
            |raw| match raw {
                StoredValue::Integer(tenths) => Some(tenths as f64 / 10.0),
                _ => None,
            },
            |value: &f64| Some(StoredValue::Integer((value * 10.0).round() as i64)),
        );

        storage.set(21.5);
        assert_eq!(store.get("celsius"), Some(StoredValue::Integer(215)));
        assert_eq!(storage.get(), 21.5);
    }

    #[test]
    fn ambient_store_is_captured_at_construction() {
        let (first, first_shared) = memory();
        let (second, second_shared) = memory();

        let storage = with_dependencies(
            |deps| deps.set_store(first_shared),
            || AppStorage::new("k", 1i64),
        );

        with_dependencies(
            |deps| deps.set_store(second_shared),
            || storage.set(2),
        );

        assert_eq!(first.get("k"), Some(StoredValue::Integer(2)));
        assert_eq!(second.get("k"), None);
    }

    #[test]
    fn unconfigured_binding_in_test_context_reports_construction_site() {
        let reporter = CollectingReporter::new();

        let (storage, expected_line) = with_dependencies(
            |deps| {
                deps.set_context(ExecutionContext::Test);
                deps.set_reporter(Arc::new(reporter.clone()));
            },
            || {
                let line = line!() + 1;
                let storage = AppStorage::new("orphan", false);
                (storage, line)
            },
        );

        let issues = reporter.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, file!());
        assert_eq!(issues[0].line, expected_line);

        storage.set(true);
        assert!(storage.get());
    }

    #[test]
    fn unconfigured_binding_in_live_context_is_in_memory() {
        let storage = with_dependencies(
            |deps| deps.set_context(ExecutionContext::Live),
            || AppStorage::new("volatile", String::from("initial")),
        );

        assert_eq!(storage.get(), "initial");
        storage.set("changed".to_string());
        assert_eq!(storage.get(), "changed");
    }

    #[test]
    fn clones_share_store() {
        let (_, shared) = memory();
        let storage = AppStorage::with_store("k", 0i64, shared);
        let clone = storage.clone();

        clone.set(5);
        assert_eq!(storage.get(), 5);
        assert_eq!(clone.key(), "k");
        assert_eq!(*clone.default_value(), 0);
    }

    #[test]
    fn debug_shows_current_value() {
        let (_, shared) = memory();
        let storage = AppStorage::with_store("k", 1i64, shared);
        storage.set(3);

        let rendered = format!("{storage:?}");
        assert!(rendered.contains("\"k\""));
        assert!(rendered.contains("value: 3"));
    }
}

mod observation {
    use super::*;

    #[tokio::test]
    async fn values_replay_current_then_follow_changes() {
        let (_, shared) = memory();
        let storage = AppStorage::with_store("k", 42i64, shared);
        let mut values = Box::pin(storage.values());

        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(42));

        let writer = storage.clone();
        tokio::spawn(async move { writer.set(55) }).await.unwrap();
        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(55));

        storage.reset();
        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn each_values_call_starts_from_now() {
        let (_, shared) = memory();
        let storage = AppStorage::with_store("k", 0i64, shared);

        let mut early = Box::pin(storage.values());
        storage.set(1);
        storage.set(2);
        let mut late = Box::pin(storage.values());

        let early_seen: Vec<i64> = early.as_mut().take(3).collect().await;
        assert_eq!(early_seen, vec![0, 1, 2]);
        assert_eq!(timeout(WAIT, late.next()).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn undecodable_updates_surface_as_default() {
        let (store, shared) = memory();
        let storage = AppStorage::with_store("flag", true, shared);
        let mut values = Box::pin(storage.values());
        let _ = values.next().await;

        store.set("flag", Some(StoredValue::Bool(false)));
        store.set("flag", Some(StoredValue::String("garbage".into())));

        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(false));
        assert_eq!(timeout(WAIT, values.next()).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn dropping_values_releases_observer() {
        let (store, shared) = memory();
        let storage = AppStorage::with_store("k", 0i64, shared);

        let values = storage.values();
        assert_eq!(store.observer_count("k"), 1);

        drop(values);
        assert_eq!(store.observer_count("k"), 0);
    }

    #[tokio::test]
    async fn bindings_to_distinct_stores_do_not_interfere() {
        let (first_store, first) = memory();
        let (second_store, second) = memory();
        let a = AppStorage::with_store("k", 0i64, first);
        let b = AppStorage::with_store("k", 0i64, second);

        let mut a_values = Box::pin(a.values());
        let mut b_values = Box::pin(b.values());
        let _ = (a_values.next().await, b_values.next().await);

        a.set(1);
        b.set(2);

        assert_eq!(timeout(WAIT, a_values.next()).await.unwrap(), Some(1));
        assert_eq!(timeout(WAIT, b_values.next()).await.unwrap(), Some(2));
        assert!(
            timeout(Duration::from_millis(50), a_values.next())
                .await
                .is_err()
        );
        assert_eq!(first_store.get("k"), Some(StoredValue::Integer(1)));
        assert_eq!(second_store.get("k"), Some(StoredValue::Integer(2)));
    }
}
