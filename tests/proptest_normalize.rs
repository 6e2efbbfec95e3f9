//! Property-based tests using proptest
//!
//! These tests verify normalization idempotence over arbitrary JSON shapes
//! and timestamps, and that concurrent name lookups coalesce onto a single
//! bulk population call.

use chrono::{FixedOffset, TimeZone};
use gcpinv::resource::normalize::{labels, timestamp, Normalize};
use gcpinv::resource::{NameKind, NameResolver, NameSource};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Generate arbitrary JSON values, nested a few levels deep
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-zA-Z0-9 _.:/-]{0,16}".prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// RFC 3339 timestamps between 1970 and 2100 in arbitrary whole-hour offsets
fn arb_timestamp() -> impl Strategy<Value = String> {
    (0i64..4_102_444_800, -12i32..=14, 0u32..1_000_000_000).prop_map(|(secs, hours, nanos)| {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap();
        offset
            .timestamp_opt(secs, nanos)
            .single()
            .unwrap()
            .to_rfc3339()
    })
}

proptest! {
    #[test]
    fn normalized_json_is_a_fixed_point(value in arb_json()) {
        let once = value.normalize();
        prop_assert_eq!(once.normalize(), once.clone());
        prop_assert_eq!(Value::String(once.clone()).normalize(), once);
    }

    #[test]
    fn timestamps_normalize_to_utc_and_are_stable(raw in arb_timestamp()) {
        let once = timestamp(&raw);
        prop_assert!(once.ends_with('Z'), "{} -> {}", raw, once);
        prop_assert_eq!(once.len(), "2024-01-01T00:00:00Z".len());
        prop_assert_eq!(timestamp(&once), once);
    }

    #[test]
    fn scalar_lists_keep_order_and_duplicates(items in prop::collection::vec("[a-z0-9]{1,8}", 1..10)) {
        let joined = items.normalize();
        let lines: Vec<&str> = joined.split('\n').collect();
        prop_assert_eq!(lines, items.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn labels_are_sorted_key_value_lines(map in prop::collection::hash_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8)) {
        let value = Value::Object(map.iter().map(|(k, v)| (k.clone(), json!(v))).collect());
        let rendered = labels(Some(&value));

        let mut expected: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        expected.sort();
        prop_assert_eq!(rendered, expected.join("\n"));
    }
}

struct SlowSource {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl NameSource for SlowSource {
    async fn list_names(
        &self,
        kind: NameKind,
        _region: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<HashMap<String, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        Ok(HashMap::from([("42".to_string(), kind.as_str().to_string())]))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_lookups_share_one_population(callers in 1usize..24) {
        let source = Arc::new(SlowSource { calls: AtomicUsize::new(0) });
        let resolver = NameResolver::new(source.clone());
        let cancel = CancellationToken::new();

        let maps = tokio_test::block_on(futures::future::join_all(
            (0..callers).map(|_| resolver.get_all(&cancel, NameKind::Network, "us-east1")),
        ));

        prop_assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        prop_assert!(maps.iter().all(|m| Arc::ptr_eq(m, &maps[0])));
        prop_assert_eq!(maps[0].get("42").map(String::as_str), Some("network"));
    }
}
