//! End-to-end map scenarios over an in-memory shared log

use braid_log::SharedLog;
use braid_map::{MapError, SharedMap};
use braid_runtime::{OpenOptions, Runtime, RuntimeError};
use braid_common::StreamId;

fn runtime() -> Runtime {
    Runtime::new(SharedLog::in_memory())
}

async fn open_map(runtime: &Runtime, stream: StreamId) -> SharedMap<i64, i64> {
    SharedMap::open(runtime, OpenOptions::new(stream).without_cache())
        .await
        .unwrap()
}

#[tokio::test]
async fn map_is_puttable_gettable() {
    let runtime = runtime();
    let map = open_map(&runtime, StreamId::new()).await;

    map.put(0, 10).await.unwrap();
    map.put(10, 20).await.unwrap();

    assert_eq!(map.get(0).await.unwrap(), Some(10));
    assert_eq!(map.get(10).await.unwrap(), Some(20));
}

#[tokio::test]
async fn multiple_maps_contain_same_data() {
    let runtime = runtime();
    let stream = StreamId::new();

    let map = open_map(&runtime, stream).await;
    map.put(0, 10).await.unwrap();
    map.put(10, 100).await.unwrap();

    // A second object on the same stream replays to the same state without
    // re-inserting anything.
    let second = open_map(&runtime, stream).await;
    assert_eq!(second.get(0).await.unwrap(), Some(10));
    assert_eq!(second.get(10).await.unwrap(), Some(100));
}

#[tokio::test]
async fn ensure_mutator_accessors_work() {
    let runtime = runtime();
    let map = open_map(&runtime, StreamId::new()).await;

    map.put(0, 10).await.unwrap();
    assert_eq!(map.put(0, 100).await.unwrap(), Some(10));
    assert_eq!(map.get(0).await.unwrap(), Some(100));
}

#[tokio::test]
async fn remove_len_keys_and_clear() {
    let runtime = runtime();
    let map: SharedMap<String, String> =
        SharedMap::open(&runtime, OpenOptions::new("map a")).await.unwrap();

    map.put("a".into(), "1".into()).await.unwrap();
    map.put("b".into(), "2".into()).await.unwrap();

    assert_eq!(map.len().await.unwrap(), 2);
    assert!(map.contains_key("a".into()).await.unwrap());
    assert_eq!(
        map.keys().await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );

    assert_eq!(map.remove("a".into()).await.unwrap(), Some("1".to_string()));
    assert_eq!(map.remove("a".into()).await.unwrap(), None);

    map.clear().await.unwrap();
    assert!(map.is_empty().await.unwrap());

    // The clear replays for late openers too.
    let second: SharedMap<String, String> = SharedMap::open(
        &runtime,
        OpenOptions::new("map a").without_cache(),
    )
    .await
    .unwrap();
    assert!(second.is_empty().await.unwrap());
}

#[tokio::test]
async fn can_copy_map() {
    let runtime = runtime();
    let map: SharedMap<String, String> =
        SharedMap::open(&runtime, OpenOptions::new("map a")).await.unwrap();
    map.put("a".into(), "a".into()).await.unwrap();

    let copy = map.copy_as(&runtime, "map a copy").await.unwrap();
    copy.put("b".into(), "b".into()).await.unwrap();

    assert_eq!(copy.get("a".into()).await.unwrap(), Some("a".to_string()));
    assert_eq!(copy.get("b".into()).await.unwrap(), Some("b".to_string()));

    // The source never learns about the copy's mutations.
    assert_eq!(map.get("a".into()).await.unwrap(), Some("a".to_string()));
    assert_eq!(map.get("b".into()).await.unwrap(), None);
}

#[tokio::test]
async fn simple_transactional_flow() {
    let runtime = runtime();
    let map = open_map(&runtime, StreamId::new()).await;
    map.put(10, 100).await.unwrap();

    let mut tx = runtime.tx_context();
    tx.begin().unwrap();
    if map.get_in(&mut tx, 10).await.unwrap() == Some(100) {
        map.put_in(&mut tx, 10, 1000).await.unwrap();
    }
    assert!(tx.commit().await.unwrap().is_some());

    assert_eq!(map.get(10).await.unwrap(), Some(1000));
}

#[tokio::test]
async fn unrelated_transaction_does_not_conflict() {
    let runtime = runtime();
    let map_a: SharedMap<String, String> =
        SharedMap::open(&runtime, OpenOptions::new("map a")).await.unwrap();
    let map_b: SharedMap<String, String> =
        SharedMap::open(&runtime, OpenOptions::new("map b")).await.unwrap();

    map_a.put("a".into(), "b".into()).await.unwrap();

    // A transaction reading map a and writing map b...
    let mut tx = runtime.tx_context();
    tx.begin().unwrap();
    let value = map_a.get_in(&mut tx, "a".into()).await.unwrap().unwrap();
    map_b.put_in(&mut tx, "b".into(), value).await.unwrap();
    tx.commit().await.unwrap();

    // ...does not make a later read-write transaction on map a conflict.
    assert_eq!(map_a.get("b".into()).await.unwrap(), None);
    let mut tx = runtime.tx_context();
    tx.begin().unwrap();
    let value = map_a.get_in(&mut tx, "a".into()).await.unwrap().unwrap();
    map_a.put_in(&mut tx, "b".into(), value).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(map_a.get("b".into()).await.unwrap(), Some("b".to_string()));
}

#[tokio::test]
async fn transactional_calls_outside_a_transaction_are_direct() {
    let runtime = runtime();
    let map = open_map(&runtime, StreamId::new()).await;

    let mut tx = runtime.tx_context();
    // No begin: the context passes calls straight through to the object.
    map.put_in(&mut tx, 1, 2).await.unwrap();
    assert_eq!(map.get_in(&mut tx, 1).await.unwrap(), Some(2));
    assert_eq!(map.get(1).await.unwrap(), Some(2));
}

#[tokio::test]
async fn conflicting_put_surfaces_aborted_error() {
    let runtime = runtime();
    let stream = StreamId::new();
    let map = open_map(&runtime, stream).await;
    map.put(0, 1).await.unwrap();

    let mut tx = runtime.tx_context();
    tx.begin().unwrap();
    let _ = map.get_in(&mut tx, 5).await.unwrap();

    let interloper = open_map(&runtime, stream).await;
    interloper.put(5, 50).await.unwrap();

    map.put_in(&mut tx, 5, 500).await.unwrap();
    let err = tx.commit().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::TransactionAborted { .. }
    ));

    assert_eq!(map.get(5).await.unwrap(), Some(50));
}

#[tokio::test]
async fn type_mismatch_on_cached_stream_is_not_a_core_object() {
    let runtime = runtime();
    let _strings: SharedMap<String, String> =
        SharedMap::open(&runtime, OpenOptions::new("map a")).await.unwrap();

    // Same stream, different map type: the cached instance cannot be it.
    let err = SharedMap::<i64, i64>::open(&runtime, OpenOptions::new("map a"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::Runtime(RuntimeError::NotACoreObject(_))
    ));
}
