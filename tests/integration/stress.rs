//! Integration test: many concurrent clients against one coordinator.

use std::sync::Arc;

use ebb_blob::stream_from_bytes;
use ebb_integration_tests::{Stack, oid, test_data_seeded};
use ebb_types::Metadata;

/// 32 clients each write, read back and delete their own objects.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_own_objects() {
    let s = Arc::new(Stack::new());

    let mut handles = Vec::new();
    for client in 0..32u32 {
        let s = s.clone();
        handles.push(tokio::spawn(async move {
            let owner = format!("client-{client}");
            for n in 0..5u32 {
                let id = oid(&format!("c{client}-o{n}"));
                let data = test_data_seeded(1_000 + (n as usize) * 4_096, client * 100 + n);
                s.coord
                    .set(&id, stream_from_bytes(data.clone()), Metadata::with_owner(&owner))
                    .await
                    .unwrap();
                assert_eq!(s.read(&id).await.unwrap(), data.as_slice());
                assert!(s.coord.del(&id, "intruder").await.unwrap_err().is_unauthorized());
                s.coord.del(&id, &owner).await.unwrap();
                assert!(!s.blob_on_disk(&id));
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let leftover = std::fs::read_dir(s.blob_dir().join("objects")).unwrap().count();
    assert_eq!(leftover, 0);
}

/// Concurrent overwrites of one id end with a consistent object: the
/// payload on disk is one of the written versions, complete.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overwrites_stay_whole() {
    let s = Arc::new(Stack::new());
    let id = oid("contended");
    let versions: Vec<Vec<u8>> = (0..16u32).map(|i| test_data_seeded(64 * 1024, i + 1)).collect();

    let mut handles = Vec::new();
    for (i, data) in versions.iter().cloned().enumerate() {
        let s = s.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            s.coord
                .set(&id, stream_from_bytes(data), Metadata::with_owner(format!("w{i}")))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let got = s.read(&id).await.unwrap();
    assert!(versions.iter().any(|v| v.as_slice() == got.as_ref()));
    let owner = s.coord.metadata(&id).await.unwrap();
    assert!(owner.owner().is_some_and(|o| o.starts_with('w')));
}

/// Field updates from many tasks all land.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_field_updates() {
    let s = Arc::new(Stack::new());
    let id = oid("counters");
    s.coord
        .set(&id, stream_from_bytes(&b"x"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..50 {
        let s = s.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            s.coord
                .set_field(&id, &format!("f{i}"), &i.to_string())
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let meta = s.coord.metadata(&id).await.unwrap();
    assert_eq!(meta.len(), 51);
    assert_eq!(meta.parse::<u32>("f49").unwrap(), Some(49));
}
