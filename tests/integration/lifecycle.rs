//! Integration test: object lifecycle over the file blob store.
//!
//! Write, read, inspect and delete objects end to end, and check what is
//! left on disk after each step.

use std::time::Duration;

use ebb_blob::stream_from_bytes;
use ebb_integration_tests::{EXPIRE_SECONDS, Stack, oid, test_data_seeded};
use ebb_types::Metadata;

/// Write 40 objects of varying sizes, read each back, verify contents.
#[tokio::test]
async fn test_objects_of_varying_sizes() {
    let s = Stack::new();

    let mut objects = Vec::new();
    for i in 0..40u32 {
        let size = (i as usize) * 7_919;
        let data = test_data_seeded(size, i + 1);
        let id = oid(&format!("obj-{i:03}"));
        s.coord
            .set(&id, stream_from_bytes(data.clone()), Metadata::with_owner("alice"))
            .await
            .unwrap();
        objects.push((id, data));
    }

    for (id, expected) in &objects {
        assert_eq!(s.coord.length(id).await.unwrap(), expected.len() as u64);
        assert_eq!(s.read(id).await.unwrap(), expected.as_slice(), "{id}");
    }
}

/// A payload spanning many stream chunks arrives intact and on disk.
#[tokio::test]
async fn test_large_object_streams_through() {
    let s = Stack::new();
    let id = oid("big.bin");
    let data = test_data_seeded(3 * 1024 * 1024 + 17, 99);

    s.coord
        .set(&id, stream_from_bytes(data.clone()), Metadata::with_owner("alice"))
        .await
        .unwrap();

    assert_eq!(
        std::fs::metadata(s.blob_path(&id)).unwrap().len(),
        data.len() as u64
    );
    assert_eq!(s.read(&id).await.unwrap(), data.as_slice());
}

/// Full lifecycle: set, inspect, update a field, owner delete.
#[tokio::test]
async fn test_set_inspect_update_delete() {
    let s = Stack::new();
    let id = oid("report.pdf");

    let meta = Metadata::with_owner("tok-1")
        .field("content-type", "application/pdf")
        .field("downloads", "0");
    s.coord
        .set(&id, stream_from_bytes(&b"%PDF-1.7"[..]), meta)
        .await
        .unwrap();

    assert!(s.coord.exists(&id).await.unwrap());
    let ttl = s.coord.ttl(&id).await.unwrap().unwrap();
    assert!(ttl <= EXPIRE_SECONDS * 1000 && ttl > (EXPIRE_SECONDS - 5) * 1000);

    s.coord.set_field(&id, "downloads", "1").await.unwrap();
    let meta = s.coord.metadata(&id).await.unwrap();
    assert_eq!(meta.parse::<u32>("downloads").unwrap(), Some(1));
    assert_eq!(meta.get("content-type"), Some("application/pdf"));
    assert_eq!(meta.owner(), Some("tok-1"));

    let err = s.coord.del(&id, "tok-2").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(s.blob_on_disk(&id));

    s.coord.del(&id, "tok-1").await.unwrap();
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(!s.blob_on_disk(&id));
    assert!(s.coord.get(&id).await.err().unwrap().is_not_found());
}

/// Objects written before a restart are readable after it.
#[tokio::test]
async fn test_objects_survive_restart() {
    let s = Stack::new();
    let id = oid("persisted");
    let data = test_data_seeded(100_000, 7);
    s.coord
        .set(&id, stream_from_bytes(data.clone()), Metadata::with_owner("o"))
        .await
        .unwrap();

    let s = s.restart();

    assert!(s.coord.exists(&id).await.unwrap());
    assert_eq!(s.read(&id).await.unwrap(), data.as_slice());
    s.coord.del(&id, "o").await.unwrap();
    assert!(!s.blob_on_disk(&id));
}

/// Overwriting replaces both payload and metadata.
#[tokio::test]
async fn test_overwrite_replaces_payload_and_metadata() {
    let s = Stack::new();
    let id = oid("doc");

    s.coord
        .set(
            &id,
            stream_from_bytes(test_data_seeded(50_000, 1)),
            Metadata::with_owner("first").field("v", "1"),
        )
        .await
        .unwrap();
    s.coord
        .set(
            &id,
            stream_from_bytes(&b"short"[..]),
            Metadata::with_owner("second").field("v", "2"),
        )
        .await
        .unwrap();

    assert_eq!(s.read(&id).await.unwrap(), &b"short"[..]);
    let meta = s.coord.metadata(&id).await.unwrap();
    assert_eq!(meta.owner(), Some("second"));
    assert_eq!(meta.get("v"), Some("2"));
    assert!(s.coord.del(&id, "first").await.unwrap_err().is_unauthorized());
}

/// Once the record expires the object reads as absent, but its payload
/// stays on disk.
#[tokio::test(start_paused = true)]
async fn test_expired_object_leaves_blob_on_disk() {
    let s = Stack::with_expiry(60);
    let id = oid("short-lived");
    s.coord
        .set(&id, stream_from_bytes(&b"temporary"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(s.coord.exists(&id).await.unwrap());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(s.coord.ttl(&id).await.unwrap_err().is_not_found());
    assert!(s.blob_on_disk(&id));

    // Nobody owns it any more, but a forced delete still clears the file.
    assert!(s.coord.del(&id, "o").await.unwrap_err().is_unauthorized());
    s.coord.force_delete(&id).await.unwrap();
    assert!(!s.blob_on_disk(&id));
}

/// Health check and shutdown.
#[tokio::test]
async fn test_ping_then_quit() {
    let s = Stack::new();
    s.coord.ping().await.unwrap();
    s.coord.quit().await.unwrap();
    s.coord.quit().await.unwrap();
    assert!(s.coord.exists(&oid("x")).await.unwrap_err().is_unavailable());
}
