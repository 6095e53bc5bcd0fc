//! Integration test: backend failures.
//!
//! Inject outages and write failures on either side and check which
//! state the coordinator leaves behind on disk and in metadata.

use ebb_blob::{BlobError, BlobStream, stream_from_bytes};
use ebb_integration_tests::{Stack, oid, test_data};
use ebb_types::Metadata;
use futures::stream;

fn broken_stream(after: Vec<u8>) -> BlobStream {
    Box::pin(stream::iter(vec![
        Ok(bytes::Bytes::from(after)),
        Err(BlobError::Io(std::io::Error::other("client hung up"))),
    ]))
}

/// A client that disconnects mid-upload leaves neither record nor file.
#[tokio::test]
async fn test_interrupted_upload_leaves_nothing() {
    let s = Stack::new();
    let id = oid("partial");

    assert!(
        s.coord
            .set(&id, broken_stream(test_data(10_000)), Metadata::with_owner("o"))
            .await
            .is_err()
    );
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(!s.blob_on_disk(&id));
    let tmp_entries = std::fs::read_dir(s.blob_dir().join("tmp")).unwrap().count();
    assert_eq!(tmp_entries, 0);
}

/// An interrupted overwrite keeps the previous object intact.
#[tokio::test]
async fn test_interrupted_overwrite_keeps_old_object() {
    let s = Stack::new();
    let id = oid("stable");
    s.coord
        .set(&id, stream_from_bytes(&b"v1"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();

    assert!(
        s.coord
            .set(&id, broken_stream(b"v2-partial".to_vec()), Metadata::with_owner("x"))
            .await
            .is_err()
    );
    assert_eq!(s.read(&id).await.unwrap(), &b"v1"[..]);
    assert_eq!(s.coord.metadata(&id).await.unwrap().owner(), Some("o"));
}

/// Metadata failing after the blob write orphans the file.
#[tokio::test]
async fn test_metadata_failure_orphans_blob() {
    let s = Stack::new();
    let id = oid("orphan");
    s.meta.set_fail_writes(true);

    let err = s
        .coord
        .set(&id, stream_from_bytes(&b"payload"[..]), Metadata::with_owner("o"))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(s.blob_on_disk(&id));

    // A retry by the client succeeds and adopts the blob.
    s.meta.set_fail_writes(false);
    s.coord
        .set(&id, stream_from_bytes(&b"payload"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();
    assert_eq!(s.read(&id).await.unwrap(), &b"payload"[..]);
}

/// A failed blob delete after the record is gone orphans the file; a
/// later forced delete cleans it up.
#[tokio::test]
async fn test_blob_delete_failure_then_cleanup() {
    let s = Stack::new();
    let id = oid("sticky");
    s.coord
        .set(&id, stream_from_bytes(&b"data"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();

    s.blobs.set_fail_deletes(true);
    assert!(s.coord.del(&id, "o").await.is_err());
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(s.blob_on_disk(&id));

    s.blobs.set_fail_deletes(false);
    s.coord.force_delete(&id).await.unwrap();
    assert!(!s.blob_on_disk(&id));
}

/// Ping names the backend that is down, and recovers with it.
#[tokio::test]
async fn test_ping_tracks_outages() {
    let s = Stack::new();

    s.blobs.set_unavailable(true);
    let err = s.coord.ping().await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(err.to_string().starts_with("blob"), "{err}");

    s.blobs.set_unavailable(false);
    s.meta.set_unavailable(true);
    let err = s.coord.ping().await.unwrap_err();
    assert!(err.to_string().starts_with("metadata"), "{err}");

    s.meta.set_unavailable(false);
    s.coord.ping().await.unwrap();
}

/// Reads during a metadata outage fail; the blob side is untouched.
#[tokio::test]
async fn test_metadata_outage_blocks_lookups_only() {
    let s = Stack::new();
    let id = oid("during-outage");
    s.coord
        .set(&id, stream_from_bytes(&b"still here"[..]), Metadata::with_owner("o"))
        .await
        .unwrap();

    s.meta.set_unavailable(true);
    assert!(s.coord.exists(&id).await.unwrap_err().is_unavailable());
    assert!(s.coord.del(&id, "o").await.unwrap_err().is_unavailable());
    // Payload reads go straight to the blob store.
    assert_eq!(s.read(&id).await.unwrap(), &b"still here"[..]);

    s.meta.set_unavailable(false);
    s.coord.del(&id, "o").await.unwrap();
}

/// A blob outage makes uploads fail before anything is recorded.
#[tokio::test]
async fn test_blob_outage_rejects_uploads() {
    let s = Stack::new();
    let id = oid("rejected");
    s.blobs.set_unavailable(true);

    let err = s
        .coord
        .set(&id, stream_from_bytes(&b"x"[..]), Metadata::with_owner("o"))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());

    s.blobs.set_unavailable(false);
    assert!(!s.coord.exists(&id).await.unwrap());
    assert!(!s.blob_on_disk(&id));
}
