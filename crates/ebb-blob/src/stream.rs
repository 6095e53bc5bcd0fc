//! Byte stream type shared by every backend, plus small adapters.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::BlobError;

/// A lazily produced sequence of byte chunks.
pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, BlobError>> + Send>>;

/// Chunk size used when slicing in-memory payloads into a stream.
pub(crate) const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Wrap an in-memory payload as a single-chunk stream.
pub fn stream_from_bytes(data: impl Into<Bytes>) -> BlobStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Stream the contents of any async reader.
pub fn stream_from_reader<R>(reader: R) -> BlobStream
where
    R: AsyncRead + Send + 'static,
{
    Box::pin(ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).map_err(BlobError::from))
}

/// Drain a stream into one contiguous buffer.
pub async fn collect_stream(mut stream: BlobStream) -> Result<Bytes, BlobError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Slice a shared buffer into fixed-size chunks without copying.
pub(crate) fn stream_from_shared(data: Bytes, chunk_size: usize) -> BlobStream {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}
