//! S3-compatible object storage backend.
//!
//! Small payloads go up in one `PutObject`. Anything larger than one part is
//! sent as a multipart upload so the body never has to be buffered whole.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::{Bytes, BytesMut};
use ebb_types::ObjectId;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::BlobError;
use crate::stream::{BlobStream, stream_from_reader};
use crate::traits::BlobStore;

/// Smallest part size S3 accepts for all but the last part of an upload.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 backend configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket holding the blobs.
    pub bucket: String,
    /// AWS region; the SDK default chain is used when unset.
    pub region: Option<String>,
    /// Custom endpoint URL (MinIO, localstack, ...).
    pub endpoint: Option<String>,
    /// Path-style addressing, required by some S3-compatible services.
    pub force_path_style: bool,
    /// Multipart part size in bytes (default 8 MiB, clamped to 5 MiB).
    pub part_size: usize,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            force_path_style: false,
            part_size: 8 * 1024 * 1024,
        }
    }
}

impl S3Config {
    fn effective_part_size(&self) -> usize {
        self.part_size.max(MIN_PART_SIZE)
    }
}

/// Blob store backed by an S3 bucket. One object per id, keyed by the id.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl S3BlobStore {
    /// Build a client from the SDK's default credential chain plus `config`.
    pub async fn new(config: S3Config) -> Result<Self, BlobError> {
        if config.bucket.is_empty() {
            return Err(BlobError::Backend("bucket name cannot be empty".into()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self::from_client(
            Client::from_conf(builder.build()),
            config,
        ))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, config: S3Config) -> Self {
        let part_size = config.effective_part_size();
        Self {
            client,
            bucket: config.bucket,
            part_size,
        }
    }

    async fn put_single(&self, id: &ObjectId, body: Bytes) -> Result<(), BlobError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(id.as_str())
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error("put_object", e))?;
        Ok(())
    }

    /// Upload every part, returning the completed-part list for the commit.
    async fn upload_parts(
        &self,
        id: &ObjectId,
        upload_id: &str,
        first: Vec<Bytes>,
        parts: &mut PartReader,
    ) -> Result<Vec<CompletedPart>, BlobError> {
        let mut completed = Vec::new();
        let mut pending = first.into_iter();
        let mut part_number: i32 = 0;

        loop {
            let body = match pending.next() {
                Some(body) => body,
                None => match parts.next_part().await? {
                    Some(body) => body,
                    None => break,
                },
            };
            part_number += 1;

            let out = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(id.as_str())
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| sdk_error("upload_part", e))?;

            completed.push(
                CompletedPart::builder()
                    .set_e_tag(out.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }

        Ok(completed)
    }

    async fn put_multipart(
        &self,
        id: &ObjectId,
        first: Vec<Bytes>,
        mut parts: PartReader,
    ) -> Result<(), BlobError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(id.as_str())
            .send()
            .await
            .map_err(|e| sdk_error("create_multipart_upload", e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| BlobError::Backend("create_multipart_upload returned no upload id".into()))?
            .to_string();

        let completed = match self.upload_parts(id, &upload_id, first, &mut parts).await {
            Ok(completed) => completed,
            Err(e) => {
                self.abort_multipart(id, &upload_id).await;
                return Err(e);
            }
        };

        let num_parts = completed.len();
        let result = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(id.as_str())
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await;
        if let Err(e) = result {
            self.abort_multipart(id, &upload_id).await;
            return Err(sdk_error("complete_multipart_upload", e));
        }

        debug!(%id, parts = num_parts, size = parts.total, "stored blob via multipart upload");
        Ok(())
    }

    async fn abort_multipart(&self, id: &ObjectId, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(id.as_str())
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!(%id, upload_id, error = %DisplayErrorContext(&e), "failed to abort multipart upload");
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn length(&self, id: &ObjectId) -> Result<u64, BlobError> {
        let out = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(id.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    BlobError::NotFound(id.clone())
                } else {
                    sdk_error("head_object", e)
                }
            })?;
        Ok(out.content_length().unwrap_or(0).max(0) as u64)
    }

    async fn get_stream(&self, id: &ObjectId) -> Result<BlobStream, BlobError> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    BlobError::NotFound(id.clone())
                } else {
                    sdk_error("get_object", e)
                }
            })?;
        Ok(stream_from_reader(out.body.into_async_read()))
    }

    async fn set(&self, id: &ObjectId, data: BlobStream) -> Result<(), BlobError> {
        let mut parts = PartReader::new(data, self.part_size);
        let first = parts.next_part().await?.unwrap_or_default();
        match parts.next_part().await? {
            None => {
                let size = first.len();
                self.put_single(id, first).await?;
                debug!(%id, size, "stored blob to s3");
                Ok(())
            }
            Some(second) => self.put_multipart(id, vec![first, second], parts).await,
        }
    }

    async fn delete(&self, id: &ObjectId) -> Result<(), BlobError> {
        // DeleteObject succeeds for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id.as_str())
            .send()
            .await
            .map_err(|e| sdk_error("delete_object", e))?;
        debug!(%id, "deleted blob from s3");
        Ok(())
    }

    async fn ping(&self) -> Result<(), BlobError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(format!("head_bucket: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

/// Classify an SDK failure: transport-level failures mean the service is
/// unreachable, everything else is a request the service refused.
fn sdk_error<E, R>(op: &str, err: SdkError<E, R>) -> BlobError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let unreachable = matches!(
        &err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    );
    let msg = format!("{op}: {}", DisplayErrorContext(&err));
    if unreachable {
        BlobError::Unavailable(msg)
    } else {
        BlobError::Backend(msg)
    }
}

/// Regroups an arbitrary chunked stream into upload parts of `part_size`
/// bytes. Only the final part may be shorter.
struct PartReader {
    stream: BlobStream,
    buf: BytesMut,
    part_size: usize,
    done: bool,
    total: u64,
}

impl PartReader {
    fn new(stream: BlobStream, part_size: usize) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
            part_size: part_size.max(1),
            done: false,
            total: 0,
        }
    }

    async fn next_part(&mut self) -> Result<Option<Bytes>, BlobError> {
        while !self.done && self.buf.len() < self.part_size {
            match self.stream.next().await {
                Some(chunk) => self.buf.extend_from_slice(&chunk?),
                None => self.done = true,
            }
        }
        if self.buf.is_empty() {
            return Ok(None);
        }
        let n = self.buf.len().min(self.part_size);
        self.total += n as u64;
        Ok(Some(self.buf.split_to(n).freeze()))
    }
}
