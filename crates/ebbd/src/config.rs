//! TOML configuration for the Ebb daemon.
//!
//! Every section is optional. With no file at all, blobs go to
//! `~/.ebb/blobs` and metadata to a local Redis.

use std::path::{Path, PathBuf};

use anyhow::bail;
use ebb_blob::S3Config;
use ebb_engine::DEFAULT_EXPIRE_SECONDS;

/// Longest accepted object lifetime: ten years.
pub const MAX_EXPIRE_SECONDS: u64 = 10 * 365 * 86_400;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Blob backend selection.
    pub blob: BlobSection,
    /// S3 connection settings (used by the `s3` blob backend).
    pub s3: S3Section,
    /// Metadata store selection and connection.
    pub metadata: MetadataSection,
    /// Object lifetime.
    pub expiry: ExpirySection,
    /// Logging configuration.
    pub log: LogSection,
}

/// Which blob backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    File,
    S3,
    Memory,
}

/// Which metadata backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaBackend {
    Redis,
    Memory,
}

/// `[blob]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlobSection {
    /// `"file"`, `"s3"` or `"memory"`. When omitted, `s3` is picked if an
    /// S3 bucket is configured and `file` otherwise.
    pub backend: Option<String>,
    /// Directory for the file backend.
    pub dir: Option<PathBuf>,
}

/// `[s3]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct S3Section {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint (MinIO, localstack, ...).
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Multipart part size in bytes.
    pub part_size: Option<usize>,
}

/// `[metadata]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    /// `"redis"` (default) or `"memory"`.
    pub backend: String,
    /// Redis connection URL.
    pub redis_url: String,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// `[expiry]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExpirySection {
    /// Lifetime of new objects, in seconds.
    pub seconds: Option<u64>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Resolve the blob backend.
    pub fn blob_backend(&self) -> anyhow::Result<BlobBackend> {
        match self.blob.backend.as_deref() {
            Some("file") => Ok(BlobBackend::File),
            Some("s3") => Ok(BlobBackend::S3),
            Some("memory") => Ok(BlobBackend::Memory),
            Some(other) => bail!("unknown blob backend {other:?} (expected file, s3 or memory)"),
            None if self.s3.bucket.is_some() => Ok(BlobBackend::S3),
            None => Ok(BlobBackend::File),
        }
    }

    /// Resolve the metadata backend.
    pub fn meta_backend(&self) -> anyhow::Result<MetaBackend> {
        match self.metadata.backend.as_str() {
            "redis" => Ok(MetaBackend::Redis),
            "memory" => Ok(MetaBackend::Memory),
            other => bail!("unknown metadata backend {other:?} (expected redis or memory)"),
        }
    }

    /// Effective blob directory for the file backend.
    pub fn blob_dir(&self) -> PathBuf {
        self.blob.dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".ebb"))
                .unwrap_or_else(|| PathBuf::from(".ebb"))
                .join("blobs")
        })
    }

    /// S3 settings; fails if no bucket is configured.
    pub fn s3_config(&self) -> anyhow::Result<S3Config> {
        let Some(bucket) = self.s3.bucket.clone() else {
            bail!("the s3 blob backend needs [s3] bucket");
        };
        let defaults = S3Config::default();
        Ok(S3Config {
            bucket,
            region: self.s3.region.clone(),
            endpoint: self.s3.endpoint.clone(),
            force_path_style: self.s3.force_path_style,
            part_size: self.s3.part_size.unwrap_or(defaults.part_size),
        })
    }

    /// Effective object lifetime in seconds (one day by default).
    ///
    /// Zero would delete every object as soon as it is stored, so it is
    /// rejected along with anything above [`MAX_EXPIRE_SECONDS`].
    pub fn expire_seconds(&self) -> anyhow::Result<u64> {
        let secs = self.expiry.seconds.unwrap_or(DEFAULT_EXPIRE_SECONDS);
        if secs == 0 {
            bail!("[expiry] seconds must be greater than zero");
        }
        if secs > MAX_EXPIRE_SECONDS {
            bail!("[expiry] seconds = {secs} exceeds the maximum of {MAX_EXPIRE_SECONDS}");
        }
        Ok(secs)
    }
}
