//! `ebbd`: command-line front end for the Ebb object coordinator.
//!
//! Each invocation connects to the configured blob and metadata stores,
//! runs one operation and disconnects.
//!
//! # Usage
//!
//! ```text
//! ebbd ping                                   # check both backends
//! ebbd put report.pdf ./report.pdf --owner t0k --field kind=pdf
//! ebbd get report.pdf -o ./copy.pdf           # or to stdout
//! ebbd head report.pdf                        # ttl, length, metadata
//! ebbd set-field report.pdf downloads 3
//! ebbd delete report.pdf --owner t0k
//! ebbd force-delete report.pdf
//! ebbd -c ebb.toml benchmark -n 200 -s 65536  # write/read benchmark
//! ```

mod config;
mod telemetry;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ebb_blob::{BlobStore, FileBlobStore, MemoryBlobStore, S3BlobStore, stream_from_bytes};
use ebb_engine::{Coordinator, CoordinatorConfig};
use ebb_meta::{MemoryMetaStore, MetadataStore, RedisMetaStore};
use ebb_types::{Metadata, ObjectId};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use config::{BlobBackend, CliConfig, MetaBackend};

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ebbd", version, about = "Ebb ephemeral object storage")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the file backend's blob directory.
    #[arg(long, global = true)]
    blob_dir: Option<PathBuf>,

    /// Override the Redis URL for the metadata store.
    #[arg(long, global = true, env = "EBB_REDIS_URL")]
    redis_url: Option<String>,

    /// Override the lifetime of new objects, in seconds.
    #[arg(long, global = true)]
    expire_seconds: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that both backends are reachable.
    Ping,

    /// Upload a file as a new object.
    Put {
        id: ObjectId,
        /// File to upload.
        path: PathBuf,
        /// Owner token required later by `delete`.
        #[arg(long)]
        owner: String,
        /// Extra metadata as `key=value`. Can be specified multiple times.
        #[arg(short, long, value_parser = parse_field)]
        field: Vec<(String, String)>,
    },

    /// Download an object.
    Get {
        id: ObjectId,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show an object's TTL, length and metadata.
    Head { id: ObjectId },

    /// Set a single metadata field.
    SetField {
        id: ObjectId,
        field: String,
        value: String,
    },

    /// Delete an object, checking the owner token.
    Delete {
        id: ObjectId,
        #[arg(long)]
        owner: String,
    },

    /// Delete an object without an ownership check.
    ForceDelete { id: ObjectId },

    /// Run a quick write/read/delete benchmark against the configured stores.
    Benchmark {
        /// Number of objects to write and read.
        #[arg(short = 'n', long, default_value = "100")]
        count: usize,

        /// Size of each object in bytes.
        #[arg(short, long, default_value = "10240")]
        size: usize,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    // CLI args override config file values.
    if let Some(dir) = cli.blob_dir {
        config.blob.dir = Some(dir);
    }
    if let Some(url) = cli.redis_url {
        config.metadata.redis_url = url;
    }
    if let Some(secs) = cli.expire_seconds {
        config.expiry.seconds = Some(secs);
    }

    telemetry::init(&config.log.level);

    let coord = build_coordinator(&config).await?;
    let result = run(&coord, cli.command).await;

    // Always release the metadata connection, even when the command failed.
    if let Err(e) = coord.quit().await {
        debug!(error = %e, "quit failed");
    }
    result
}

/// Build the blob and metadata stores selected by `config`.
async fn build_coordinator(config: &CliConfig) -> Result<Coordinator> {
    let blobs: Arc<dyn BlobStore> = match config.blob_backend()? {
        BlobBackend::File => {
            let dir = config.blob_dir();
            Arc::new(
                FileBlobStore::new(&dir)
                    .with_context(|| format!("failed to open blob dir {}", dir.display()))?,
            )
        }
        BlobBackend::S3 => Arc::new(
            S3BlobStore::new(config.s3_config()?)
                .await
                .context("failed to set up S3 client")?,
        ),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };

    let meta: Arc<dyn MetadataStore> = match config.meta_backend()? {
        MetaBackend::Redis => Arc::new(
            RedisMetaStore::connect(&config.metadata.redis_url)
                .await
                .with_context(|| format!("failed to connect to {}", config.metadata.redis_url))?,
        ),
        MetaBackend::Memory => Arc::new(MemoryMetaStore::new()),
    };

    Ok(Coordinator::new(
        CoordinatorConfig {
            expire_seconds: config.expire_seconds()?,
        },
        blobs,
        meta,
    ))
}

async fn run(coord: &Coordinator, command: Commands) -> Result<()> {
    match command {
        Commands::Ping => {
            coord.ping().await?;
            println!("ok");
            Ok(())
        }
        Commands::Put {
            id,
            path,
            owner,
            field,
        } => cmd_put(coord, &id, path, owner, field).await,
        Commands::Get { id, output } => cmd_get(coord, &id, output).await,
        Commands::Head { id } => cmd_head(coord, &id).await,
        Commands::SetField { id, field, value } => {
            coord.set_field(&id, &field, &value).await?;
            Ok(())
        }
        Commands::Delete { id, owner } => {
            coord.del(&id, &owner).await?;
            Ok(())
        }
        Commands::ForceDelete { id } => {
            coord.force_delete(&id).await?;
            Ok(())
        }
        Commands::Benchmark { count, size } => cmd_benchmark(coord, count, size).await,
    }
}

/// Parse a `key=value` metadata argument.
fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

async fn cmd_put(
    coord: &Coordinator,
    id: &ObjectId,
    path: PathBuf,
    owner: String,
    fields: Vec<(String, String)>,
) -> Result<()> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut metadata: Metadata = fields.into_iter().collect();
    // The owner flag wins over a `--field owner=...`.
    metadata.insert(ebb_types::OWNER_FIELD, owner);

    coord
        .set(id, ebb_blob::stream_from_reader(file), metadata)
        .await?;
    info!(%id, path = %path.display(), "uploaded");
    Ok(())
}

async fn cmd_get(coord: &Coordinator, id: &ObjectId, output: Option<PathBuf>) -> Result<()> {
    let mut stream = coord.get(id).await?;

    let mut out: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match &output {
        Some(p) => Box::new(
            tokio::fs::File::create(p)
                .await
                .with_context(|| format!("failed to create {}", p.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    debug!(%id, bytes = written, "download complete");
    Ok(())
}

async fn cmd_head(coord: &Coordinator, id: &ObjectId) -> Result<()> {
    if !coord.exists(id).await? {
        bail!("object {id} not found");
    }

    let ttl = coord.ttl(id).await?;
    let metadata = coord.metadata(id).await?;

    println!("id:     {id}");
    match ttl {
        Some(ms) => println!("ttl:    {:.1}s", ms as f64 / 1000.0),
        None => println!("ttl:    none"),
    }
    // The record can outlive its blob only on a partial delete.
    match coord.length(id).await {
        Ok(len) => println!("length: {len}"),
        Err(e) if e.is_not_found() => println!("length: (blob missing)"),
        Err(e) => return Err(e.into()),
    }
    for (k, v) in metadata.iter() {
        println!("  {k} = {v}");
    }
    Ok(())
}

async fn cmd_benchmark(coord: &Coordinator, count: usize, size: usize) -> Result<()> {
    println!("Ebb Benchmark");
    println!("  objects: {count}");
    println!("  size:    {size} bytes each");
    println!("  blobs:   {}", coord.blob_store().kind());
    println!("  meta:    {}", coord.metadata_store().kind());
    println!();

    let data = bytes_for_bench(size);
    let total_bytes = count as u64 * size as u64;
    let ids = (0..count)
        .map(|i| ObjectId::new(format!("bench-{i}")))
        .collect::<Result<Vec<_>, _>>()?;

    // --- Write ---
    print!("Writing {count} objects... ");
    std::io::stdout().flush()?;
    let start = Instant::now();
    for id in &ids {
        coord
            .set(id, stream_from_bytes(data.clone()), Metadata::with_owner("bench"))
            .await?;
    }
    let write_dur = start.elapsed();
    let write_mbs = total_bytes as f64 / write_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({write_mbs:.1} MB/s)", write_dur.as_secs_f64());

    // --- Read ---
    print!("Reading {count} objects... ");
    std::io::stdout().flush()?;
    let start = Instant::now();
    for id in &ids {
        let blob = ebb_blob::collect_stream(coord.get(id).await?).await?;
        if blob.len() != size {
            bail!("object {id} read back {} bytes, expected {size}", blob.len());
        }
    }
    let read_dur = start.elapsed();
    let read_mbs = total_bytes as f64 / read_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({read_mbs:.1} MB/s)", read_dur.as_secs_f64());

    // --- Cleanup ---
    print!("Deleting {count} objects... ");
    std::io::stdout().flush()?;
    let start = Instant::now();
    for id in &ids {
        coord.del(id, "bench").await?;
    }
    println!("{:.2}s", start.elapsed().as_secs_f64());

    println!();
    println!("Summary:");
    println!("  Write throughput: {write_mbs:.1} MB/s");
    println!("  Read throughput:  {read_mbs:.1} MB/s");
    println!(
        "  Total data:       {:.1} MB",
        total_bytes as f64 / 1_048_576.0
    );

    Ok(())
}

/// Deterministic payload for benchmarking.
fn bytes_for_bench(size: usize) -> bytes::Bytes {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data.into()
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
