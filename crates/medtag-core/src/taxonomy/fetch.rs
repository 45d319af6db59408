//! One-time download of the IPTC Media Topics JSON.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{MedtagError, Result};

/// Download the taxonomy document from `url` to `dest`.
///
/// Returns `false` without touching the network when `dest` already exists;
/// the vocabulary is versioned by its content hash downstream, so a cached
/// file is never silently replaced. Streams to a `.part` file and renames on
/// completion, so an interrupted download never leaves a truncated document
/// behind. `timeout` bounds the whole transfer.
pub async fn download(url: &str, dest: &Path, timeout: Duration) -> Result<bool> {
    if dest.exists() {
        tracing::debug!("Taxonomy already cached at {dest:?}, skipping download");
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("Downloading taxonomy from {url}");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MedtagError::Download(format!("cannot build HTTP client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| MedtagError::Download(format!("request to {url} failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MedtagError::Download(format!("HTTP {status} from {url}")));
    }

    let part_path = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&part_path).await?;
    let mut stream = resp.bytes_stream();
    let mut total: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| MedtagError::Download(format!("stream interrupted: {e}")))?;
        total += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&part_path, dest).await?;

    tracing::info!("Taxonomy saved to {dest:?} ({total} bytes)");
    Ok(true)
}
