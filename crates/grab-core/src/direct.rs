//! Direct transfer engine - streams one HTTP(S) resource to disk
//!
//! Single attempt, no resume. When the server declares a length the body is
//! copied in `chunk_size` pieces with a progress sample after each piece;
//! otherwise it is read in one go.

use crate::error::GrabError;
use crate::filename::derive_filename;
use crate::http::{declared_length, ensure_success};
use crate::storage::SaveDirectory;
use futures::StreamExt;
use grab_types::{CoreEvent, ProgressSample, TransferOutcome};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Fetches plain HTTP(S) resources into the save directory
#[derive(Debug, Clone)]
pub struct DirectTransfer {
    client: Client,
    save_dir: SaveDirectory,
    chunk_size: usize,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl DirectTransfer {
    pub fn new(
        client: Client,
        save_dir: SaveDirectory,
        chunk_size: usize,
        event_tx: broadcast::Sender<CoreEvent>,
    ) -> Self {
        Self {
            client,
            save_dir,
            chunk_size: chunk_size.max(1),
            event_tx,
        }
    }

    /// Download `url`, converting any failure into a failed outcome
    pub async fn fetch_direct(&self, url: &str) -> TransferOutcome {
        match self.download(url).await {
            Ok((path, bytes)) => TransferOutcome::completed(path, Some(bytes)),
            Err(e) => {
                warn!("Direct download of {} failed: {}", url, e);
                e.into()
            }
        }
    }

    /// Download `url`, returning the saved path and byte count
    pub async fn download(&self, url: &str) -> Result<(PathBuf, u64), GrabError> {
        info!("Starting direct download: {}", url);

        let response = self.client.get(url).send().await?;
        let response = ensure_success(response)?;

        let content_disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let filename = derive_filename(content_disposition.as_deref(), response.url().as_str());
        let total = declared_length(&response).filter(|len| *len > 0);

        self.save_dir.ensure_exists().await?;
        let dest = self.save_dir.join(&filename);
        info!(
            "Saving {} to {} (declared length: {:?})",
            url,
            dest.display(),
            total
        );

        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            warn!("Replacing existing file {}", dest.display());
        }
        let mut file = File::create(&dest).await?;

        let written = match total {
            Some(total) => {
                let started = Instant::now();
                let mut written = 0u64;
                let mut stream = response.bytes_stream();

                while let Some(chunk_result) = stream.next().await {
                    let chunk = chunk_result?;
                    for piece in chunk.chunks(self.chunk_size) {
                        file.write_all(piece).await?;
                        written += piece.len() as u64;

                        let elapsed = started.elapsed().as_secs_f64();
                        let rate = if elapsed > 0.0 {
                            written as f64 / elapsed
                        } else {
                            0.0
                        };
                        let _ = self.event_tx.send(CoreEvent::Progress {
                            sample: ProgressSample::http(written, total, rate),
                        });
                    }
                }

                if written != total {
                    warn!(
                        "Server declared {} bytes for {} but sent {}",
                        total, url, written
                    );
                }
                written
            }
            None => {
                debug!("No usable Content-Length for {}, reading whole body", url);
                let body = response.bytes().await?;
                file.write_all(&body).await?;
                body.len() as u64
            }
        };

        file.flush().await?;
        file.sync_all().await?;

        info!("Direct download complete: {} ({} bytes)", dest.display(), written);
        Ok((dest, written))
    }
}
