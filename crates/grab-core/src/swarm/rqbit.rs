//! librqbit-backed swarm provider
//!
//! librqbit resolves magnet metadata inside `add_torrent`, so the add runs on a
//! background task and the handle reports "no metadata" until it lands.

use super::provider::{
    SwarmProvider, SwarmSession, SwarmSessionOptions, SwarmSource, SwarmStatus, TransferHandle,
};
use crate::error::GrabError;
use async_trait::async_trait;
use librqbit::{
    AddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session, SessionOptions,
    TorrentStatsState,
};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const STATE_QUEUED: i32 = 0;
const STATE_CHECKING: i32 = 1;
const STATE_DOWNLOADING: i32 = 3;
const STATE_FINISHED: i32 = 4;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

type AddResult = Result<Arc<ManagedTorrent>, String>;

/// Opens librqbit sessions
#[derive(Debug, Default, Clone)]
pub struct RqbitProvider;

impl RqbitProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SwarmProvider for RqbitProvider {
    async fn open_session(
        &self,
        options: &SwarmSessionOptions,
    ) -> Result<Box<dyn SwarmSession>, GrabError> {
        if options.enable_local_discovery {
            debug!("Local peer discovery is not offered by librqbit; using DHT and trackers");
        }

        let session_opts = SessionOptions {
            disable_dht: !options.enable_dht,
            // A one-shot CLI has no use for a persisted routing table
            disable_dht_persistence: true,
            disable_upload: true,
            listen_port_range: Some(options.listen_ports.clone()),
            ..Default::default()
        };

        // Per-torrent output folders are set on submit
        let session = Session::new_with_opts(std::env::temp_dir(), session_opts)
            .await
            .map_err(GrabError::provider)?;

        Ok(Box::new(RqbitSession { session }))
    }
}

struct RqbitSession {
    session: Arc<Session>,
}

#[async_trait]
impl SwarmSession for RqbitSession {
    async fn submit(
        &mut self,
        source: SwarmSource,
        save_dir: &Path,
    ) -> Result<Box<dyn TransferHandle>, GrabError> {
        let add = match source {
            SwarmSource::Magnet(uri) => AddTorrent::from_url(uri),
            SwarmSource::Descriptor(bytes) => AddTorrent::from_bytes(bytes),
        };
        let opts = AddTorrentOptions {
            overwrite: true,
            output_folder: Some(save_dir.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let added: Arc<OnceLock<AddResult>> = Arc::new(OnceLock::new());
        let slot = Arc::clone(&added);
        let session = Arc::clone(&self.session);

        let task = tokio::spawn(async move {
            let result = match session.add_torrent(add, Some(opts)).await {
                Ok(AddTorrentResponse::Added(_, handle))
                | Ok(AddTorrentResponse::AlreadyManaged(_, handle)) => Ok(handle),
                Ok(AddTorrentResponse::ListOnly(_)) => {
                    Err("engine returned a list-only response".to_string())
                }
                Err(e) => Err(format!("{:#}", e)),
            };
            let _ = slot.set(result);
        });

        Ok(Box::new(RqbitHandle {
            added,
            task,
            save_dir: save_dir.to_path_buf(),
        }))
    }

    async fn shutdown(self: Box<Self>) {
        info!("Stopping torrent session");
        self.session.stop().await;
    }
}

struct RqbitHandle {
    added: Arc<OnceLock<AddResult>>,
    task: JoinHandle<()>,
    save_dir: PathBuf,
}

impl RqbitHandle {
    fn torrent(&self) -> Result<Option<&Arc<ManagedTorrent>>, GrabError> {
        match self.added.get() {
            None => Ok(None),
            Some(Ok(handle)) => Ok(Some(handle)),
            Some(Err(message)) => Err(GrabError::SwarmProvider(message.clone())),
        }
    }

    fn require_torrent(&self) -> Result<&Arc<ManagedTorrent>, GrabError> {
        self.torrent()?
            .ok_or_else(|| GrabError::SwarmProvider("torrent metadata not available yet".to_string()))
    }
}

impl Drop for RqbitHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TransferHandle for RqbitHandle {
    fn has_metadata(&self) -> Result<bool, GrabError> {
        Ok(self.torrent()?.is_some())
    }

    fn is_complete(&self) -> Result<bool, GrabError> {
        Ok(self.require_torrent()?.stats().finished)
    }

    fn status(&self) -> Result<SwarmStatus, GrabError> {
        let stats = self.require_torrent()?.stats();

        let state_code = match stats.state {
            TorrentStatsState::Initializing => STATE_CHECKING,
            TorrentStatsState::Paused => STATE_QUEUED,
            TorrentStatsState::Live if stats.finished => STATE_FINISHED,
            TorrentStatsState::Live => STATE_DOWNLOADING,
            TorrentStatsState::Error => {
                return Err(GrabError::SwarmProvider(
                    stats.error.unwrap_or_else(|| "unknown torrent error".to_string()),
                ))
            }
        };

        let fraction_done = if stats.total_bytes > 0 {
            stats.progress_bytes as f64 / stats.total_bytes as f64
        } else {
            0.0
        };

        let (download_rate_bps, upload_rate_bps, peer_count) = match &stats.live {
            Some(live) => (
                live.download_speed.mbps * BYTES_PER_MIB,
                live.upload_speed.mbps * BYTES_PER_MIB,
                Some(live.snapshot.peer_stats.live as u32),
            ),
            None => (0.0, 0.0, None),
        };

        Ok(SwarmStatus {
            state_code,
            fraction_done,
            download_rate_bps,
            upload_rate_bps,
            peer_count,
            bytes_done: stats.progress_bytes,
            bytes_total: (stats.total_bytes > 0).then_some(stats.total_bytes),
        })
    }

    fn content_path(&self) -> Option<PathBuf> {
        let torrent = self.torrent().ok()??;
        torrent
            .with_metadata(|m| {
                // Multi-file torrents report their largest file
                m.file_infos
                    .iter()
                    .filter(|f| is_safe_relative(&f.relative_filename))
                    .max_by_key(|f| f.len)
                    .map(|f| self.save_dir.join(&f.relative_filename))
            })
            .ok()
            .flatten()
    }
}

fn is_safe_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}
