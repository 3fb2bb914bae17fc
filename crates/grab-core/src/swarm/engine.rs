//! Swarm transfer engine - drives one torrent through a provider session
//!
//! Per-handle lifecycle:
//!
//! ```text
//! AwaitingMetadata --metadata--> Transferring --complete--> Completed
//!        |
//!        +-- timeout --> TimedOut
//! ```
//!
//! Any provider error ends the transfer. Nothing is retried and the engine
//! never seeds: it returns as soon as completion is observed.

use super::provider::{SwarmProvider, SwarmSession, SwarmSessionOptions, SwarmSource, TransferHandle};
use crate::descriptor::read_validated_descriptor;
use crate::error::GrabError;
use crate::storage::SaveDirectory;
use grab_types::{CoreEvent, ProgressSample, Settings, SwarmPhase, TransferKind, TransferOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferState {
    AwaitingMetadata,
    Transferring,
    Completed,
}

/// Runs magnet and torrent-file transfers against a [`SwarmProvider`]
#[derive(Clone)]
pub struct SwarmTransfer {
    provider: Arc<dyn SwarmProvider>,
    save_dir: SaveDirectory,
    session_options: SwarmSessionOptions,
    metadata_timeout: Duration,
    poll_interval: Duration,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl SwarmTransfer {
    pub fn new(
        provider: Arc<dyn SwarmProvider>,
        settings: &Settings,
        event_tx: broadcast::Sender<CoreEvent>,
    ) -> Self {
        Self {
            provider,
            save_dir: SaveDirectory::new(settings.save_dir.clone()),
            session_options: SwarmSessionOptions {
                listen_ports: settings.listen_port_start..settings.listen_port_end,
                enable_dht: settings.enable_dht,
                enable_local_discovery: settings.enable_local_discovery,
            },
            metadata_timeout: Duration::from_secs(settings.metadata_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            event_tx,
        }
    }

    /// Run a magnet or torrent-file transfer to a terminal outcome
    pub async fn run_swarm_transfer(&self, kind: &TransferKind) -> TransferOutcome {
        match self.run(kind).await {
            Ok((path, bytes)) => TransferOutcome::completed(path, bytes),
            Err(e) => {
                warn!("Torrent transfer failed: {}", e);
                e.into()
            }
        }
    }

    async fn run(&self, kind: &TransferKind) -> Result<(PathBuf, Option<u64>), GrabError> {
        let source = match kind {
            TransferKind::SwarmMagnet(uri) => SwarmSource::Magnet(uri.clone()),
            TransferKind::SwarmDescriptorFile(path) => {
                // Validate before a session exists so a bad file leaves no trace
                SwarmSource::Descriptor(read_validated_descriptor(path).await?)
            }
            other => {
                return Err(GrabError::Unresolvable(format!(
                    "{} is not a torrent source",
                    other
                )))
            }
        };

        let save_dir = self.save_dir.ensure_exists().await?.to_path_buf();

        info!(
            "Opening torrent session (ports {:?}, dht: {}, local discovery: {})",
            self.session_options.listen_ports,
            self.session_options.enable_dht,
            self.session_options.enable_local_discovery
        );
        let mut session = self.provider.open_session(&self.session_options).await?;

        let result = self.submit_and_drive(session.as_mut(), source, &save_dir).await;
        session.shutdown().await;
        result
    }

    async fn submit_and_drive(
        &self,
        session: &mut dyn SwarmSession,
        source: SwarmSource,
        save_dir: &Path,
    ) -> Result<(PathBuf, Option<u64>), GrabError> {
        let handle = session.submit(source, save_dir).await?;
        let bytes = self.drive(handle.as_ref()).await?;
        let path = saved_file(handle.content_path(), save_dir)?;
        Ok((path, bytes))
    }

    /// Poll a handle until it completes, times out or errors
    async fn drive(&self, handle: &dyn TransferHandle) -> Result<Option<u64>, GrabError> {
        let max_metadata_polls = max_polls(self.metadata_timeout, self.poll_interval);
        let mut state = TransferState::AwaitingMetadata;
        let mut metadata_polls = 0u32;
        let mut last_phase: Option<SwarmPhase> = None;
        let mut bytes = None;

        self.emit_phase(&mut last_phase, SwarmPhase::DownloadingMetadata);

        loop {
            match state {
                TransferState::AwaitingMetadata => {
                    if handle.has_metadata()? {
                        info!("Torrent metadata received after {} polls", metadata_polls);
                        state = TransferState::Transferring;
                        continue;
                    }

                    metadata_polls += 1;
                    if metadata_polls > max_metadata_polls {
                        return Err(GrabError::MetadataTimeout(self.metadata_timeout.as_secs()));
                    }
                    debug!("Waiting for metadata ({}/{})", metadata_polls, max_metadata_polls);
                    tokio::time::sleep(self.poll_interval).await;
                }
                TransferState::Transferring => {
                    let status = handle.status()?;
                    let phase = SwarmPhase::from_code(status.state_code);
                    self.emit_phase(&mut last_phase, phase);

                    bytes = status.bytes_total.or(Some(status.bytes_done));
                    let sample = ProgressSample {
                        fraction_done: status.fraction_done.clamp(0.0, 1.0),
                        download_rate_bps: status.download_rate_bps,
                        upload_rate_bps: status.upload_rate_bps,
                        peer_count: status.peer_count,
                        phase,
                        bytes_done: status.bytes_done,
                        bytes_total: status.bytes_total,
                    };
                    debug!(
                        "{} {:.1}% down {:.0} B/s up {:.0} B/s peers {:?}",
                        phase,
                        sample.percent(),
                        sample.download_rate_bps,
                        sample.upload_rate_bps,
                        sample.peer_count
                    );
                    let _ = self.event_tx.send(CoreEvent::Progress { sample });

                    if handle.is_complete()? {
                        state = TransferState::Completed;
                        continue;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                TransferState::Completed => {
                    info!("Torrent transfer complete");
                    return Ok(bytes);
                }
            }
        }
    }

    fn emit_phase(&self, last: &mut Option<SwarmPhase>, phase: SwarmPhase) {
        if *last != Some(phase) {
            debug!("Torrent phase: {}", phase);
            *last = Some(phase);
            let _ = self.event_tx.send(CoreEvent::PhaseChanged { phase });
        }
    }
}

/// The reported content must be an existing file inside the save directory
fn saved_file(reported: Option<PathBuf>, save_dir: &Path) -> Result<PathBuf, GrabError> {
    let path = reported.ok_or_else(|| {
        GrabError::SwarmProvider("transfer finished but no content file was reported".to_string())
    })?;
    if !path.starts_with(save_dir) {
        return Err(GrabError::SwarmProvider(format!(
            "content {} is outside {}",
            path.display(),
            save_dir.display()
        )));
    }
    if !path.is_file() {
        return Err(GrabError::SwarmProvider(format!(
            "content {} is not a file",
            path.display()
        )));
    }
    Ok(path)
}

/// Metadata polls allowed before giving up
fn max_polls(timeout: Duration, interval: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    (timeout.as_millis() / interval_ms).min(u32::MAX as u128) as u32
}
