//! grab core - transfer orchestration engine
//!
//! Classifies an input (URL, magnet link or local torrent file), runs the
//! matching transfer and reduces every failure to a terminal
//! [`TransferOutcome`]. One transfer per call; progress is published as
//! [`CoreEvent`]s.

mod classify;
mod descriptor;
mod direct;
mod error;
mod filename;
mod http;
mod storage;
pub mod swarm;

pub use classify::*;
pub use descriptor::*;
pub use direct::*;
pub use error::*;
pub use filename::*;
pub use http::build_client;
pub use storage::*;

use grab_types::{CoreEvent, Settings, TransferKind, TransferOutcome, TransferRequest};
use std::path::PathBuf;
use std::sync::Arc;
use swarm::{RqbitProvider, SwarmProvider, SwarmTransfer};
use tokio::sync::broadcast;
use tracing::info;

/// The main grab core instance
#[derive(Clone)]
pub struct GrabCore {
    settings: Settings,
    event_tx: broadcast::Sender<CoreEvent>,
    direct: DirectTransfer,
    resolver: DescriptorResolver,
    swarm: SwarmTransfer,
}

impl GrabCore {
    /// Create a core backed by librqbit for torrent transfers
    pub fn new(settings: Settings) -> Result<Self, GrabError> {
        Self::with_provider(settings, Arc::new(RqbitProvider::new()))
    }

    /// Create a core with a specific torrent provider
    pub fn with_provider(
        settings: Settings,
        provider: Arc<dyn SwarmProvider>,
    ) -> Result<Self, GrabError> {
        let client = build_client(&settings)?;
        let (event_tx, _) = broadcast::channel(1000);

        let direct = DirectTransfer::new(
            client.clone(),
            SaveDirectory::new(settings.save_dir.clone()),
            settings.chunk_size,
            event_tx.clone(),
        );
        let resolver = DescriptorResolver::new(client);
        let swarm = SwarmTransfer::new(provider, &settings, event_tx.clone());

        Ok(Self {
            settings,
            event_tx,
            direct,
            resolver,
            swarm,
        })
    }

    /// Keep downloaded torrent files in `dir` instead of the system temp dir
    pub fn with_descriptor_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resolver = self.resolver.with_temp_dir(dir);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Subscribe to core events
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Run one request to completion
    pub async fn run(&self, request: TransferRequest) -> TransferOutcome {
        let outcome = self.dispatch(&request.raw_input).await;
        self.emit(CoreEvent::TransferFinished {
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn dispatch(&self, raw: &str) -> TransferOutcome {
        let kind = match classify(raw) {
            Ok(kind) => kind,
            Err(e) => return e.into(),
        };

        info!("Dispatching {}", kind);
        self.emit(CoreEvent::TransferStarted { kind: kind.clone() });

        match kind {
            TransferKind::DirectHttp(url) => self.direct.fetch_direct(&url).await,
            TransferKind::SwarmMagnet(_) | TransferKind::SwarmDescriptorFile(_) => {
                self.swarm.run_swarm_transfer(&kind).await
            }
            TransferKind::SwarmDescriptorUrl(url) => {
                let descriptor = match self.resolver.resolve_descriptor_url(&url).await {
                    Ok(descriptor) => descriptor,
                    Err(e) => return e.into(),
                };
                let local = TransferKind::SwarmDescriptorFile(descriptor.path().to_path_buf());
                let outcome = self.swarm.run_swarm_transfer(&local).await;
                // Removes the temporary torrent file
                drop(descriptor);
                outcome
            }
        }
    }
}
