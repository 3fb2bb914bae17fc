//! Provider-agnostic interface to a BitTorrent engine

use crate::error::GrabError;
use async_trait::async_trait;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Session construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwarmSessionOptions {
    pub listen_ports: Range<u16>,
    /// Bootstrap peers through the public DHT
    pub enable_dht: bool,
    /// Discover peers on the local network
    pub enable_local_discovery: bool,
}

/// What gets handed to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwarmSource {
    Magnet(String),
    /// Raw torrent file bytes, already checked not to be HTML
    Descriptor(Vec<u8>),
}

/// Point-in-time status of a transfer handle
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmStatus {
    /// 0 queued, 1 checking, 2 metadata, 3 downloading, 4 finished,
    /// 5 seeding, 6 allocating
    pub state_code: i32,
    pub fraction_done: f64,
    pub download_rate_bps: f64,
    pub upload_rate_bps: f64,
    pub peer_count: Option<u32>,
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
}

#[async_trait]
pub trait SwarmProvider: Send + Sync {
    async fn open_session(
        &self,
        options: &SwarmSessionOptions,
    ) -> Result<Box<dyn SwarmSession>, GrabError>;
}

#[async_trait]
pub trait SwarmSession: Send {
    /// Register a transfer; content lands in `save_dir`
    async fn submit(
        &mut self,
        source: SwarmSource,
        save_dir: &Path,
    ) -> Result<Box<dyn TransferHandle>, GrabError>;

    async fn shutdown(self: Box<Self>);
}

pub trait TransferHandle: Send + Sync {
    fn has_metadata(&self) -> Result<bool, GrabError>;

    fn is_complete(&self) -> Result<bool, GrabError>;

    fn status(&self) -> Result<SwarmStatus, GrabError>;

    /// Where the content ended up, once metadata names it
    fn content_path(&self) -> Option<PathBuf>;
}
