//! Shared types for grab
//!
//! This crate contains the data model shared between the transfer engine
//! and the command-line front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Request / Classification
// ============================================================================

/// A single transfer request, built from the CLI argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub raw_input: String,
}

impl TransferRequest {
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
        }
    }
}

/// Which pathway a request takes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum TransferKind {
    DirectHttp(String),
    SwarmMagnet(String),
    SwarmDescriptorUrl(String),
    SwarmDescriptorFile(PathBuf),
}

impl TransferKind {
    /// True for the two variants the swarm engine accepts directly
    pub fn is_swarm(&self) -> bool {
        !matches!(self, TransferKind::DirectHttp(_))
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::DirectHttp(url) => write!(f, "direct download {}", url),
            TransferKind::SwarmMagnet(uri) => write!(f, "magnet {}", uri),
            TransferKind::SwarmDescriptorUrl(url) => write!(f, "torrent url {}", url),
            TransferKind::SwarmDescriptorFile(path) => {
                write!(f, "torrent file {}", path.display())
            }
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Error taxonomy surfaced in a failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unresolvable,
    Http,
    Io,
    NotFound,
    InvalidDescriptor,
    MetadataTimeout,
    SwarmProvider,
}

/// Error details carried by a failed outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Terminal result of a transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub success: bool,
    pub saved_path: Option<PathBuf>,
    pub bytes_transferred: Option<u64>,
    pub error: Option<TransferError>,
    pub finished_at: DateTime<Utc>,
}

impl TransferOutcome {
    pub fn completed(saved_path: PathBuf, bytes_transferred: Option<u64>) -> Self {
        Self {
            success: true,
            saved_path: Some(saved_path),
            bytes_transferred,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            saved_path: None,
            bytes_transferred: None,
            error: Some(TransferError {
                kind,
                message: message.into(),
            }),
            finished_at: Utc::now(),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Lifecycle stage of a transfer
///
/// Swarm providers report a numeric state code; `from_code` decouples the
/// engine from any one provider's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmPhase {
    Queued,
    Checking,
    DownloadingMetadata,
    Downloading,
    Finished,
    Seeding,
    Allocating,
    /// Out-of-range provider code
    Unknown,
    /// Direct HTTP transfers have a single phase
    Http,
}

impl SwarmPhase {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SwarmPhase::Queued,
            1 => SwarmPhase::Checking,
            2 => SwarmPhase::DownloadingMetadata,
            3 => SwarmPhase::Downloading,
            4 => SwarmPhase::Finished,
            5 => SwarmPhase::Seeding,
            6 => SwarmPhase::Allocating,
            _ => SwarmPhase::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SwarmPhase::Queued => "Queued",
            SwarmPhase::Checking => "Checking",
            SwarmPhase::DownloadingMetadata => "Metadata",
            SwarmPhase::Downloading => "Downloading",
            SwarmPhase::Finished => "Finished",
            SwarmPhase::Seeding => "Seeding",
            SwarmPhase::Allocating => "Allocating",
            SwarmPhase::Unknown => "Unknown",
            SwarmPhase::Http => "Downloading",
        }
    }
}

impl fmt::Display for SwarmPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One progress observation; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// In [0, 1]
    pub fraction_done: f64,
    pub download_rate_bps: f64,
    pub upload_rate_bps: f64,
    pub peer_count: Option<u32>,
    pub phase: SwarmPhase,
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
}

impl ProgressSample {
    /// Progress of a direct transfer with a declared length
    pub fn http(bytes_done: u64, bytes_total: u64, download_rate_bps: f64) -> Self {
        let fraction_done = if bytes_total == 0 {
            0.0
        } else {
            (bytes_done as f64 / bytes_total as f64).clamp(0.0, 1.0)
        };
        Self {
            fraction_done,
            download_rate_bps,
            upload_rate_bps: 0.0,
            peer_count: None,
            phase: SwarmPhase::Http,
            bytes_done,
            bytes_total: Some(bytes_total),
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction_done * 100.0
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Events emitted by the core to the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    TransferStarted { kind: TransferKind },
    PhaseChanged { phase: SwarmPhase },
    Progress { sample: ProgressSample },
    TransferFinished { outcome: TransferOutcome },
}

// ============================================================================
// Settings Types
// ============================================================================

/// Firefox on Windows; some hosts refuse non-browser clients
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Engine configuration, passed to every component at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where fetched content lands
    pub save_dir: PathBuf,
    pub user_agent: String,
    /// Copy granularity for direct transfers with a declared length
    pub chunk_size: usize,
    pub connect_timeout_secs: u64,
    /// How long a swarm transfer may wait for metadata
    pub metadata_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub listen_port_start: u16,
    pub listen_port_end: u16,
    pub enable_dht: bool,
    pub enable_local_discovery: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("./downloads"),
            user_agent: BROWSER_USER_AGENT.to_string(),
            chunk_size: 8 * 1024,
            connect_timeout_secs: 30,
            metadata_timeout_secs: 60,
            poll_interval_ms: 1000,
            listen_port_start: 6881,
            listen_port_end: 6891,
            enable_dht: true,
            enable_local_discovery: true,
        }
    }
}

impl Settings {
    /// Check the values the engine cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than zero".to_string());
        }
        if self.listen_port_start >= self.listen_port_end {
            return Err(format!(
                "listen port range {}..{} is empty",
                self.listen_port_start, self.listen_port_end
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        Ok(())
    }
}
