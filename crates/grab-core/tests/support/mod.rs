//! Shared helpers for integration tests: a scripted torrent provider and
//! settings pointed at temporary directories.

#![allow(dead_code)]

use async_trait::async_trait;
use grab_core::swarm::{
    SwarmProvider, SwarmSession, SwarmSessionOptions, SwarmSource, SwarmStatus, TransferHandle,
};
use grab_core::GrabError;
use grab_types::{CoreEvent, Settings};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// How the fake torrent behaves
#[derive(Debug, Clone)]
pub struct Script {
    /// Metadata arrives on this `has_metadata` call (1-based); `None` = never
    pub metadata_on_poll: Option<u32>,
    /// Completion is reported once this many status polls have happened
    pub complete_after: u32,
    pub state_code: i32,
    /// Status poll (1-based) that fails with a provider error
    pub fail_status_on: Option<u32>,
    pub fail_open: Option<String>,
    /// File created in the save dir on submit
    pub content_name: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            metadata_on_poll: Some(1),
            complete_after: 3,
            state_code: 3,
            fail_status_on: None,
            fail_open: None,
            content_name: Some("content.bin".to_string()),
        }
    }
}

/// Call counters shared between the provider and the test
#[derive(Debug, Default)]
pub struct Calls {
    pub sessions_opened: AtomicU32,
    pub submits: AtomicU32,
    pub metadata_polls: AtomicU32,
    pub status_polls: AtomicU32,
    pub shutdowns: AtomicU32,
    pub last_source: Mutex<Option<SwarmSource>>,
    pub last_options: Mutex<Option<SwarmSessionOptions>>,
}

impl Calls {
    pub fn get(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProvider {
    script: Script,
    pub calls: Arc<Calls>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: Arc::new(Calls::default()),
        })
    }
}

#[async_trait]
impl SwarmProvider for ScriptedProvider {
    async fn open_session(
        &self,
        options: &SwarmSessionOptions,
    ) -> Result<Box<dyn SwarmSession>, GrabError> {
        self.calls.sessions_opened.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_options.lock().unwrap() = Some(options.clone());
        if let Some(message) = &self.script.fail_open {
            return Err(GrabError::SwarmProvider(message.clone()));
        }
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct ScriptedSession {
    script: Script,
    calls: Arc<Calls>,
}

#[async_trait]
impl SwarmSession for ScriptedSession {
    async fn submit(
        &mut self,
        source: SwarmSource,
        save_dir: &Path,
    ) -> Result<Box<dyn TransferHandle>, GrabError> {
        self.calls.submits.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_source.lock().unwrap() = Some(source);

        let content = self.script.content_name.as_ref().map(|name| save_dir.join(name));
        if let Some(path) = &content {
            std::fs::write(path, b"swarm content").map_err(GrabError::Io)?;
        }

        Ok(Box::new(ScriptedHandle {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
            content,
        }))
    }

    async fn shutdown(self: Box<Self>) {
        self.calls.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedHandle {
    script: Script,
    calls: Arc<Calls>,
    content: Option<PathBuf>,
}

impl TransferHandle for ScriptedHandle {
    fn has_metadata(&self) -> Result<bool, GrabError> {
        let poll = self.calls.metadata_polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(matches!(self.script.metadata_on_poll, Some(n) if poll >= n))
    }

    fn is_complete(&self) -> Result<bool, GrabError> {
        Ok(Calls::get(&self.calls.status_polls) >= self.script.complete_after)
    }

    fn status(&self) -> Result<SwarmStatus, GrabError> {
        let poll = self.calls.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.script.fail_status_on == Some(poll) {
            return Err(GrabError::SwarmProvider("peer connection reset".to_string()));
        }
        let total = 1000u64;
        let done = (total * poll as u64 / self.script.complete_after.max(1) as u64).min(total);
        Ok(SwarmStatus {
            state_code: self.script.state_code,
            fraction_done: done as f64 / total as f64,
            download_rate_bps: 2048.0,
            upload_rate_bps: 0.0,
            peer_count: Some(4),
            bytes_done: done,
            bytes_total: Some(total),
        })
    }

    fn content_path(&self) -> Option<PathBuf> {
        self.content.clone()
    }
}

/// Settings with the save directory inside `dir`
pub fn settings_in(dir: &Path) -> Settings {
    Settings {
        save_dir: dir.join("downloads"),
        ..Settings::default()
    }
}

/// Drain every event currently buffered on a receiver
pub fn drain(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
