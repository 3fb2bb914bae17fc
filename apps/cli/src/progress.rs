//! Terminal progress for a single transfer

use crate::output::format_speed;
use console::style;
use grab_types::{CoreEvent, ProgressSample, SwarmPhase};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Renders core events onto one indicatif bar
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn handle_event(&self, event: &CoreEvent) {
        match event {
            CoreEvent::TransferStarted { kind } => {
                if kind.is_swarm() {
                    self.bar.set_message(kind.to_string());
                } else {
                    self.bar.set_message("connecting");
                }
            }

            CoreEvent::PhaseChanged { phase } => {
                self.bar.set_message(phase.label());
            }

            CoreEvent::Progress { sample } => self.show_sample(sample),

            CoreEvent::TransferFinished { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }

    fn show_sample(&self, sample: &ProgressSample) {
        match sample.phase {
            SwarmPhase::Http => {
                // Direct samples are only sent when a length is declared
                let total = sample.bytes_total.unwrap_or(sample.bytes_done);
                if self.bar.length() != Some(total) {
                    self.bar.set_style(bar_style());
                    self.bar.set_length(total);
                }
                self.bar.set_position(sample.bytes_done);
            }
            _ => {
                let mut line = format!(
                    "{} {:.1}%  {} {}  {} {}",
                    style(sample.phase.label()).cyan(),
                    sample.percent(),
                    style("↓").green(),
                    format_speed(sample.download_rate_bps as u64),
                    style("↑").yellow(),
                    format_speed(sample.upload_rate_bps as u64),
                );
                if let Some(peers) = sample.peer_count {
                    line.push_str(&format!("  {} peers", peers));
                }
                self.bar.set_message(line);
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .map(|s| s.progress_chars("█▓▒░  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Follow the event stream until the transfer finishes
pub fn spawn_renderer(mut rx: broadcast::Receiver<CoreEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let progress = TransferProgress::new();
        loop {
            match rx.recv().await {
                Ok(event) => {
                    progress.handle_event(&event);
                    if matches!(event, CoreEvent::TransferFinished { .. }) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    progress.bar.finish_and_clear();
                    break;
                }
            }
        }
    })
}
