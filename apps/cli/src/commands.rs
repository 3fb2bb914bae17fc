//! The fetch command

use crate::output::print_outcome;
use crate::progress::spawn_renderer;
use crate::OutputFormat;
use anyhow::Result;
use console::style;
use grab_core::GrabCore;
use grab_types::TransferRequest;
use std::process::ExitCode;
use tracing::info;

/// Conventional exit status for SIGINT
const INTERRUPTED: u8 = 130;

/// Run one transfer, racing it against Ctrl-C
pub async fn fetch(core: &GrabCore, input: &str, format: OutputFormat) -> Result<ExitCode> {
    let renderer = match format {
        OutputFormat::Human => Some(spawn_renderer(core.subscribe())),
        OutputFormat::Json => None,
    };

    let outcome = tokio::select! {
        outcome = core.run(TransferRequest::new(input)) => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted by user");
            if let Some(renderer) = renderer {
                renderer.abort();
            }
            eprintln!(
                "{} Interrupted; partial files are left in {}",
                style("!").yellow().bold(),
                core.settings().save_dir.display()
            );
            return Ok(ExitCode::from(INTERRUPTED));
        }
    };

    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    print_outcome(&outcome, format)?;

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
