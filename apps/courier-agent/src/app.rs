//! Application orchestrator: wires the upload service to the outbox tasks and
//! feeds it the requests given on the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use courier_upload_service::{StartRequest, StatusEvent, StatusMessage, UploadService};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::Config;
use crate::surface::{LogSurface, ProcessLock};
use crate::tasks::OutboxFactory;

/// How the submitted requests ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl Summary {
    fn record(&mut self, event: &StatusEvent) {
        if event.is_failure() {
            self.failed += 1;
        } else {
            self.completed += 1;
        }
    }
}

/// Runs every request in order until done or until Ctrl-C.
pub async fn run(config: Config, requests: Vec<PathBuf>) -> anyhow::Result<Summary> {
    let factory = Arc::new(OutboxFactory::new(&config.outbox_dir, config.chunk_size));
    let service = UploadService::spawn(
        config.service.clone(),
        factory,
        Arc::new(LogSurface),
        Arc::new(ProcessLock::default()),
    );
    let mut events = service.subscribe();
    let mut summary = Summary::default();

    tracing::info!(requests = requests.len(), "agent ready");

    let result = tokio::select! {
        r = submit_all(&service, &mut events, &requests, &mut summary) => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, cancelling active upload");
            service.cancel().await;
            Ok(())
        }
    };

    // Waits for the cancelled upload to report before stopping.
    service.shutdown().await;
    while let Ok(event) = events.try_recv() {
        log_event(&event);
        if event.is_terminal() {
            summary.record(&event);
        }
    }

    result.map(|()| summary)
}

async fn submit_all(
    service: &UploadService,
    events: &mut broadcast::Receiver<StatusEvent>,
    requests: &[PathBuf],
    summary: &mut Summary,
) -> anyhow::Result<()> {
    for path in requests {
        let request = match load_request(path) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable request");
                summary.rejected += 1;
                continue;
            }
        };

        match service.start(request).await {
            Ok(started) => {
                tracing::info!(
                    upload_id = %started.upload_id,
                    kind = %started.kind,
                    path = %path.display(),
                    "request accepted"
                );
                let event = wait_terminal(events, &started.upload_id).await?;
                summary.record(&event);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "request rejected");
                summary.rejected += 1;
            }
        }
    }
    Ok(())
}

fn load_request(path: &Path) -> anyhow::Result<StartRequest> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Logs events until the terminal event of `upload_id` arrives.
async fn wait_terminal(
    events: &mut broadcast::Receiver<StatusEvent>,
    upload_id: &str,
) -> anyhow::Result<StatusEvent> {
    loop {
        match events.recv().await {
            Ok(event) => {
                log_event(&event);
                if event.is_terminal() && event.upload_id() == upload_id {
                    return Ok(event);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "status subscriber lagged");
            }
            Err(RecvError::Closed) => anyhow::bail!("status channel closed"),
        }
    }
}

fn log_event(event: &StatusEvent) {
    match StatusMessage::encode(event) {
        Ok(json) => tracing::info!(upload_id = %event.upload_id(), wire = %json, "status"),
        Err(e) => tracing::error!("failed to encode status: {e}"),
    }
}
