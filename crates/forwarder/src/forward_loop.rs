//! The READ → COMPOSE → SEND → SLEEP cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{ErrorKind, ForwardError, error_chain};
use crate::payload::build_payload;
use crate::types::{ErrorPolicy, ForwardSettings, Target};
use crate::webhook::WebhookSink;

/// Polls every target once per cycle and posts the result.
///
/// Targets are fixed at construction. Reads and posts run one at a time in
/// declaration order; the first failure aborts the rest of the cycle.
pub struct Forwarder {
    vin: String,
    targets: Vec<Target>,
    sink: Arc<dyn WebhookSink>,
    settings: ForwardSettings,
}

impl Forwarder {
    pub fn new(
        vin: impl Into<String>,
        targets: Vec<Target>,
        sink: Arc<dyn WebhookSink>,
        settings: ForwardSettings,
    ) -> Self {
        Self {
            vin: vin.into(),
            targets,
            sink,
            settings,
        }
    }

    /// Runs cycles until `cancel` fires or, under
    /// [`ErrorPolicy::Terminate`], a cycle fails.
    ///
    /// Cancellation is observed between targets and during sleeps, never in
    /// the middle of a read or a post. Returns `Ok(())` on shutdown and the
    /// failing error when the loop stopped on it.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ForwardError> {
        info!(
            targets = self.targets.len(),
            policy = ?self.settings.on_error,
            interval = ?self.settings.send_interval,
            "forwarding started"
        );

        let mut cycle: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                log_shutdown(cycle);
                return Ok(());
            }
            cycle += 1;

            let pause = match self.run_cycle(&cancel).await {
                Ok(()) => self.settings.send_interval,
                Err(e) if e.kind() == ErrorKind::Cancelled => {
                    log_shutdown(cycle);
                    return Ok(());
                }
                Err(e) => match self.settings.on_error {
                    ErrorPolicy::Terminate => {
                        error!(cycle, kind = ?e.kind(), error = %e, "unhandled error, stopping");
                        return Err(e);
                    }
                    ErrorPolicy::Resume => {
                        error!(
                            cycle,
                            kind = ?e.kind(),
                            error = %error_chain(&e),
                            detail = ?e,
                            backoff = ?self.settings.error_backoff,
                            "cycle failed, resuming after backoff"
                        );
                        self.settings.error_backoff
                    }
                },
            };

            if !sleep_unless_cancelled(pause, &cancel).await {
                log_shutdown(cycle);
                return Ok(());
            }
        }
    }

    /// Reads, composes and posts every target once.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), ForwardError> {
        for target in &self.targets {
            if cancel.is_cancelled() {
                return Err(ForwardError::Cancelled);
            }

            info!(route = %target.name, url = %target.url, "sending {}", target.field);
            debug!(route = %target.name, source = %target.source.describe(), "reading");
            let value = target.source.read(self.settings.read_timeout).await?;
            let body = build_payload(&self.vin, &target.field, value);
            self.sink.post(&target.url, &body).await?;
        }
        Ok(())
    }
}

/// Sleeps for `pause`; returns `false` if cancelled first.
async fn sleep_unless_cancelled(pause: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

fn log_shutdown(cycles: u64) {
    info!(cycles, "received interrupt, shutting down");
}
