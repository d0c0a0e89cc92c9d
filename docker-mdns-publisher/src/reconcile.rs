use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use anyhow::{bail, Context, Result};
use shared::protocol::LABEL_PUBLISH;
use shared::types::{ContainerDescriptor, RuntimeEvent};
use crate::engine::PublicationEngine;
use crate::error::{Ignored, Outcome};
use crate::labels;
use crate::mdns::Announcer;
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Feeds the engine: first the containers already running, then the live
/// event stream, one item at a time.
pub struct ReconciliationLoop<R, A: Announcer> {
    runtime: R,
    engine: PublicationEngine<A>,
    verbose: bool,
}

impl<R: ContainerRuntime, A: Announcer> ReconciliationLoop<R, A> {
    pub fn new(runtime: R, engine: PublicationEngine<A>, verbose: bool) -> Self {
        Self {
            runtime,
            engine,
            verbose,
        }
    }

    pub fn engine(&self) -> &PublicationEngine<A> {
        &self.engine
    }

    /// Run until cancelled (`Ok`) or until the runtime fails in a way the
    /// daemon cannot recover from (`Err`). Teardown is left to
    /// [`ReconciliationLoop::shutdown`].
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        // Open the stream before listing: anything that starts during the
        // listing shows up on the stream too. Seeing it twice is harmless.
        let mut events = self.runtime.events();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Cancelled during startup enumeration");
                return Ok(());
            }
            result = self.enumerate() => {
                result?;
            }
        }

        tracing::debug!("Waiting for container start/die...");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Event loop shutting down");
                    return Ok(());
                }
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        let summary = format!("{} {}", event.action, event.actor_id.short());
                        let outcome = self.handle_event(event).await;
                        if !outcome.is_noop() {
                            tracing::debug!(
                                "Event {}: {} published, {} withdrawn, {} ignored",
                                summary,
                                outcome.published.len(),
                                outcome.withdrawn.len(),
                                outcome.ignored.len()
                            );
                        }
                    }
                    Some(Err(source)) => {
                        Ignored::BadEvent { source }.log();
                    }
                    None => bail!("Container event stream closed"),
                },
            }
        }
    }

    /// Publish every running container that carries the publish label
    pub async fn enumerate(&mut self) -> Result<Outcome> {
        tracing::debug!("Registering running containers...");
        let containers = self
            .runtime
            .list_containers(LABEL_PUBLISH)
            .await
            .context("Failed to list running containers")?;

        let mut outcome = Outcome::default();
        for container in &containers {
            outcome.merge(self.start(container));
        }

        tracing::info!(
            "Startup scan: {} containers, {} records published",
            containers.len(),
            outcome.published.len()
        );
        Ok(outcome)
    }

    pub async fn handle_event(&mut self, event: RuntimeEvent) -> Outcome {
        if event.kind != "container" {
            return Outcome::default();
        }

        match event.action.as_str() {
            "start" => match self.runtime.get_container(&event.actor_id).await {
                Ok(container) => self.start(&container),
                Err(source) => {
                    let mut outcome = Outcome::default();
                    outcome.ignore(match source {
                        RuntimeError::NotFound(id) => Ignored::ContainerGone { id },
                        source => Ignored::LookupFailed {
                            id: event.actor_id,
                            source,
                        },
                    });
                    outcome
                }
            },
            // The registry knows what the container published; no lookup needed
            "die" => self.engine.process_die(&event.actor_id),
            _ => Outcome::default(),
        }
    }

    fn start(&mut self, container: &ContainerDescriptor) -> Outcome {
        let mut intents = labels::parse(&container.labels);
        if intents.is_empty() {
            return Outcome::default();
        }

        tracing::debug!(
            "Container {} ({}) requests {} records",
            container.id.short(),
            container.name.as_deref().unwrap_or("unnamed"),
            intents.len()
        );

        if self.verbose {
            labels::annotate(&mut intents, &container.id, Utc::now());
        }
        self.engine.process_start(&container.id, &intents)
    }

    /// Withdraw everything still published and release the announcer
    pub fn shutdown(self) -> Outcome {
        self.engine.shutdown()
    }
}
