use std::sync::Arc;
use shared::types::{ContainerId, PublishIntent};
use crate::error::{Ignored, Outcome};
use crate::mdns::{AnnounceError, Announcer};
use crate::registry::RecordRegistry;
use crate::validate::HostnameValidator;

/// Publishes and withdraws container records through an [`Announcer`],
/// keeping the [`RecordRegistry`] in step.
///
/// Owns the announcer for the life of the process. Teardown (withdraw
/// everything, then close the announcer) runs exactly once: on
/// [`PublicationEngine::shutdown`], or on drop if that never happened.
pub struct PublicationEngine<A: Announcer> {
    announcer: A,
    registry: RecordRegistry<A::Handle>,
    validator: Arc<HostnameValidator>,
    ttl_secs: u32,
    torn_down: bool,
}

impl<A: Announcer> PublicationEngine<A> {
    pub fn new(announcer: A, validator: Arc<HostnameValidator>, ttl_secs: u32) -> Self {
        Self {
            announcer,
            registry: RecordRegistry::new(),
            validator,
            ttl_secs,
            torn_down: false,
        }
    }

    pub fn registry(&self) -> &RecordRegistry<A::Handle> {
        &self.registry
    }

    /// Publish every valid intent of a container that just started.
    ///
    /// A container that already has records is left alone. Invalid intents
    /// and announcer rejections skip only the intent concerned.
    pub fn process_start(&mut self, id: &ContainerId, intents: &[PublishIntent]) -> Outcome {
        let mut outcome = Outcome::default();
        if intents.is_empty() {
            return outcome;
        }

        let permit = match self.registry.begin_registration(id) {
            Ok(permit) => permit,
            Err(source) => {
                outcome.ignore(Ignored::AlreadyRegistered { id: id.clone(), source });
                return outcome;
            }
        };

        for intent in intents {
            tracing::info!("Publishing {}:{} for container {}", intent.candidate_name, intent.port, id.short());

            let record = match self.validator.normalize(
                &intent.candidate_name,
                intent.port,
                intent.service_type.as_deref(),
                intent.properties.clone(),
            ) {
                Ok(record) => record,
                Err(source) => {
                    outcome.ignore(Ignored::Invalid {
                        id: id.clone(),
                        name: intent.candidate_name.clone(),
                        source,
                    });
                    continue;
                }
            };

            match self.announcer.register(&record, self.ttl_secs) {
                Ok(handle) => {
                    outcome.published.push(handle.to_string());
                    self.registry.commit(&permit, handle);
                }
                Err(source @ (AnnounceError::DuplicateName(_) | AnnounceError::NonUniqueName(_))) => {
                    outcome.ignore(Ignored::Collision {
                        id: id.clone(),
                        name: record.server_name,
                        source,
                    });
                }
                Err(source) => {
                    outcome.ignore(Ignored::AnnounceFailed {
                        id: id.clone(),
                        name: record.server_name,
                        source,
                    });
                }
            }
        }

        outcome
    }

    /// Withdraw everything a container published. Never fails; a container
    /// with nothing published is a no-op.
    pub fn process_die(&mut self, id: &ContainerId) -> Outcome {
        let mut outcome = Outcome::default();

        // Out of the registry before the announcer hears about it, so a
        // repeated die finds nothing to withdraw.
        let handles = match self.registry.withdraw_all(id) {
            Ok(handles) => handles,
            Err(_) => {
                tracing::debug!("Container {} has nothing published", id.short());
                return outcome;
            }
        };

        for handle in handles {
            let record = handle.to_string();
            tracing::info!("Unpublishing {} for container {}", record, id.short());

            match self.announcer.unregister(handle) {
                Ok(()) => outcome.withdrawn.push(record),
                Err(source) => outcome.ignore(Ignored::WithdrawFailed {
                    id: id.clone(),
                    record,
                    source,
                }),
            }
        }

        outcome
    }

    /// Withdraw all outstanding records and release the announcer.
    pub fn shutdown(mut self) -> Outcome {
        self.teardown()
    }

    fn teardown(&mut self) -> Outcome {
        let mut outcome = Outcome::default();
        if self.torn_down {
            return outcome;
        }
        self.torn_down = true;

        tracing::info!("Deregistering all published hostnames ({} containers)", self.registry.len());
        for id in self.registry.container_ids() {
            outcome.merge(self.process_die(&id));
        }

        if let Err(e) = self.announcer.close() {
            tracing::error!("Failed to shut down mDNS announcer: {}", e);
        }

        outcome
    }
}

impl<A: Announcer> Drop for PublicationEngine<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
