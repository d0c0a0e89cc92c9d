use shared::types::ContainerId;
use thiserror::Error;
use crate::mdns::AnnounceError;
use crate::registry::RegistryError;
use crate::runtime::RuntimeError;
use crate::validate::ValidationError;

/// A failure scoped to one intent, container or event. Logged, then
/// processing carries on.
#[derive(Debug, Error)]
pub enum Ignored {
    #[error("container {id}: {source}")]
    AlreadyRegistered {
        id: ContainerId,
        source: RegistryError,
    },
    #[error("container {id}: rejected hostname {name:?}: {source}")]
    Invalid {
        id: ContainerId,
        name: String,
        source: ValidationError,
    },
    #[error("container {id}: not announcing {name}: {source}")]
    Collision {
        id: ContainerId,
        name: String,
        source: AnnounceError,
    },
    #[error("container {id}: failed to announce {name}: {source}")]
    AnnounceFailed {
        id: ContainerId,
        name: String,
        source: AnnounceError,
    },
    #[error("container {id}: failed to withdraw {record}: {source}")]
    WithdrawFailed {
        id: ContainerId,
        record: String,
        source: AnnounceError,
    },
    #[error("container {id} went away before it could be inspected")]
    ContainerGone { id: ContainerId },
    #[error("container {id}: lookup failed: {source}")]
    LookupFailed { id: ContainerId, source: RuntimeError },
    #[error("bad event from runtime: {source}")]
    BadEvent { source: RuntimeError },
}

impl Ignored {
    /// Emit the diagnostic for this condition
    pub fn log(&self) {
        match self {
            Ignored::Collision { .. } | Ignored::AnnounceFailed { .. } => {
                tracing::error!("{} -- ignoring the service announcement", self)
            }
            Ignored::BadEvent { .. } | Ignored::LookupFailed { .. } => tracing::error!("{}", self),
            _ => tracing::warn!("{}", self),
        }
    }
}

/// What a start/die/teardown pass did.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Display names of newly published records
    pub published: Vec<String>,
    /// Display names of withdrawn records
    pub withdrawn: Vec<String>,
    pub ignored: Vec<Ignored>,
}

impl Outcome {
    pub fn ignore(&mut self, ignored: Ignored) {
        ignored.log();
        self.ignored.push(ignored);
    }

    pub fn merge(&mut self, other: Outcome) {
        self.published.extend(other.published);
        self.withdrawn.extend(other.withdrawn);
        self.ignored.extend(other.ignored);
    }

    pub fn is_noop(&self) -> bool {
        self.published.is_empty() && self.withdrawn.is_empty() && self.ignored.is_empty()
    }
}
