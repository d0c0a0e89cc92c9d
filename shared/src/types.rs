use std::collections::HashMap;
use std::fmt;
use indexmap::IndexMap;

/// Opaque runtime identifier of a container, stable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 12-character prefix the docker CLI shows
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// TXT properties in listed order. A `None` value is a bare boolean flag,
/// distinct from `Some("")`.
pub type Properties = IndexMap<String, Option<String>>;

/// One record a container asked for, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishIntent {
    /// Hostname as written in the label, e.g. "web.local"
    pub candidate_name: String,

    pub port: u16,

    /// Explicit service type from `mdns.servicetype`, if any
    pub service_type: Option<String>,

    pub properties: Properties,
}

/// A validated record, ready to hand to the announcer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// Fully-qualified ASCII hostname ending in ".local.", e.g. "web.local."
    pub server_name: String,

    /// The part of `server_name` before ".local.", e.g. "web"
    pub local_label: String,

    /// Service type without domain, e.g. "_http._tcp"
    pub service_type: String,

    pub port: u16,

    pub properties: Properties,
}

/// What the runtime reports about a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub id: ContainerId,

    /// Human-readable name, used only for logging
    pub name: Option<String>,

    pub labels: HashMap<String, String>,
}

/// A lifecycle notification from the runtime event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// Object type, e.g. "container"
    pub kind: String,

    /// Lifecycle action, e.g. "start" or "die"
    pub action: String,

    pub actor_id: ContainerId,
}

impl RuntimeEvent {
    pub fn container(action: &str, actor_id: impl Into<String>) -> Self {
        Self {
            kind: "container".to_string(),
            action: action.to_string(),
            actor_id: ContainerId::new(actor_id),
        }
    }
}
