pub mod advertise;

use std::fmt;
use shared::types::NormalizedRecord;
use thiserror::Error;

pub use advertise::MdnsAnnouncer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnounceError {
    #[error("service name {0} is already registered")]
    DuplicateName(String),
    #[error("{0} is already claimed by another host")]
    NonUniqueName(String),
    #[error("bad type in name {name}: {reason}")]
    BadType { name: String, reason: String },
    #[error("{0} is not registered")]
    UnknownHandle(String),
    #[error("mDNS daemon error: {0}")]
    Daemon(String),
}

/// The service-discovery engine records are published through.
pub trait Announcer {
    /// Issued by `register`, handed back unchanged to `unregister`
    type Handle: fmt::Display + fmt::Debug;

    fn register(&mut self, record: &NormalizedRecord, ttl_secs: u32) -> Result<Self::Handle, AnnounceError>;

    fn unregister(&mut self, handle: Self::Handle) -> Result<(), AnnounceError>;

    /// Release the engine. Safe to call more than once.
    fn close(&mut self) -> Result<(), AnnounceError>;
}

/// DNS-SD instance name of a record: the first label of its hostname, so
/// "web.lab.local." announces as "web".
pub fn instance_name(record: &NormalizedRecord) -> &str {
    record
        .local_label
        .split_once('.')
        .map_or(record.local_label.as_str(), |(first, _)| first)
}

/// "_http._tcp" -> "_http._tcp.local."
pub fn service_domain(service_type: &str) -> String {
    let service_type = service_type.trim_end_matches('.');
    if service_type.ends_with(".local") {
        format!("{service_type}.")
    } else {
        format!("{service_type}.local.")
    }
}
