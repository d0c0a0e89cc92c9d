use regex::Regex;
use shared::protocol::{well_known_service_type, LOCAL_SUFFIX};
use shared::types::{NormalizedRecord, Properties};
use thiserror::Error;

/// Longest hostname, including the trailing dot
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty hostname")]
    Empty,
    #[error("hostname {0:?} cannot be converted to ASCII")]
    NotAscii(String),
    #[error("hostname {0:?} is longer than 255 characters")]
    TooLong(String),
    #[error("invalid label {label:?} in hostname {name:?}")]
    InvalidLabel { name: String, label: String },
    #[error("hostname {0:?} is not in the .local domain")]
    NotLocalDomain(String),
    #[error("port {0} is not a valid service port")]
    InvalidPort(u16),
    #[error("no well-known service type for port {0}; set mdns.servicetype")]
    UnknownPort(u16),
}

/// Turns candidate hostnames into publishable records.
///
/// Holds the compiled label rule; build once at startup and share.
#[derive(Debug, Clone)]
pub struct HostnameValidator {
    label_rule: Regex,
}

impl HostnameValidator {
    pub fn new() -> Self {
        // 1-63 chars of [A-Za-z0-9_-], no hyphen at either end
        let label_rule = Regex::new(r"^[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?$")
            .expect("Failed to compile hostname label pattern");
        Self { label_rule }
    }

    pub fn normalize(
        &self,
        raw_name: &str,
        port: u16,
        explicit_service_type: Option<&str>,
        properties: Properties,
    ) -> Result<NormalizedRecord, ValidationError> {
        let name = raw_name.trim();
        let bare = name.strip_suffix('.').unwrap_or(name);
        if bare.is_empty() {
            return Err(ValidationError::Empty);
        }

        let ascii = idna::domain_to_ascii(bare)
            .map_err(|_| ValidationError::NotAscii(name.to_string()))?;

        let server_name = format!("{ascii}.");
        if server_name.len() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong(server_name));
        }

        if let Some(label) = ascii.split('.').find(|label| !self.label_rule.is_match(label)) {
            return Err(ValidationError::InvalidLabel {
                name: server_name.clone(),
                label: label.to_string(),
            });
        }

        let local_label = match server_name.strip_suffix(LOCAL_SUFFIX) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => return Err(ValidationError::NotLocalDomain(server_name)),
        };

        if port == 0 {
            return Err(ValidationError::InvalidPort(port));
        }

        let service_type = match explicit_service_type.map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => well_known_service_type(port)
                .ok_or(ValidationError::UnknownPort(port))?
                .to_string(),
        };

        Ok(NormalizedRecord {
            server_name,
            local_label,
            service_type,
            port,
            properties,
        })
    }
}

impl Default for HostnameValidator {
    fn default() -> Self {
        Self::new()
    }
}
