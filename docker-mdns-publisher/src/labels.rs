use std::collections::HashMap;
use chrono::{DateTime, SecondsFormat, Utc};
use shared::protocol::{
    DEFAULT_PORT, LABEL_PUBLISH, LABEL_SERVICE_TYPE, LABEL_TXT, TXT_CONTAINER_ID, TXT_PUBLISHED_AT,
};
use shared::types::{ContainerId, Properties, PublishIntent};

/// Extract the publish intents from a container's labels.
///
/// No `mdns.publish` label means no intents. Entries with a malformed port
/// are logged and skipped; everything else is left for the validator.
pub fn parse(labels: &HashMap<String, String>) -> Vec<PublishIntent> {
    let Some(hosts) = labels.get(LABEL_PUBLISH) else {
        return Vec::new();
    };

    let properties = labels.get(LABEL_TXT).map(|txt| parse_txt(txt)).unwrap_or_default();
    let service_type = labels
        .get(LABEL_SERVICE_TYPE)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut intents = Vec::new();
    for entry in hosts.split(',').map(str::trim) {
        if entry.is_empty() {
            continue;
        }

        let (name, port) = match entry.split_once(':') {
            None => (entry, DEFAULT_PORT),
            Some((name, port)) => match port.trim().parse::<u16>() {
                Ok(port) => (name.trim(), port),
                Err(e) => {
                    tracing::warn!("Ignoring {} entry {:?}: invalid port: {}", LABEL_PUBLISH, entry, e);
                    continue;
                }
            },
        };

        intents.push(PublishIntent {
            candidate_name: name.to_string(),
            port,
            service_type: service_type.clone(),
            properties: properties.clone(),
        });
    }

    intents
}

/// Parse "k=v,flag,k2=" into ordered properties; later duplicates win.
pub fn parse_txt(txt: &str) -> Properties {
    let mut properties = Properties::new();

    for entry in txt.split(',').map(str::trim) {
        if entry.is_empty() {
            continue;
        }

        let (key, value) = match entry.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (entry, None),
        };

        if key.is_empty() {
            tracing::warn!("Ignoring {} entry {:?}: empty key", LABEL_TXT, entry);
            continue;
        }

        properties.insert(key.to_string(), value);
    }

    properties
}

/// Tag every intent with the originating container and publish time.
pub fn annotate(intents: &mut [PublishIntent], id: &ContainerId, now: DateTime<Utc>) {
    let published_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    for intent in intents {
        intent
            .properties
            .insert(TXT_CONTAINER_ID.to_string(), Some(id.to_string()));
        intent
            .properties
            .insert(TXT_PUBLISHED_AT.to_string(), Some(published_at.clone()));
    }
}
