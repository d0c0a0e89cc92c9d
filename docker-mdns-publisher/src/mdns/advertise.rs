use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use mdns_sd::{IfKind, ServiceDaemon, ServiceInfo, TxtProperty};
use anyhow::{bail, Context, Result};
use shared::types::NormalizedRecord;
use crate::config::IpVersion;
use super::{instance_name, service_domain, AnnounceError, Announcer};

/// TTLs mdns-sd puts on every record: address records, then SRV/TXT/PTR.
/// `ServiceInfo` offers no public way to change them.
const LIBRARY_HOST_TTL: u32 = 120;
const LIBRARY_OTHER_TTL: u32 = 4500;

/// A service registered with the mDNS daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsRecord {
    fullname: String,
    server: String,
}

impl fmt::Display for MdnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.fullname, self.server)
    }
}

/// [`Announcer`] backed by an `mdns-sd` daemon, IPv4 only.
pub struct MdnsAnnouncer {
    daemon: ServiceDaemon,
    addresses: Vec<IpAddr>,
    /// fullname -> server of every live registration
    published: HashMap<String, String>,
    ttl_warned: bool,
    closed: bool,
}

impl MdnsAnnouncer {
    pub fn open(addresses: &[Ipv4Addr], ip_version: IpVersion) -> Result<Self> {
        if ip_version != IpVersion::V4 {
            bail!("IP version {} not supported", ip_version);
        }

        let daemon = ServiceDaemon::new()
            .context("Failed to create mDNS daemon")?;
        daemon
            .disable_interface(IfKind::IPv6)
            .context("Failed to disable IPv6 interfaces")?;

        if addresses.is_empty() {
            tracing::warn!("No usable interface addresses, announcing on all IPv4 interfaces");
        } else {
            daemon
                .disable_interface(IfKind::All)
                .context("Failed to disable default interfaces")?;
            for addr in addresses {
                daemon
                    .enable_interface(IfKind::Addr(IpAddr::V4(*addr)))
                    .with_context(|| format!("Failed to enable interface address {}", addr))?;
            }
        }

        Ok(Self {
            daemon,
            addresses: addresses.iter().copied().map(IpAddr::V4).collect(),
            published: HashMap::new(),
            ttl_warned: false,
            closed: false,
        })
    }

    fn service_info(&self, record: &NormalizedRecord) -> Result<ServiceInfo, AnnounceError> {
        let ty_domain = service_domain(&record.service_type);
        let instance = instance_name(record);

        // The daemon only takes DNS-SD types under _tcp or _udp
        if !ty_domain.ends_with("._tcp.local.") && !ty_domain.ends_with("._udp.local.") {
            return Err(AnnounceError::BadType {
                name: format!("{}.{}", instance, ty_domain),
                reason: "service type must end with '._tcp' or '._udp'".to_string(),
            });
        }

        let properties: Vec<TxtProperty> = record
            .properties
            .iter()
            .map(|(key, value)| match value {
                Some(value) => TxtProperty::from((key.as_str(), value.as_str())),
                None => TxtProperty::from(key.as_str()),
            })
            .collect();

        let info = ServiceInfo::new(
            &ty_domain,
            instance,
            &record.server_name,
            &self.addresses[..],
            record.port,
            properties,
        )
        .map_err(|e| AnnounceError::BadType {
            name: format!("{}.{}", instance, ty_domain),
            reason: e.to_string(),
        })?;

        Ok(if self.addresses.is_empty() {
            info.enable_addr_auto()
        } else {
            info
        })
    }

    fn warn_unapplied_ttl(&mut self, ttl_secs: u32) {
        if self.ttl_warned || ttl_secs == LIBRARY_HOST_TTL || ttl_secs == LIBRARY_OTHER_TTL {
            return;
        }
        self.ttl_warned = true;
        tracing::warn!(
            "Configured TTL {}s cannot be applied, records carry the mDNS library TTLs ({}s host, {}s service)",
            ttl_secs,
            LIBRARY_HOST_TTL,
            LIBRARY_OTHER_TTL
        );
    }
}

impl Announcer for MdnsAnnouncer {
    type Handle = MdnsRecord;

    fn register(&mut self, record: &NormalizedRecord, ttl_secs: u32) -> Result<MdnsRecord, AnnounceError> {
        let info = self.service_info(record)?;
        let fullname = info.get_fullname().to_string();

        if let Some(server) = self.published.get(&fullname) {
            return Err(if *server == record.server_name {
                AnnounceError::DuplicateName(fullname)
            } else {
                AnnounceError::NonUniqueName(fullname)
            });
        }

        self.warn_unapplied_ttl(ttl_secs);
        self.daemon
            .register(info)
            .map_err(|e| AnnounceError::Daemon(e.to_string()))?;

        tracing::debug!("Registered {} for {} on port {}", fullname, record.server_name, record.port);

        self.published.insert(fullname.clone(), record.server_name.clone());
        Ok(MdnsRecord {
            fullname,
            server: record.server_name.clone(),
        })
    }

    fn unregister(&mut self, handle: MdnsRecord) -> Result<(), AnnounceError> {
        if self.published.remove(&handle.fullname).is_none() {
            return Err(AnnounceError::UnknownHandle(handle.fullname));
        }

        // Goodbye packets go out from the daemon thread; no need to wait
        self.daemon
            .unregister(&handle.fullname)
            .map_err(|e| AnnounceError::Daemon(e.to_string()))?;

        tracing::debug!("Unregistered {}", handle.fullname);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AnnounceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.daemon
            .shutdown()
            .map(|_| ())
            .map_err(|e| AnnounceError::Daemon(e.to_string()))
    }
}
