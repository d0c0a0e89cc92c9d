use std::net::{IpAddr, Ipv4Addr};
use ipnet::Ipv4Net;
use anyhow::{bail, Context, Result};

/// One address assigned to a network interface.
#[derive(Debug, Clone)]
pub struct NetAdapter {
    pub name: String,
    pub ip: IpAddr,
    pub loopback: bool,
}

/// Enumerate the host's interfaces and pick the IPv4 addresses to advertise on.
pub fn discover(adapters: &[String], excluded: &[Ipv4Net]) -> Result<Vec<Ipv4Addr>> {
    let available: Vec<NetAdapter> = if_addrs::get_if_addrs()
        .context("Failed to enumerate network interfaces")?
        .into_iter()
        .map(|iface| NetAdapter {
            loopback: iface.is_loopback(),
            ip: iface.ip(),
            name: iface.name,
        })
        .collect();

    if adapters.is_empty() {
        tracing::debug!("Publishing on all interfaces");
    }

    let addresses = select_addresses(&available, adapters, excluded)?;
    tracing::debug!("Publishing on interface IPs: {:?}", addresses);
    Ok(addresses)
}

/// Keep non-loopback IPv4 addresses of the named adapters (all when `adapters`
/// is empty) that fall outside every excluded network. Unknown adapter names
/// are an error.
pub fn select_addresses(
    available: &[NetAdapter],
    adapters: &[String],
    excluded: &[Ipv4Net],
) -> Result<Vec<Ipv4Addr>> {
    for name in adapters {
        if !available.iter().any(|a| &a.name == name) {
            bail!("invalid adapter/interface name \"{}\"", name);
        }
    }

    let mut addresses = Vec::new();
    for adapter in available {
        if !adapters.is_empty() && !adapters.contains(&adapter.name) {
            continue;
        }
        let IpAddr::V4(ip) = adapter.ip else {
            continue;
        };
        if adapter.loopback || ip.is_loopback() {
            continue;
        }
        if excluded.iter().any(|net| net.contains(&ip)) {
            tracing::debug!("Skipping {} on {}: excluded network", ip, adapter.name);
            continue;
        }
        if !addresses.contains(&ip) {
            addresses.push(ip);
        }
    }

    Ok(addresses)
}
