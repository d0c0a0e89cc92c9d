use std::fmt;
use std::path::{Path, PathBuf};
use ipnet::Ipv4Net;
use serde::Deserialize;
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mdns: MdnsConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MdnsConfig {
    /// Interfaces to publish on; empty means all of them
    #[serde(default)]
    pub adapters: Vec<String>,
    #[serde(default = "default_ttl")]
    pub ttl_secs: u32,
    /// Networks whose addresses are never advertised (docker bridges, usually)
    #[serde(default)]
    pub excluded_nets: Vec<Ipv4Net>,
    #[serde(default)]
    pub ip_version: IpVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Add container id and publish time to every TXT record
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfig {
    /// Unix socket of the docker daemon; local defaults (or DOCKER_HOST) when unset
    pub socket: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    #[default]
    V4,
    V6,
    Dual,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("v4"),
            IpVersion::V6 => f.write_str("v6"),
            IpVersion::Dual => f.write_str("dual"),
        }
    }
}

fn default_ttl() -> u32 {
    3600
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            adapters: Vec::new(),
            ttl_secs: default_ttl(),
            excluded_nets: Vec::new(),
            ip_version: IpVersion::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply the ADAPTERS, TTL, EXCLUDED_NETS and VERBOSE overrides
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(adapters) = var("ADAPTERS") {
            self.mdns.adapters = split_list(&adapters).map(str::to_string).collect();
        }

        if let Some(ttl) = var("TTL") {
            self.mdns.ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("Invalid TTL value: {:?}", ttl))?;
        }

        if let Some(nets) = var("EXCLUDED_NETS") {
            self.mdns.excluded_nets = split_list(&nets)
                .map(|net| {
                    net.parse::<Ipv4Net>()
                        .with_context(|| format!("Invalid network in EXCLUDED_NETS: {:?}", net))
                })
                .collect::<Result<_>>()?;
        }

        if let Some(verbose) = var("VERBOSE") {
            self.diagnostics.verbose = match verbose.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => bail!("Invalid VERBOSE value: {:?}", other),
            };
        }

        Ok(())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.mdns.adapters.is_empty());
        assert_eq!(config.mdns.ttl_secs, 3600);
        assert_eq!(config.mdns.ip_version, IpVersion::V4);
        assert!(!config.diagnostics.verbose);
        assert!(config.docker.socket.is_none());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [mdns]
            adapters = ["eth0"]
            ttl_secs = 120
            excluded_nets = ["172.17.0.0/16"]

            [diagnostics]
            verbose = true
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.mdns.adapters, vec!["eth0".to_string()]);
        assert_eq!(config.mdns.ttl_secs, 120);
        assert_eq!(config.mdns.excluded_nets, vec!["172.17.0.0/16".parse::<Ipv4Net>().unwrap()]);
        assert!(config.diagnostics.verbose);
    }

    #[test]
    fn test_load_rejects_unknown_ip_version() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mdns]\nip_version = \"v5\"").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.mdns.ttl_secs, 3600);

        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("ADAPTERS", "eth0, wlan0,"),
                ("TTL", "60"),
                ("EXCLUDED_NETS", "172.17.0.0/16,10.0.0.0/8"),
                ("VERBOSE", "yes"),
            ]))
            .unwrap();

        assert_eq!(config.mdns.adapters, vec!["eth0".to_string(), "wlan0".to_string()]);
        assert_eq!(config.mdns.ttl_secs, 60);
        assert_eq!(config.mdns.excluded_nets.len(), 2);
        assert!(config.diagnostics.verbose);
    }

    #[test]
    fn test_env_overrides_reject_garbage() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("TTL", "an hour")])).is_err());

        let mut config = Config::default();
        assert!(config.apply_env(env(&[("EXCLUDED_NETS", "not-a-net")])).is_err());

        let mut config = Config::default();
        assert!(config.apply_env(env(&[("VERBOSE", "maybe")])).is_err());
    }
}
