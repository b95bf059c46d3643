use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dirs;
use crate::gateway::Gateway;
use crate::rule::Rule;
use crate::system::Protocol;

mod legacy;
mod v1;

const STATE_FILE: &str = "desired_state.json";
const CURRENT_VERSION: u64 = 2;

pub const ENV_VAR: &str = "SPLITROUTE_STATE_FILE";

#[derive(Debug, Error)]
pub enum Error {
    #[error("desired-state file not found")]
    NoFile,
    #[error("error determining parent folder")]
    NoParentFolder,
    #[error("unsupported desired-state version: {0}")]
    UnsupportedVersion(u64),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state folder error: {0}")]
    Dirs(#[from] dirs::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Campus,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Campus => write!(f, "campus"),
        }
    }
}

/// One metric the engine pins: interface role, protocol family, value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTarget {
    pub role: Role,
    pub protocol: Protocol,
    pub metric: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricPolicy {
    targets: Vec<MetricTarget>,
}

impl MetricPolicy {
    pub fn new(targets: Vec<MetricTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[MetricTarget] {
        &self.targets
    }
}

/// Prefer the user uplink for IPv4 and the campus uplink for IPv6.
impl Default for MetricPolicy {
    fn default() -> Self {
        Self {
            targets: vec![
                MetricTarget {
                    role: Role::User,
                    protocol: Protocol::Ipv4,
                    metric: 1,
                },
                MetricTarget {
                    role: Role::Campus,
                    protocol: Protocol::Ipv6,
                    metric: 1,
                },
            ],
        }
    }
}

/// The persisted target configuration the engine reconciles the live OS
/// state toward. Written only after a fully successful apply and reused on
/// subsequent invocations until reset or overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    pub user_interface: String,
    pub campus_interface: String,
    pub user_gateway: Gateway,
    pub campus_gateway: Gateway,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub metric_policy: MetricPolicy,
}

impl DesiredState {
    pub fn interface_name(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_interface,
            Role::Campus => &self.campus_interface,
        }
    }

    pub fn gateway(&self, role: Role) -> Gateway {
        match role {
            Role::User => self.user_gateway,
            Role::Campus => self.campus_gateway,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Versioned {
    version: u64,
    #[serde(flatten)]
    state: DesiredState,
}

pub fn default_path() -> Result<PathBuf, Error> {
    dirs::state_dir(STATE_FILE).map_err(Error::from)
}

/// Reads a desired state, migrating the older file shapes: the bare rule
/// file, the variant nesting the record under a "config" key and the
/// version 1 record without a metric policy all collapse into the current
/// versioned schema.
pub fn read(path: &Path) -> Result<DesiredState, Error> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NoFile
        } else {
            Error::IO(e)
        }
    })?;
    let mut value: serde_json::Value = serde_json::from_str(&content)?;

    if value.get("version").is_none() {
        if let Some(inner) = value.get("config") {
            value = inner.clone();
        }
    }

    match value.get("version").and_then(|v| v.as_u64()) {
        Some(CURRENT_VERSION) => Ok(serde_json::from_value::<Versioned>(value)?.state),
        Some(1) => {
            tracing::info!("migrating version 1 desired-state file");
            let old: v1::State = serde_json::from_value(value)?;
            Ok(old.into())
        }
        Some(other) => Err(Error::UnsupportedVersion(other)),
        None => {
            tracing::info!("migrating legacy desired-state file");
            let old: legacy::State = serde_json::from_value(value)?;
            Ok(old.into())
        }
    }
}

pub fn write(state: &DesiredState, path: &Path) -> Result<(), Error> {
    let versioned = Versioned {
        version: CURRENT_VERSION,
        state: state.clone(),
    };
    let content = serde_json::to_string_pretty(&versioned)?;
    let parent = path.parent().ok_or(Error::NoParentFolder)?;
    fs::create_dir_all(parent)?;
    fs::write(path, content).map_err(Error::IO)
}

pub fn remove(path: &Path) -> Result<(), Error> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NoFile),
        Err(e) => Err(Error::IO(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule;
    use std::net::Ipv4Addr;
    use tempfile::tempdir;

    fn sample_state() -> DesiredState {
        DesiredState {
            user_interface: "Ethernet".to_string(),
            campus_interface: "以太网 2".to_string(),
            user_gateway: Gateway::Resolved(Ipv4Addr::new(192, 168, 1, 1)),
            campus_gateway: Gateway::Resolved(Ipv4Addr::new(10, 10, 0, 1)),
            rules: rule::default_rules(),
            metric_policy: MetricPolicy::default(),
        }
    }

    #[test]
    fn write_then_read_round_trips() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("desired_state.json");
        let state = sample_state();
        write(&state, &path)?;
        assert_eq!(read(&path)?, state);
        Ok(())
    }

    #[test]
    fn missing_file_reports_no_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nope.json");
        assert!(matches!(read(&path), Err(Error::NoFile)));
    }

    #[test]
    fn legacy_bare_file_is_migrated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("network_config.json");
        fs::write(
            &path,
            r#"{
                "user_connection": "WLAN",
                "campus_connection": "Ethernet",
                "user_gateway": "192.168.0.1",
                "campus_gateway": "not-an-address",
                "ip_cidrs": ["IP-CIDR,202.118.0.0/19,DIRECT", "IP-CIDR,bad,DIRECT"]
            }"#,
        )?;
        let state = read(&path)?;
        assert_eq!(state.user_interface, "WLAN");
        assert_eq!(state.user_gateway, Gateway::Resolved(Ipv4Addr::new(192, 168, 0, 1)));
        assert_eq!(state.campus_gateway, Gateway::Unresolved);
        // malformed legacy rules are dropped during migration
        assert_eq!(state.rules.len(), 1);
        assert_eq!(state.metric_policy, MetricPolicy::default());
        Ok(())
    }

    #[test]
    fn legacy_rule_only_file_is_migrated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("network_config.json");
        fs::write(&path, r#"{"ip_cidrs": ["IP-CIDR,202.118.0.0/19,DIRECT"]}"#)?;
        let state = read(&path)?;
        // no selection yet: empty names, unresolved gateways
        assert_eq!(state.user_interface, "");
        assert_eq!(state.campus_interface, "");
        assert_eq!(state.user_gateway, Gateway::Unresolved);
        assert_eq!(state.campus_gateway, Gateway::Unresolved);
        assert_eq!(state.rules.len(), 1);
        Ok(())
    }

    #[test]
    fn legacy_nested_file_is_migrated() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("network_config.json");
        fs::write(
            &path,
            r#"{
                "config": {
                    "user_connection": "WLAN",
                    "campus_connection": "Ethernet",
                    "campus_gateway": "10.10.0.1",
                    "ip_cidrs": []
                }
            }"#,
        )?;
        let state = read(&path)?;
        assert_eq!(state.campus_interface, "Ethernet");
        assert_eq!(state.user_gateway, Gateway::Unresolved);
        Ok(())
    }

    #[test]
    fn version_1_file_gains_default_metric_policy() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("desired_state.json");
        fs::write(
            &path,
            r#"{
                "version": 1,
                "user_interface": "WLAN",
                "campus_interface": "Ethernet",
                "user_gateway": {"resolved": "192.168.0.1"},
                "campus_gateway": {"resolved": "10.10.0.1"},
                "rules": ["IP-CIDR,172.16.0.0/12,DIRECT"]
            }"#,
        )?;
        let state = read(&path)?;
        assert_eq!(state.rules.len(), 1);
        assert_eq!(state.metric_policy, MetricPolicy::default());
        Ok(())
    }

    #[test]
    fn future_versions_are_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("desired_state.json");
        fs::write(&path, r#"{"version": 9}"#)?;
        assert!(matches!(read(&path), Err(Error::UnsupportedVersion(9))));
        Ok(())
    }
}
