// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::acr::NodeFunctionality;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Identity of this node in the signalling path.
    pub node: NodeConfig,
    /// Rf billing wiring.
    pub billing: BillingConfig,
    /// Subscriber database client settings.
    pub hss: HssConfig,
}

/// Node identity and the coordinates other elements route back to.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeConfig {
    #[serde(rename = "Functionality")]
    /// Role this deployment plays (PCSCF / ICSCF / SCSCF).
    pub functionality: NodeFunctionality,

    #[serde(rename = "HomeDomain")]
    /// Domain this node is authoritative for.
    pub home_domain: String,

    #[serde(rename = "LocalHost")]
    /// Host name placed in ODI Route headers toward application servers.
    pub local_host: String,

    #[serde(rename = "Port")]
    /// Listening port, also carried in ODI Route headers.
    pub port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BillingConfig {
    #[serde(rename = "Enabled")]
    /// When false the node hands out null ACRs and emits nothing.
    pub enabled: bool,

    #[serde(default, rename = "PeerUri")]
    /// Billing service the drained records are delivered to.
    pub peer_uri: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HssConfig {
    #[serde(rename = "Server")]
    /// Subscriber database server name.
    pub server: String,

    #[serde(rename = "TimeoutConnection", with = "serde_secs")]
    /// Timeout for one subscriber-database exchange.
    pub timeout_connection: Duration,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.node.home_domain.is_empty(),
            "HomeDomain must not be empty"
        );
        ensure!(
            !self.node.local_host.is_empty(),
            "LocalHost must not be empty"
        );
        ensure!(self.node.port >= 1, "Port must be >= 1");

        if self.billing.enabled {
            ensure!(
                !self.billing.peer_uri.is_empty(),
                "PeerUri is required when billing is enabled"
            );
        }

        ensure!(!self.hss.server.is_empty(), "hss Server must not be empty");
        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
