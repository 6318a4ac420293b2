//! Network registry
//!
//! Maps a network name to the node endpoint and transaction defaults used
//! when deploying to it. The registry is built once at startup and only
//! read afterwards.

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::parse_address;
use crate::config::ConfigError;

/// Chain identifier a profile is allowed to deploy to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkId {
    /// `*`, any chain
    Any,
    Id(u64),
}

impl NetworkId {
    /// Whether a `net_version` answer satisfies this id.
    pub fn matches(&self, reported: &str) -> bool {
        match self {
            NetworkId::Any => true,
            NetworkId::Id(id) => reported.trim().parse::<u64>().map_or(false, |r| r == *id),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkId::Any => write!(f, "*"),
            NetworkId::Id(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for NetworkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            NetworkId::Any => serializer.serialize_str("*"),
            NetworkId::Id(id) => serializer.serialize_u64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(NetworkId::Id(id)),
            Raw::Str(s) if s == "*" => Ok(NetworkId::Any),
            Raw::Str(s) => s.parse().map(NetworkId::Id).map_err(|_| {
                serde::de::Error::custom(format!(
                    "network_id must be \"*\" or an integer, got {:?}",
                    s
                ))
            }),
        }
    }
}

/// `[networks.<name>]` entry as written in `bth.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkEntry {
    pub host: String,
    pub port: u16,
    pub network_id: NetworkId,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default, alias = "gasPrice")]
    pub gas_price: Option<u64>,
}

/// Resolved connection parameters for one named network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub network_id: NetworkId,
    pub from: Option<Address>,
    pub gas_price: Option<u64>,
}

impl NetworkProfile {
    /// Validate a TOML entry into a profile.
    pub fn from_entry(name: &str, entry: NetworkEntry) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "network name must not be empty".to_string(),
            ));
        }
        if entry.host.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("networks.{}.host", name)));
        }
        if entry.port == 0 {
            return Err(ConfigError::ValidationError(format!(
                "networks.{}.port must be a positive integer",
                name
            )));
        }
        let from = entry
            .from
            .as_deref()
            .map(parse_address)
            .transpose()
            .map_err(|e| ConfigError::ValidationError(format!("networks.{}.from: {}", name, e)))?;

        Ok(Self {
            name: name.to_string(),
            host: entry.host,
            port: entry.port,
            network_id: entry.network_id,
            from,
            gas_price: entry.gas_price,
        })
    }

    /// JSON-RPC endpoint of the node
    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Immutable name -> profile mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkRegistry {
    profiles: BTreeMap<String, NetworkProfile>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `development` and `live` networks shipped with the tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.profiles.insert(
            "development".to_string(),
            NetworkProfile {
                name: "development".to_string(),
                host: "localhost".to_string(),
                port: 8545,
                network_id: NetworkId::Any,
                from: None,
                gas_price: None,
            },
        );
        registry.profiles.insert(
            "live".to_string(),
            NetworkProfile {
                name: "live".to_string(),
                host: "localhost".to_string(),
                port: 8545,
                network_id: NetworkId::Id(1),
                from: Some(Address::new([
                    0xed, 0xd6, 0x93, 0xd9, 0x5e, 0x33, 0xb6, 0x5a, 0xe8, 0x91, 0x4d, 0xb2, 0xd6,
                    0xd8, 0x8f, 0xd7, 0xa2, 0xa5, 0xd9, 0xc2,
                ])),
                gas_price: Some(20_000_000_000),
            },
        );
        registry
    }

    /// Build a registry from the `[networks]` table.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, NetworkEntry)>,
    {
        let mut registry = Self::new();
        for (name, entry) in entries {
            registry.insert(NetworkProfile::from_entry(&name, entry)?)?;
        }
        Ok(registry)
    }

    /// Add a profile; names are unique.
    pub fn insert(&mut self, profile: NetworkProfile) -> Result<(), ConfigError> {
        if profile.port == 0 {
            return Err(ConfigError::ValidationError(format!(
                "networks.{}.port must be a positive integer",
                profile.name
            )));
        }
        if self.profiles.contains_key(&profile.name) {
            return Err(ConfigError::DuplicateNetwork(profile.name));
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Look up a network by name.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownNetwork` when no profile has that name.
    pub fn resolve(&self, name: &str) -> Result<&NetworkProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    pub fn profiles(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
