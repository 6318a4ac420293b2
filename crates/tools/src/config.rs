//! Deployment configuration management
//!
//! This module loads the network registry, the BTH constructor parameters
//! and the runtime knobs of the deployer. Configuration is resolved in
//! priority order:
//!
//! 1. Environment variables (BTH_*), including a `.env` file if present
//! 2. bth.toml (or the file passed with `--config` / `BTH_CONFIG`)
//! 3. Built-in defaults (the `development` and `live` networks and the
//!    original constructor constants)
//!
//! # Examples
//!
//! ```rust,no_run
//! use bth_tools::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let profile = config.resolve_network(None)?;
//! println!("Network: {}", profile.name);
//! println!("RPC URL: {}", profile.rpc_url());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::deploy::DeployOptions;
use crate::params::DeploymentSettings;
use crate::registry::{NetworkEntry, NetworkProfile, NetworkRegistry};

pub const DEFAULT_CONFIG_FILE: &str = "bth.toml";
pub const DEFAULT_NETWORK: &str = "development";
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_GAS_LIMIT: u64 = 6_721_975;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Network {0} is defined more than once")]
    DuplicateNetwork(String),

    #[error("Config file not found: {0}")]
    MissingConfigFile(PathBuf),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnvValue { name: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Complete bth.toml layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BthToml {
    #[serde(default)]
    pub default: Option<DefaultProfile>,
    #[serde(default)]
    pub networks: Option<HashMap<String, NetworkEntry>>,
    #[serde(default)]
    pub deployment: Option<DeploymentSettings>,
}

/// Default profile section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultProfile {
    pub network: Option<String>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Network selected when the CLI does not name one
    pub network: String,
    pub registry: NetworkRegistry,
    /// Constructor parameters, still unvalidated
    pub deployment: DeploymentSettings,
    /// Per-request HTTP timeout in milliseconds
    pub rpc_timeout_ms: u64,
    /// Upper bound on waiting for the deployment receipt
    pub confirmation_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub gas_limit: u64,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            registry: NetworkRegistry::builtin(),
            deployment: DeploymentSettings::default(),
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            gas_limit: DEFAULT_GAS_LIMIT,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment and bth.toml
    ///
    /// # Resolution Order
    ///
    /// 1. Load `.env` (non-fatal when missing)
    /// 2. Read `path`, else `BTH_CONFIG`, else `./bth.toml` if it exists
    /// 3. Overlay BTH_* env vars on top of TOML values
    /// 4. Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - An explicitly named config file does not exist or fails to parse
    /// - A network entry is invalid
    /// - An env var holds an unparsable value
    /// - A timeout, interval or gas limit is zero
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("BTH_CONFIG").map(PathBuf::from));

        let toml = match explicit {
            Some(path) => Some(Self::load_toml(&path)?),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Some(Self::load_toml(path)?)
                } else {
                    None
                }
            }
        };

        let mut config = match toml {
            Some(toml) => Self::from_toml(toml)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn load_toml(path: &Path) -> Result<BthToml, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(ConfigError::TomlError)
    }

    /// Build a configuration from a parsed file, filling gaps with defaults
    pub fn from_toml(toml: BthToml) -> Result<Self, ConfigError> {
        let registry = match toml.networks {
            Some(networks) => NetworkRegistry::from_entries(networks)?,
            None => NetworkRegistry::builtin(),
        };
        let network = toml
            .default
            .and_then(|d| d.network)
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());

        Ok(Self {
            network,
            registry,
            deployment: toml.deployment.unwrap_or_default(),
            ..Self::default()
        })
    }

    /// Overlay BTH_* variables. `lookup` abstracts the environment so tests
    /// do not have to mutate process state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup("BTH_NETWORK").filter(|n| !n.is_empty()) {
            self.network = network;
        }
        if let Some(v) = parse_env(&lookup, "BTH_RPC_TIMEOUT_MS")? {
            self.rpc_timeout_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BTH_CONFIRMATION_TIMEOUT_MS")? {
            self.confirmation_timeout_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BTH_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "BTH_GAS_LIMIT")? {
            self.gas_limit = v;
        }
        if let Some(v) = lookup("BTH_DEBUG") {
            self.debug = v.eq_ignore_ascii_case("true") || v == "1";
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.is_empty() {
            return Err(ConfigError::ValidationError(
                "no networks configured".to_string(),
            ));
        }
        for (name, value) in [
            ("rpc_timeout_ms", self.rpc_timeout_ms),
            ("confirmation_timeout_ms", self.confirmation_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("gas_limit", self.gas_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Runtime knobs for the deployer
    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            gas_limit: self.gas_limit,
        }
    }

    /// Profile for `explicit`, or for the default network when no name is
    /// given. The default is only required to exist in the latter case.
    pub fn resolve_network(&self, explicit: Option<&str>) -> Result<&NetworkProfile, ConfigError> {
        self.registry.resolve(explicit.unwrap_or(&self.network))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Print the resolved configuration
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════════╗");
        println!("║            BTH DEPLOYMENT CONFIGURATION RESOLVED               ║");
        println!("╚════════════════════════════════════════════════════════════════╝");
        println!("  Default Network:     {}", self.network);
        println!("  Networks:");
        for profile in self.registry.profiles() {
            println!(
                "    {:<16} {} (network_id {})",
                profile.name,
                profile.rpc_url(),
                profile.network_id
            );
            if let Some(from) = profile.from {
                println!("    {:<16} from {}", "", from);
            }
            if let Some(gas_price) = profile.gas_price {
                println!("    {:<16} gas price {} wei", "", gas_price);
            }
        }
        println!("  Genesis Height:      {}", self.deployment.genesis_height);
        println!("  Halving Interval:    {}", self.deployment.subsidy_halving_interval);
        println!("  Max Halvings:        {}", self.deployment.max_halvings);
        println!(
            "  Foundation:          {} of {} signatures",
            self.deployment.required_signatures,
            self.deployment.foundation_members.len()
        );
        for member in &self.deployment.foundation_members {
            println!("    {}", member);
        }
        println!("  Foundation Wallet:   {}", self.deployment.foundation_wallet);
        println!("  RPC Timeout:         {}ms", self.rpc_timeout_ms);
        println!("  Confirmation:        {}ms", self.confirmation_timeout_ms);
        println!("  Gas Limit:           {}", self.gas_limit);

        if self.debug {
            println!("  Debug Mode:          ENABLED");
        }

        println!("╚════════════════════════════════════════════════════════════════╝");
    }

    /// Get configuration as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn parse_env<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue { name, value }),
    }
}

// Manual Serialize impl since the registry is flattened into a name -> profile map
impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let networks: Vec<serde_json::Value> = self
            .registry
            .profiles()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "rpc_url": p.rpc_url(),
                    "network_id": p.network_id,
                    "from": p.from,
                    "gas_price": p.gas_price,
                })
            })
            .collect();

        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry("network", &self.network)?;
        map.serialize_entry("networks", &networks)?;
        map.serialize_entry("deployment", &self.deployment)?;
        map.serialize_entry("rpc_timeout_ms", &self.rpc_timeout_ms)?;
        map.serialize_entry("confirmation_timeout_ms", &self.confirmation_timeout_ms)?;
        map.serialize_entry("poll_interval_ms", &self.poll_interval_ms)?;
        map.serialize_entry("gas_limit", &self.gas_limit)?;
        map.serialize_entry("debug", &self.debug)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NetworkId;
    use std::io::Write;

    const SAMPLE: &str = r#"
[default]
network = "live"

[networks.development]
host = "localhost"
port = 8545
network_id = "*"

[networks.live]
host = "node.example.org"
port = 8546
network_id = 1
from = "0xEDd693d95E33B65aE8914db2d6D88Fd7a2A5D9c2"
gasPrice = 20000000000

[deployment]
genesis_height = 100
subsidy_halving_interval = 10
max_halvings = 2
foundation_members = ["0x6AA6161B17845901Cb326A3601b2e9e2D4275520"]
required_signatures = 1
foundation_wallet = "0xB4e63046001074B223872137174EeC63A7e12Cf5"
"#;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.network, "development");
        assert!(config.registry.resolve("development").is_ok());
        assert!(config.registry.resolve("live").is_ok());
        assert_eq!(config.deployment, DeploymentSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml: BthToml = toml::from_str(SAMPLE).unwrap();
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.network, "live");
        let live = config.registry.resolve("live").unwrap();
        assert_eq!(live.rpc_url(), "http://node.example.org:8546");
        assert_eq!(live.network_id, NetworkId::Id(1));
        assert_eq!(live.gas_price, Some(20_000_000_000));
        assert_eq!(config.deployment.genesis_height, 100);
        assert_eq!(config.deployment.required_signatures, 1);
        assert!(config.deployment.validate().is_ok());
    }

    #[test]
    fn test_missing_networks_falls_back_to_builtin() {
        let toml: BthToml = toml::from_str("[deployment]\nmax_halvings = 8").unwrap();
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.registry, NetworkRegistry::builtin());
        assert_eq!(config.deployment.max_halvings, 8);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<BthToml>("[networks.dev]\nhost = \"h\"\nport = 1\nnetwork_id = 1\nfrm = \"x\"").is_err());
    }

    #[test]
    fn test_env_overrides_toml() {
        let toml: BthToml = toml::from_str(SAMPLE).unwrap();
        let mut config = Config::from_toml(toml).unwrap();
        config
            .apply_env(env_of(&[
                ("BTH_NETWORK", "development"),
                ("BTH_CONFIRMATION_TIMEOUT_MS", "1500"),
                ("BTH_GAS_LIMIT", "4000000"),
                ("BTH_DEBUG", "TRUE"),
            ]))
            .unwrap();

        assert_eq!(config.network, "development");
        assert_eq!(config.confirmation_timeout_ms, 1500);
        assert_eq!(config.gas_limit, 4_000_000);
        assert!(config.debug);
        assert_eq!(config.rpc_timeout_ms, DEFAULT_RPC_TIMEOUT_MS);
        assert_eq!(
            config.deploy_options().confirmation_timeout,
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let result = config.apply_env(env_of(&[("BTH_RPC_TIMEOUT_MS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvValue { name: "BTH_RPC_TIMEOUT_MS", .. })
        ));
    }

    #[test]
    fn test_default_network_only_resolved_without_explicit_name() {
        let toml: BthToml =
            toml::from_str("[networks.ropsten]\nhost = \"localhost\"\nport = 8545\nnetwork_id = 3")
                .unwrap();
        let config = Config::from_toml(toml).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_network(Some("ropsten")).unwrap().name, "ropsten");
        assert!(matches!(
            config.resolve_network(None),
            Err(ConfigError::UnknownNetwork(name)) if name == "development"
        ));
    }

    #[test]
    fn test_load_shipped_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bth.toml");
        let config = Config::from_toml(Config::load_toml(&path).unwrap()).unwrap();

        let live = config.resolve_network(Some("live")).unwrap();
        assert_eq!(live.gas_price, Some(20_000_000_000));
        assert_eq!(config.resolve_network(None).unwrap().name, "development");
        assert_eq!(config.deployment, DeploymentSettings::default());
        assert!(config.deployment.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = Config {
            confirmation_timeout_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.registry.resolve("live").is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn test_to_json() {
        let json = Config::default().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["network"], "development");
        assert_eq!(value["networks"].as_array().unwrap().len(), 2);
        assert_eq!(value["deployment"]["max_halvings"], 64);
    }
}
