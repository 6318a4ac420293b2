//! BTH Tools Library
//!
//! Configuration, validation and submission of the BTH foundation contract
//! deployment against a named EVM network.

pub mod address;
pub mod artifact;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod params;
pub mod registry;
pub mod rpc;

pub use artifact::ContractArtifact;
pub use config::{Config, ConfigError};
pub use deploy::{run, DeployOptions, Deployer, DeploymentPlan, DeploymentReceipt};
pub use error::DeployError;
pub use params::{DeploymentParameters, DeploymentSettings};
pub use registry::{NetworkId, NetworkProfile, NetworkRegistry};
pub use rpc::{HttpTransport, Transport};
