//! Deployment error taxonomy.

use std::time::Duration;

use alloy_primitives::Address;
use thiserror::Error;

use crate::config::ConfigError;

/// Everything that can end a deployment run.
///
/// Every variant is terminal: the invoker never retries and at most one
/// transaction is ever submitted per run.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid signature threshold: {required} required of {members} foundation members")]
    InvalidThreshold { required: u64, members: usize },

    #[error("Malformed address {0:?}: expected 0x followed by 40 hex digits")]
    MalformedAddress(String),

    #[error("Duplicate foundation member: {0}")]
    DuplicateMember(Address),

    #[error("Subsidy halving interval must be greater than zero")]
    InvalidHalvingInterval,

    #[error("Contract artifact error: {0}")]
    Artifact(String),

    #[error("Network mismatch: profile expects network id {expected}, node reports {actual}")]
    NetworkMismatch { expected: u64, actual: String },

    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    #[error("Node error on {method}: {message}")]
    NodeError { method: String, message: String },

    #[error("Deployment rejected by node: {0}")]
    DeploymentRejected(String),

    #[error("Deployment not confirmed within {0:?}")]
    DeploymentTimeout(Duration),
}

impl DeployError {
    /// Process exit code reported by the `bth` binary for this failure kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::Config(ConfigError::UnknownNetwork(_)) => 2,
            DeployError::Config(_) => 3,
            DeployError::InvalidThreshold { .. } => 4,
            DeployError::MalformedAddress(_) => 5,
            DeployError::DuplicateMember(_) | DeployError::InvalidHalvingInterval => 6,
            DeployError::Artifact(_) => 7,
            DeployError::NetworkMismatch { .. } => 8,
            DeployError::NodeUnreachable(_) => 9,
            DeployError::DeploymentRejected(_) => 10,
            DeployError::DeploymentTimeout(_) => 11,
            DeployError::NodeError { .. } => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let errors = [
            DeployError::Config(ConfigError::UnknownNetwork("ropsten".into())),
            DeployError::Config(ConfigError::MissingField("host".into())),
            DeployError::InvalidThreshold { required: 0, members: 3 },
            DeployError::MalformedAddress("0x12".into()),
            DeployError::InvalidHalvingInterval,
            DeployError::Artifact("empty bytecode".into()),
            DeployError::NetworkMismatch { expected: 1, actual: "3".into() },
            DeployError::NodeUnreachable("connection refused".into()),
            DeployError::NodeError { method: "eth_accounts".into(), message: "method not found".into() },
            DeployError::DeploymentRejected("out of gas".into()),
            DeployError::DeploymentTimeout(Duration::from_secs(60)),
        ];

        let mut codes: Vec<u8> = errors.iter().map(DeployError::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_rejection_keeps_node_message() {
        let err = DeployError::DeploymentRejected("insufficient funds for gas * price + value".into());
        assert!(err.to_string().contains("insufficient funds"));
    }
}
