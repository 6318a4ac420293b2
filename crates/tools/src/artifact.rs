//! Compiled contract artifacts.
//!
//! Reads the JSON artifact emitted by the Solidity toolchain
//! (`build/contracts/BTH.json`) and extracts the creation bytecode.

use std::path::Path;

use serde::Deserialize;

use crate::error::DeployError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    bytecode: String,
}

/// Creation code of the contract to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: Vec<u8>,
}

impl ContractArtifact {
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract");
        Self::from_json(&content, fallback)
    }

    /// Parse an artifact; `fallback_name` is used when the JSON has no
    /// `contractName`.
    pub fn from_json(json: &str, fallback_name: &str) -> Result<Self, DeployError> {
        let raw: RawArtifact = serde_json::from_str(json)
            .map_err(|e| DeployError::Artifact(format!("invalid artifact JSON: {}", e)))?;

        let contract_name = raw
            .contract_name
            .unwrap_or_else(|| fallback_name.to_string());
        let bytecode = decode_bytecode(&raw.bytecode)?;

        Ok(Self {
            contract_name,
            bytecode,
        })
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn deployment_data(&self, constructor_args: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        data.extend_from_slice(&self.bytecode);
        data.extend_from_slice(constructor_args);
        data
    }
}

fn decode_bytecode(raw: &str) -> Result<Vec<u8>, DeployError> {
    let hex_str = raw.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);

    if hex_str.is_empty() {
        return Err(DeployError::Artifact(
            "bytecode is empty; is the contract abstract or an interface?".to_string(),
        ));
    }
    // library link placeholders look like __LibName______...
    if hex_str.contains("__") {
        return Err(DeployError::Artifact(
            "bytecode contains unlinked library references".to_string(),
        ));
    }

    hex::decode(hex_str).map_err(|e| DeployError::Artifact(format!("invalid bytecode hex: {}", e)))
}
