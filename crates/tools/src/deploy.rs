//! Single-shot contract deployment.
//!
//! [`Deployer::deploy`] submits exactly one contract-creation transaction
//! and waits for its receipt. Nothing is retried: any failure ends the run.
//! [`run`] is the whole command: resolve the network, validate the
//! parameters, load the artifact, then deploy.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::ContractArtifact;
use crate::config::{Config, DEFAULT_CONFIRMATION_TIMEOUT_MS, DEFAULT_GAS_LIMIT, DEFAULT_POLL_INTERVAL_MS};
use crate::error::DeployError;
use crate::params::DeploymentParameters;
use crate::registry::{NetworkId, NetworkProfile};
use crate::rpc::{TransactionReceipt, TransactionRequest, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Bound on the whole node interaction, submission included
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub gas_limit: u64,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_millis(DEFAULT_CONFIRMATION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReceipt {
    pub network: String,
    pub contract_name: String,
    pub contract_address: Address,
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

/// Target network and validated constructor parameters for one run.
#[derive(Debug, Clone)]
pub struct DeploymentPlan<'a> {
    pub network: &'a NetworkProfile,
    pub params: DeploymentParameters,
}

impl<'a> DeploymentPlan<'a> {
    /// Resolve `network` (or the configured default) and validate the
    /// deployment settings, in that order. Touches neither disk nor node.
    pub fn from_config(config: &'a Config, network: Option<&str>) -> Result<Self, DeployError> {
        let network = config.resolve_network(network)?;
        let params = config.deployment.validate()?;
        Ok(Self { network, params })
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn transaction_data(&self, artifact: &ContractArtifact) -> Bytes {
        Bytes::from(artifact.deployment_data(&self.params.encode_constructor_args()))
    }
}

/// Deploy the artifact at `artifact_path` to `network`.
///
/// `connect` builds the transport for the resolved profile and is only
/// invoked once the network, the parameters and the artifact are all valid.
pub async fn run<T, F>(
    config: &Config,
    network: Option<&str>,
    artifact_path: &Path,
    connect: F,
) -> Result<DeploymentReceipt, DeployError>
where
    T: Transport,
    F: FnOnce(&NetworkProfile) -> Result<T, DeployError>,
{
    let plan = DeploymentPlan::from_config(config, network)?;
    let artifact = ContractArtifact::load(artifact_path)?;
    let transport = connect(plan.network)?;

    Deployer::new(transport, artifact, config.deploy_options())
        .deploy(&plan.params, plan.network)
        .await
}

pub struct Deployer<T> {
    transport: T,
    artifact: ContractArtifact,
    options: DeployOptions,
}

impl<T: Transport> Deployer<T> {
    pub fn new(transport: T, artifact: ContractArtifact, options: DeployOptions) -> Self {
        Self {
            transport,
            artifact,
            options,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deploy the artifact with `params` to `network`.
    ///
    /// Local checks run before any node call. The node interaction is
    /// bounded by `confirmation_timeout`.
    pub async fn deploy(
        &self,
        params: &DeploymentParameters,
        network: &NetworkProfile,
    ) -> Result<DeploymentReceipt, DeployError> {
        let request_data =
            Bytes::from(self.artifact.deployment_data(&params.encode_constructor_args()));

        info!(
            network = %network.name,
            url = %network.rpc_url(),
            contract = %self.artifact.contract_name,
            "deploying contract"
        );

        let timeout = self.options.confirmation_timeout;
        match tokio::time::timeout(timeout, self.submit(request_data, network)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(network = %network.name, ?timeout, "deployment not confirmed in time");
                Err(DeployError::DeploymentTimeout(timeout))
            }
        }
    }

    async fn submit(
        &self,
        data: Bytes,
        network: &NetworkProfile,
    ) -> Result<DeploymentReceipt, DeployError> {
        if let NetworkId::Id(expected) = network.network_id {
            let actual = self.transport.net_version().await?;
            if !network.network_id.matches(&actual) {
                return Err(DeployError::NetworkMismatch { expected, actual });
            }
        }

        let from = self.sender(network).await?;
        let tx = TransactionRequest {
            from,
            data,
            gas: U64::from(self.options.gas_limit),
            gas_price: network.gas_price.map(U256::from),
        };

        let hash = self.transport.send_transaction(&tx).await?;
        info!(tx = %hash, %from, "deployment transaction submitted");

        let receipt = self.wait_for_receipt(hash).await?;
        self.finish(network, receipt)
    }

    async fn sender(&self, network: &NetworkProfile) -> Result<Address, DeployError> {
        if let Some(from) = network.from {
            return Ok(from);
        }
        self.transport
            .accounts()
            .await?
            .first()
            .copied()
            .ok_or_else(|| {
                DeployError::DeploymentRejected(
                    "node has no unlocked accounts and the network sets no `from`".to_string(),
                )
            })
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, DeployError> {
        let mut polls = 0u64;
        loop {
            if let Some(receipt) = self.transport.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            polls += 1;
            debug!(tx = %hash, polls, "receipt pending");
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn finish(
        &self,
        network: &NetworkProfile,
        receipt: TransactionReceipt,
    ) -> Result<DeploymentReceipt, DeployError> {
        if receipt.reverted() {
            return Err(DeployError::DeploymentRejected(format!(
                "transaction {} reverted during contract creation",
                receipt.transaction_hash
            )));
        }
        let contract_address = receipt.contract_address.ok_or_else(|| {
            DeployError::DeploymentRejected(format!(
                "receipt for {} carries no contract address",
                receipt.transaction_hash
            ))
        })?;

        let block_number = receipt.block_number.map(|b| b.to::<u64>());
        info!(
            network = %network.name,
            address = %contract_address,
            tx = %receipt.transaction_hash,
            block = ?block_number,
            "contract deployed"
        );

        Ok(DeploymentReceipt {
            network: network.name.clone(),
            contract_name: self.artifact.contract_name.clone(),
            contract_address,
            transaction_hash: receipt.transaction_hash,
            block_number,
            gas_used: receipt.gas_used,
        })
    }
}
