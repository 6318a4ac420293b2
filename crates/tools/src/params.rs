//! BTH constructor parameters.
//!
//! [`DeploymentSettings`] is the raw form read from `bth.toml`; it only
//! becomes a [`DeploymentParameters`] through [`DeploymentSettings::validate`],
//! so every parameter set that reaches the invoker is known to be deployable.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::address::parse_address;
use crate::error::DeployError;

pub const DEFAULT_GENESIS_HEIGHT: u64 = 4_000_000;
pub const DEFAULT_SUBSIDY_HALVING_INTERVAL: u64 = 210_000;
pub const DEFAULT_MAX_HALVINGS: u64 = 64;
pub const DEFAULT_REQUIRED_SIGNATURES: u64 = 3;

pub const DEFAULT_FOUNDATION_MEMBERS: [&str; 3] = [
    "0x6AA6161B17845901Cb326A3601b2e9e2D4275520",
    "0x417ea26f1c241Ca53DFdBE19f1040786E3946086",
    "0xBCB86C7dF6E896D028E5DcC0f57925D3636e25E8",
];

pub const DEFAULT_FOUNDATION_WALLET: &str = "0xB4e63046001074B223872137174EeC63A7e12Cf5";

/// `[deployment]` section of `bth.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSettings {
    #[serde(default = "default_genesis_height")]
    pub genesis_height: u64,
    #[serde(default = "default_subsidy_halving_interval")]
    pub subsidy_halving_interval: u64,
    #[serde(default = "default_max_halvings")]
    pub max_halvings: u64,
    #[serde(default = "default_foundation_members")]
    pub foundation_members: Vec<String>,
    #[serde(default = "default_required_signatures")]
    pub required_signatures: u64,
    #[serde(default = "default_foundation_wallet")]
    pub foundation_wallet: String,
}

fn default_genesis_height() -> u64 {
    DEFAULT_GENESIS_HEIGHT
}

fn default_subsidy_halving_interval() -> u64 {
    DEFAULT_SUBSIDY_HALVING_INTERVAL
}

fn default_max_halvings() -> u64 {
    DEFAULT_MAX_HALVINGS
}

fn default_foundation_members() -> Vec<String> {
    DEFAULT_FOUNDATION_MEMBERS.iter().map(|m| m.to_string()).collect()
}

fn default_required_signatures() -> u64 {
    DEFAULT_REQUIRED_SIGNATURES
}

fn default_foundation_wallet() -> String {
    DEFAULT_FOUNDATION_WALLET.to_string()
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            genesis_height: DEFAULT_GENESIS_HEIGHT,
            subsidy_halving_interval: DEFAULT_SUBSIDY_HALVING_INTERVAL,
            max_halvings: DEFAULT_MAX_HALVINGS,
            foundation_members: default_foundation_members(),
            required_signatures: DEFAULT_REQUIRED_SIGNATURES,
            foundation_wallet: DEFAULT_FOUNDATION_WALLET.to_string(),
        }
    }
}

impl DeploymentSettings {
    /// Check every invariant and produce immutable parameters.
    ///
    /// # Errors
    ///
    /// - `MalformedAddress` for any member or wallet not in `0x` + 40 hex form
    /// - `DuplicateMember` if a member appears twice
    /// - `InvalidThreshold` unless `1 <= required_signatures <= members`
    /// - `InvalidHalvingInterval` if the interval is zero
    pub fn validate(&self) -> Result<DeploymentParameters, DeployError> {
        let mut seen = HashSet::with_capacity(self.foundation_members.len());
        let mut foundation_members = Vec::with_capacity(self.foundation_members.len());
        for raw in &self.foundation_members {
            let member = parse_address(raw)?;
            if !seen.insert(member) {
                return Err(DeployError::DuplicateMember(member));
            }
            foundation_members.push(member);
        }
        let foundation_wallet = parse_address(&self.foundation_wallet)?;

        let members = foundation_members.len();
        let required = self.required_signatures;
        if required == 0 || required > members as u64 {
            return Err(DeployError::InvalidThreshold { required, members });
        }

        if self.subsidy_halving_interval == 0 {
            return Err(DeployError::InvalidHalvingInterval);
        }

        Ok(DeploymentParameters {
            genesis_height: self.genesis_height,
            subsidy_halving_interval: self.subsidy_halving_interval,
            max_halvings: self.max_halvings,
            foundation_members,
            required_signatures: required,
            foundation_wallet,
        })
    }
}

/// Validated constructor parameters for a single deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParameters {
    genesis_height: u64,
    subsidy_halving_interval: u64,
    max_halvings: u64,
    foundation_members: Vec<Address>,
    required_signatures: u64,
    foundation_wallet: Address,
}

/// Constructor arguments in the order the contract declares them.
pub type ConstructorArgs = (Vec<Address>, U256, Address, U256, U256, U256);

impl DeploymentParameters {
    pub fn genesis_height(&self) -> u64 {
        self.genesis_height
    }

    pub fn subsidy_halving_interval(&self) -> u64 {
        self.subsidy_halving_interval
    }

    pub fn max_halvings(&self) -> u64 {
        self.max_halvings
    }

    pub fn foundation_members(&self) -> &[Address] {
        &self.foundation_members
    }

    pub fn required_signatures(&self) -> u64 {
        self.required_signatures
    }

    pub fn foundation_wallet(&self) -> Address {
        self.foundation_wallet
    }

    /// `(members, required, wallet, genesis, interval, maxHalvings)`.
    ///
    /// This order is part of the contract ABI and must not change.
    pub fn constructor_args(&self) -> ConstructorArgs {
        (
            self.foundation_members.clone(),
            U256::from(self.required_signatures),
            self.foundation_wallet,
            U256::from(self.genesis_height),
            U256::from(self.subsidy_halving_interval),
            U256::from(self.max_halvings),
        )
    }

    /// ABI-encoded constructor arguments, ready to append to creation bytecode.
    pub fn encode_constructor_args(&self) -> Vec<u8> {
        self.constructor_args().abi_encode_params()
    }
}
