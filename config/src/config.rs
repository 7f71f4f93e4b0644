//! # Config
//!
//! This module contains the `Config` struct, which holds all the
//! configuration params of the client: the table of known networks,
//! the name of the network to use and the polling rates used when
//! talking to the Ethereum client.
//!
//! You can create an instance of this config in several ways:
//!
//! * By using the [Default](std::default::Default) instance, which only
//!   knows about a `development` network running at `127.0.0.1:8545`
//! ```
//! use auditor_config::Config;
//!
//! Config::default();
//! ```
//! * By loading it from a TOML file, see [loaders::toml](crate::loaders::toml)
//! * By loading it from the environment, see [loaders::env](crate::loaders::env)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io, path::PathBuf};
use thiserror::Error;
use web3::types::H160;

use crate::{defaults, loaders::env::nested_toml_if_using_envy};

/// Errors produced while loading or reading the configuration
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read
    #[error("unable to read configuration file: {0}")]
    Io(#[from] io::Error),
    /// The configuration file is not valid TOML or has unexpected fields
    #[error("unable to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The environment variables could not be deserialized
    #[error("unable to read configuration from environment: {0}")]
    Env(#[from] envy::Error),
    /// The selected network is not present in the network table
    #[error("unknown network `{name}`, known networks: {known:?}")]
    UnknownNetwork {
        /// Selected network name
        name: String,
        /// Names present in the network table
        known: Vec<String>,
    },
    /// The selected network has no contract address
    #[error("network `{0}` has no contract address")]
    MissingContractAddress(String),
}

/// Configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the network to use, must be a key of `networks`
    #[serde(default = "defaults::network")]
    pub network: String,
    /// Known networks, indexed by name
    #[serde(
        default = "defaults::networks",
        deserialize_with = "nested_toml_if_using_envy"
    )]
    pub networks: BTreeMap<String, Network>,
    /// Ethereum account used to sign transactions. If missing, the first account exposed by the
    /// wallet is used
    #[serde(default)]
    pub eth_from: Option<H160>,
    /// Path of a JSON file containing the contract interface. If missing, the interface embedded
    /// in the client is used
    #[serde(default)]
    pub contract_abi_path: Option<PathBuf>,
    /// Polling period used while waiting for transaction confirmations
    #[serde(default = "defaults::eth_txs_polling_rate_ms")]
    pub eth_txs_polling_rate_ms: u64,
    /// Polling period of the log filters backing event subscriptions
    #[serde(default = "defaults::eth_event_polling_rate_ms")]
    pub eth_event_polling_rate_ms: u64,
    /// Replay contract events starting at this block. If missing, only new events are followed
    #[serde(default)]
    pub eth_events_from_block: Option<u64>,
    /// Logging
    #[serde(default, deserialize_with = "nested_toml_if_using_envy")]
    pub log: Log,
}

/// Per network settings, mirroring the deployment networks of the contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Network {
    /// Url of the ethereum client
    pub eth_jsonrpc_url: String,
    /// Expected chain id. If missing, any chain is accepted
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Address of the deployed auditor contract
    #[serde(default)]
    pub contract_address: Option<H160>,
    /// Gas limit for state-changing calls. If missing, let the client estimate
    #[serde(default)]
    pub gas: Option<u64>,
    /// Gas price in wei. If missing, let the client decide
    #[serde(default)]
    pub gas_price: Option<u64>,
    /// Number of block confirmations needed to assume finality
    #[serde(default = "defaults::confirmations")]
    pub confirmations: usize,
}

/// Logging-specific configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Log {
    /// Level for the `auditor` modules
    #[serde(default = "defaults::log_level")]
    pub level: log::LevelFilter,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: defaults::network(),
            networks: defaults::networks(),
            eth_from: None,
            contract_abi_path: None,
            eth_txs_polling_rate_ms: defaults::eth_txs_polling_rate_ms(),
            eth_event_polling_rate_ms: defaults::eth_event_polling_rate_ms(),
            eth_events_from_block: None,
            log: Log::default(),
        }
    }
}

impl Config {
    /// Settings of the selected network
    pub fn selected_network(&self) -> Result<&Network, Error> {
        self.networks
            .get(&self.network)
            .ok_or_else(|| Error::UnknownNetwork {
                name: self.network.clone(),
                known: self.networks.keys().cloned().collect(),
            })
    }

    /// Address of the contract in the selected network
    pub fn contract_address(&self) -> Result<H160, Error> {
        self.selected_network()?
            .contract_address
            .ok_or_else(|| Error::MissingContractAddress(self.network.clone()))
    }

    /// Select another network by name, failing if it is not in the network table
    pub fn with_network(mut self, name: &str) -> Result<Self, Error> {
        self.network = name.to_string();
        self.selected_network()?;

        Ok(self)
    }
}
