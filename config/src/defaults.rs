//! # Default values
//!
//! Default values for the configuration params that can be omitted from
//! the configuration file.

use std::collections::BTreeMap;

use crate::config::Network;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "auditor.toml";

/// Prefix of the environment variables read by the `envy` loader
pub const ENV_PREFIX: &str = "AUDITOR_";

/// Default network name: `development`
pub fn network() -> String {
    "development".to_string()
}

/// Default network table: a single local development node
pub fn networks() -> BTreeMap<String, Network> {
    let mut networks = BTreeMap::new();
    networks.insert(
        network(),
        Network {
            eth_jsonrpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: None,
            contract_address: None,
            gas: None,
            gas_price: None,
            confirmations: confirmations(),
        },
    );

    networks
}

/// Default number of confirmations: `1`
pub fn confirmations() -> usize {
    1
}

/// Default polling period for transaction receipts: 1 second
pub fn eth_txs_polling_rate_ms() -> u64 {
    1_000
}

/// Default polling period for event filters: 1 second
pub fn eth_event_polling_rate_ms() -> u64 {
    1_000
}

/// Default log level
pub fn log_level() -> log::LevelFilter {
    log::LevelFilter::Info
}
