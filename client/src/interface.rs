use std::{fs::File, path::Path};

use web3::ethabi;

use crate::error::BindingError;

/// State-changing method used to register a transaction
pub const REGISTER_TRANSACTION: &str = "registerTransaction";
/// Read-only method returning the reputation of a user
pub const GET_USER_REPUTATION: &str = "getUserReputation";
/// Read-only method returning the reputation of an auditor
pub const GET_AUDITOR_REPUTATION: &str = "getAuditorReputation";
/// Event emitted once a registered transaction is committed
pub const TRANSACTION_REGISTERED: &str = "TransactionRegistered";

/// ABI of the auditor contract, as compiled at the time of the last deployment
const AUDITOR_ABI_JSON: &[u8] = include_bytes!("../auditor_abi.json");

/// Interface description embedded in the client
pub fn embedded() -> Result<ethabi::Contract, BindingError> {
    ethabi::Contract::load(AUDITOR_ABI_JSON).map_err(BindingError::Interface)
}

/// Load the interface description from a JSON file, or use the embedded one
pub fn load(path: Option<&Path>) -> Result<ethabi::Contract, BindingError> {
    match path {
        Some(path) => {
            log::debug!("Loading contract interface from `{}`", path.display());
            let file = File::open(path).map_err(|source| BindingError::InterfaceFile {
                path: path.to_path_buf(),
                source,
            })?;

            ethabi::Contract::load(file).map_err(BindingError::Interface)
        }
        None => embedded(),
    }
}
