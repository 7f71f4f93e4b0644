use std::{fmt, io, path::PathBuf};

use thiserror::Error;
use web3::{
    ethabi::{self, ParamType},
    types::{H160, H256, U256},
};

/// Code returned by EIP-1193 wallets when the user rejects a request
const USER_REJECTED_REQUEST: i64 = 4001;

/// Fields of a submission request, used to report which one failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// Recipient address
    Recipient,
    /// Amount, in ether
    Amount,
    /// Free-text description
    Description,
    /// Category label
    Category,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Recipient => "recipient",
            Field::Amount => "amount",
            Field::Description => "description",
            Field::Category => "category",
        };

        f.write_str(s)
    }
}

/// Bad local input. These errors never reach the network.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Empty(Field),
    #[error("recipient `{0}` is not a valid address")]
    InvalidRecipient(String),
    #[error("amount `{0}` is not a number")]
    NotANumber(String),
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount `{0}` has more decimal places than the ledger unit allows")]
    TooPrecise(String),
    #[error("amount `{0}` is too large")]
    Overflow(String),
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("method `{method}` expects {expected} arguments, got {got}")]
    ArgumentCount {
        method: String,
        expected: usize,
        got: usize,
    },
    #[error("argument `{name}` of method `{method}` must be of type {kind}")]
    ArgumentType {
        method: String,
        name: String,
        kind: ParamType,
    },
    #[error("unable to encode call: {0}")]
    Encode(String),
}

impl ValidationError {
    /// The submission request field that caused this error, if any
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::Empty(field) => Some(*field),
            ValidationError::InvalidRecipient(_) => Some(Field::Recipient),
            ValidationError::NotANumber(_)
            | ValidationError::NotPositive
            | ValidationError::TooPrecise(_)
            | ValidationError::Overflow(_) => Some(Field::Amount),
            _ => None,
        }
    }
}

/// Client or wallet misconfiguration
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("no signing context available, connect a wallet first")]
    NoSigningContext,
    #[error("the wallet does not expose any account")]
    NoAccount,
    #[error("access to account {0:?} was revoked")]
    Revoked(H160),
    #[error("account {account:?} does not exist, available accounts: {available:?}")]
    UnknownAccount {
        account: H160,
        available: Vec<H160>,
    },
    #[error("connected to chain {actual} but the network expects chain {expected}")]
    WrongNetwork { expected: u64, actual: U256 },
    #[error("failed to connect to Ethereum client: {0}")]
    Connect(#[source] web3::Error),
    #[error("unable to load contract interface: {0}")]
    Interface(#[source] ethabi::Error),
    #[error("unable to read contract interface from `{path}`: {source}")]
    InterfaceFile { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Config(#[from] auditor_config::Error),
}

/// Transport or wallet failure before the transaction was accepted
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("transaction declined in wallet: {0}")]
    Declined(#[source] web3::Error),
    #[error("transaction rejected: {0}")]
    Rejected(#[source] web3::Error),
}

impl From<web3::Error> for SubmissionError {
    fn from(err: web3::Error) -> Self {
        match &err {
            web3::Error::Rpc(rpc) if rpc.code.code() == USER_REJECTED_REQUEST => {
                SubmissionError::Declined(err)
            }
            _ => SubmissionError::Rejected(err),
        }
    }
}

/// The transaction was accepted by the transport but not finalized successfully
#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("transaction {0:?} reverted")]
    Reverted(H256),
    #[error("receipt of transaction {transaction_hash:?} has unexpected status {status:?}")]
    UnknownStatus {
        transaction_hash: H256,
        status: Option<web3::types::U64>,
    },
    #[error("transaction {transaction_hash:?} was not confirmed: {source}")]
    NotConfirmed {
        transaction_hash: H256,
        source: web3::Error,
    },
}

/// Error returned by a ledger notification that does not match the expected event layout
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("expected event `{expected}`, got `{got}`")]
    UnexpectedEvent { expected: String, got: String },
    #[error("event parameter `{0}` is missing")]
    MissingParam(&'static str),
    #[error("event parameter `{0}` has the wrong type")]
    WrongType(&'static str),
}

/// Any error produced by the client
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
    #[error("read-only call failed: {0}")]
    Query(#[source] web3::Error),
    #[error("unable to decode contract output: {0}")]
    Decode(#[source] ethabi::Error),
}
