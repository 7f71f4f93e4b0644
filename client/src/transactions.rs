use std::{collections::HashSet, convert::TryFrom};

use serde::Serialize;
use web3::{
    ethabi::Token,
    types::{H160, H256, U256, U64},
};

use crate::{
    binding::LedgerEvent, error::EventDecodeError, ether::Ether,
    interface::TRANSACTION_REGISTERED,
};

/// Transaction committed to the ledger, as reported by a `TransactionRegistered` notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmedTransaction {
    /// Identifier assigned by the contract, unique per contract
    pub id: U256,
    /// Account that registered the transaction
    pub from: H160,
    /// Recipient of the transaction
    pub to: H160,
    /// Amount transferred
    pub amount: Ether,
    /// Category label
    pub category: String,
    /// Hash of the transaction that emitted the notification
    pub transaction_hash: Option<H256>,
    /// Block that includes the transaction
    pub block_number: Option<U64>,
}

impl TryFrom<&LedgerEvent> for ConfirmedTransaction {
    type Error = EventDecodeError;

    fn try_from(event: &LedgerEvent) -> Result<Self, Self::Error> {
        if event.name != TRANSACTION_REGISTERED {
            return Err(EventDecodeError::UnexpectedEvent {
                expected: TRANSACTION_REGISTERED.to_string(),
                got: event.name.clone(),
            });
        }

        let param = |name: &'static str| {
            event
                .param(name)
                .ok_or(EventDecodeError::MissingParam(name))
        };
        let uint = |name: &'static str| -> Result<U256, EventDecodeError> {
            match param(name)? {
                Token::Uint(x) => Ok(*x),
                _ => Err(EventDecodeError::WrongType(name)),
            }
        };
        let address = |name: &'static str| -> Result<H160, EventDecodeError> {
            match param(name)? {
                Token::Address(x) => Ok(*x),
                _ => Err(EventDecodeError::WrongType(name)),
            }
        };

        let category = match param("category")? {
            Token::String(x) => x.clone(),
            _ => return Err(EventDecodeError::WrongType("category")),
        };

        Ok(ConfirmedTransaction {
            id: uint("id")?,
            from: address("from")?,
            to: address("to")?,
            amount: Ether::from_wei(uint("amount")?),
            category,
            transaction_hash: event.transaction_hash,
            block_number: event.block_number,
        })
    }
}

/// Ordered list of confirmed transactions, without duplicates.
///
/// Entries are kept in arrival order. A transaction whose id is already in the log is ignored,
/// so the same notification can be delivered more than once.
#[derive(Clone, Debug, Default)]
pub struct TransactionLog {
    entries: Vec<ConfirmedTransaction>,
    ids: HashSet<U256>,
}

impl TransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction. Returns `false` if a transaction with the same id was already
    /// appended.
    pub fn append(&mut self, transaction: ConfirmedTransaction) -> bool {
        if !self.ids.insert(transaction.id) {
            return false;
        }
        self.entries.push(transaction);

        true
    }

    /// Whether a transaction with this id was appended
    pub fn contains(&self, id: &U256) -> bool {
        self.ids.contains(id)
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &ConfirmedTransaction> {
        self.entries.iter()
    }

    /// Transactions in arrival order
    pub fn as_slice(&self) -> &[ConfirmedTransaction] {
        &self.entries
    }
}
