//! Client for the transaction auditor contract
//!
//! The client is split in the same layers the application uses:
//!
//! * [`signer`]: the wallet boundary, a [`SigningContext`](signer::SigningContext) able to
//!   submit transactions, wait for confirmations and stream contract logs.
//! * [`binding`]: a [`ContractBinding`](binding::ContractBinding) that validates calls against
//!   the contract interface and exposes cancellable event subscriptions.
//! * [`submission`]: the state machine followed when registering a transaction.
//! * [`actors::event_sync`]: the actor that keeps the in-memory transaction log in sync with the
//!   notifications emitted by the contract.
//! * [`session`]: the object owning all of the above for the lifetime of the application.
#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

/// Actors
pub mod actors;
/// Contract binding
pub mod binding;
/// Ether amounts
pub mod ether;
/// Error types
pub mod error;
/// Contract interface description
pub mod interface;
/// Reputation scores
pub mod reputation;
/// Application session
pub mod session;
/// Wallet boundary
pub mod signer;
/// Transaction submission flow
pub mod submission;
/// Confirmed transactions and the in-memory transaction log
pub mod transactions;
/// Helpers
pub mod utils;

#[cfg(test)]
mod mock;

pub use crate::{
    binding::{ContractBinding, LedgerEvent, PendingTransaction, Subscription},
    error::Error,
    session::Session,
    signer::{SigningContext, Web3Signer},
};
