use std::{convert::TryFrom, rc::Rc};

use actix::prelude::*;

use crate::{
    binding::{ContractBinding, LedgerEvent},
    interface::TRANSACTION_REGISTERED,
    transactions::{ConfirmedTransaction, TransactionLog},
    utils::stop_system_if_panicking,
};

/// EventSync actor keeps the transaction log in sync with the notifications emitted by the
/// contract
pub struct EventSync {
    /// Binding used to subscribe
    binding: Rc<ContractBinding>,
    /// Names of the events of interest, without duplicates
    events: Vec<String>,
    /// Confirmed transactions, in arrival order
    log: TransactionLog,
}

impl Drop for EventSync {
    fn drop(&mut self) {
        log::trace!("Dropping EventSync");
        stop_system_if_panicking("EventSync");
    }
}

impl Actor for EventSync {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::debug!("EventSync actor has been started!");

        let recipient = ctx.address().recipient();
        for event in &self.events {
            if let Err(e) = self.binding.subscribe(event, recipient.clone()) {
                log::error!("Unable to subscribe to {} events: {}", event, e);
            }
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::debug!("EventSync actor has been stopped");

        self.binding.unsubscribe_all();
    }
}

impl EventSync {
    /// Follow `TransactionRegistered` events
    pub fn new(binding: Rc<ContractBinding>) -> Self {
        Self::with_events(binding, vec![TRANSACTION_REGISTERED.to_string()])
    }

    /// Follow the given events. Repeated names are subscribed only once.
    pub fn with_events(binding: Rc<ContractBinding>, events: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(events.len());
        for event in events {
            if !unique.contains(&event) {
                unique.push(event);
            }
        }

        Self {
            binding,
            events: unique,
            log: TransactionLog::new(),
        }
    }
}

impl Handler<LedgerEvent> for EventSync {
    type Result = ();

    fn handle(&mut self, msg: LedgerEvent, _ctx: &mut Self::Context) -> Self::Result {
        match ConfirmedTransaction::try_from(&msg) {
            Ok(transaction) => {
                let id = transaction.id;
                if self.log.append(transaction) {
                    log::info!("Transaction #{} added to the log", id);
                } else {
                    log::debug!("Transaction #{} was already in the log", id);
                }
            }
            Err(e) => {
                log::warn!(
                    "Dropping {} notification of transaction {:?}: {}",
                    msg.name,
                    msg.transaction_hash,
                    e
                );
            }
        }
    }
}

/// Get a snapshot of the transaction log
pub struct GetTransactions;

impl Message for GetTransactions {
    type Result = Vec<ConfirmedTransaction>;
}

impl Handler<GetTransactions> for EventSync {
    type Result = MessageResult<GetTransactions>;

    fn handle(&mut self, _msg: GetTransactions, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.log.as_slice().to_vec())
    }
}

/// Stop following events and stop the actor
pub struct Unmount;

impl Message for Unmount {
    type Result = ();
}

impl Handler<Unmount> for EventSync {
    type Result = ();

    fn handle(&mut self, _msg: Unmount, ctx: &mut Self::Context) -> Self::Result {
        log::debug!("Unmounting EventSync");
        ctx.stop();
    }
}
