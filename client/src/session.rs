use std::rc::Rc;

use actix::{Actor, Addr};
use web3::types::{TransactionReceipt, H160};

use auditor_config::Config;

use crate::{
    actors::event_sync::{EventSync, GetTransactions, Unmount},
    binding::ContractBinding,
    error::{BindingError, Error},
    interface::TRANSACTION_REGISTERED,
    reputation::{self, ReputationPair},
    signer::{SigningContext, Web3Signer},
    submission::{SubmissionFlow, SubmissionRequest},
    transactions::ConfirmedTransaction,
};

/// Everything the application needs while it is running: the contract binding, the submission
/// flow and, once mounted, the event synchronization actor.
///
/// Subscriptions are released when the session is unmounted or dropped.
pub struct Session {
    binding: Rc<ContractBinding>,
    submission: SubmissionFlow,
    events: Vec<String>,
    event_sync: Option<Addr<EventSync>>,
}

impl Drop for Session {
    fn drop(&mut self) {
        log::trace!("Dropping Session");
        self.unmount();
    }
}

impl Session {
    /// Create a session around an existing binding
    pub fn new(binding: ContractBinding) -> Self {
        Self {
            binding: Rc::new(binding),
            submission: SubmissionFlow::new(),
            events: vec![TRANSACTION_REGISTERED.to_string()],
            event_sync: None,
        }
    }

    /// Connect to the wallet of the selected network and bind the configured contract
    pub async fn connect(config: &Config) -> Result<Self, BindingError> {
        let signer = Web3Signer::connect(config).await?;
        let binding = ContractBinding::from_config(config, Some(Rc::new(signer)))?;

        Ok(Self::new(binding))
    }

    /// Contract binding
    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    /// Submission flow, with the state of the last attempt
    pub fn submission(&self) -> &SubmissionFlow {
        &self.submission
    }

    /// Whether the event synchronization actor is running
    pub fn is_mounted(&self) -> bool {
        self.event_sync.is_some()
    }

    /// Start following contract events. Mounting twice returns the running actor.
    pub fn mount(&mut self) -> Addr<EventSync> {
        if let Some(addr) = &self.event_sync {
            return addr.clone();
        }

        log::debug!("Mounting session on contract {:?}", self.binding.address());
        let addr = EventSync::with_events(Rc::clone(&self.binding), self.events.clone()).start();
        self.event_sync = Some(addr.clone());

        addr
    }

    /// Stop following contract events and release every subscription. Safe to call at any
    /// time, including before `mount`.
    pub fn unmount(&mut self) {
        if let Some(addr) = self.event_sync.take() {
            log::debug!("Unmounting session");
            addr.do_send(Unmount);
        }
        self.binding.unsubscribe_all();
    }

    /// Snapshot of the transaction log. Empty while unmounted.
    pub async fn transactions(&self) -> Vec<ConfirmedTransaction> {
        let addr = match &self.event_sync {
            Some(addr) => addr.clone(),
            None => return vec![],
        };

        match addr.send(GetTransactions).await {
            Ok(transactions) => transactions,
            Err(e) => {
                log::error!("Unable to read the transaction log: {}", e);
                vec![]
            }
        }
    }

    /// Register a transaction and wait for its confirmation
    pub async fn register(
        &mut self,
        request: &SubmissionRequest,
    ) -> Result<TransactionReceipt, Error> {
        self.submission.submit(&self.binding, request).await
    }

    /// Query the reputation of a user and an auditor
    pub async fn reputation(&self, user: H160, auditor: H160) -> Result<ReputationPair, Error> {
        reputation::fetch(&self.binding, user, auditor).await
    }

    /// Use another signing context, or none. The binding is recreated, so subscriptions are
    /// released and, if the session was mounted, opened again with an empty transaction log.
    pub fn replace_signer(&mut self, signer: Option<Rc<dyn SigningContext>>) {
        let was_mounted = self.is_mounted();
        self.unmount();

        log::info!("Signing context changed, recreating contract binding");
        self.binding = Rc::new(self.binding.with_signer(signer));
        self.submission.reset();

        if was_mounted {
            self.mount();
        }
    }
}
