use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use actix::{Message, Recipient};
use futures::{
    future::{AbortHandle, Abortable},
    StreamExt,
};
use web3::{
    ethabi::{self, LogParam, RawLog, Token},
    types::{
        BlockNumber, Bytes, CallRequest, FilterBuilder, Log, TransactionReceipt,
        TransactionRequest, H160, H256, U256, U64,
    },
};

use auditor_config::Config;

use crate::{
    error::{BindingError, ConfirmationError, Error, SubmissionError, ValidationError},
    interface,
    signer::SigningContext,
};

/// Options applied to every operation sent through a binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOptions {
    /// Gas limit for state-changing calls. If missing, let the client estimate
    pub gas: Option<U256>,
    /// Gas price. If missing, let the client decide
    pub gas_price: Option<U256>,
    /// Number of block confirmations needed to assume finality
    pub confirmations: usize,
    /// First block whose events are delivered to subscriptions. If missing, only new events
    pub from_block: Option<u64>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            gas: None,
            gas_price: None,
            confirmations: 1,
            from_block: None,
        }
    }
}

impl CallOptions {
    /// Read the options of the selected network
    pub fn from_config(config: &Config) -> Result<Self, auditor_config::Error> {
        let network = config.selected_network()?;

        Ok(Self {
            gas: network.gas.map(U256::from),
            gas_price: network.gas_price.map(U256::from),
            confirmations: network.confirmations,
            from_block: config.eth_events_from_block,
        })
    }
}

/// Notification emitted by the contract, decoded with the contract interface
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEvent {
    /// Event name
    pub name: String,
    /// Decoded event parameters, indexed and non-indexed
    pub params: Vec<LogParam>,
    /// Hash of the transaction that emitted the event
    pub transaction_hash: Option<H256>,
    /// Block that includes the transaction
    pub block_number: Option<U64>,
}

impl Message for LedgerEvent {
    type Result = ();
}

impl LedgerEvent {
    /// Value of the parameter called `name`
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params
            .iter()
            .find(|param| param.name == name)
            .map(|param| &param.value)
    }
}

/// Identifier of a subscription, unique within a binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Subscriptions {
    next_id: u64,
    active: HashMap<SubscriptionId, AbortHandle>,
}

/// Handle of an active subscription. Dropping it does not cancel the subscription, use
/// `unsubscribe` or `ContractBinding::unsubscribe_all`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    event: String,
    registry: Weak<RefCell<Subscriptions>>,
}

impl Subscription {
    /// Identifier of this subscription
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Name of the subscribed event
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Stop delivering notifications to the handler. Does nothing if the subscription was already
    /// released.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Some(handle) = registry.borrow_mut().active.remove(&self.id) {
                handle.abort();
                log::debug!("Subscription {} to {} released", self.id, self.event);
            }
        }
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("next_id", &self.next_id)
            .field("active", &self.active.len())
            .finish()
    }
}

/// Operation accepted by the transport and waiting for finality
pub struct PendingTransaction {
    transaction_hash: H256,
    confirmations: usize,
    signer: Rc<dyn SigningContext>,
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("transaction_hash", &self.transaction_hash)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}

impl PendingTransaction {
    /// Hash of the submitted transaction
    pub fn transaction_hash(&self) -> H256 {
        self.transaction_hash
    }

    /// Wait for the transaction to be confirmed. The transaction cannot be cancelled: dropping
    /// this future only stops waiting, the remote effect may still happen.
    pub async fn confirm(self) -> Result<TransactionReceipt, ConfirmationError> {
        let transaction_hash = self.transaction_hash;
        let receipt = self
            .signer
            .wait_for_confirmation(transaction_hash, self.confirmations)
            .await
            .map_err(|source| ConfirmationError::NotConfirmed {
                transaction_hash,
                source,
            })?;

        handle_receipt(receipt)
    }
}

/// Handle Ethereum transaction receipt
pub fn handle_receipt(receipt: TransactionReceipt) -> Result<TransactionReceipt, ConfirmationError> {
    match receipt.status {
        Some(x) if x == U64::from(1) => Ok(receipt),
        Some(x) if x == U64::from(0) => Err(ConfirmationError::Reverted(receipt.transaction_hash)),
        status => Err(ConfirmationError::UnknownStatus {
            transaction_hash: receipt.transaction_hash,
            status,
        }),
    }
}

/// Contract bound to an address, an interface description and a signing context
pub struct ContractBinding {
    address: H160,
    interface: ethabi::Contract,
    signer: Option<Rc<dyn SigningContext>>,
    options: CallOptions,
    subscriptions: Rc<RefCell<Subscriptions>>,
}

impl fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBinding")
            .field("address", &self.address)
            .field("signer", &self.signer.is_some())
            .field("options", &self.options)
            .field("subscriptions", &self.subscriptions.borrow())
            .finish()
    }
}

impl Drop for ContractBinding {
    fn drop(&mut self) {
        log::trace!("Dropping ContractBinding");
        self.unsubscribe_all();
    }
}

impl ContractBinding {
    /// Create a new binding
    pub fn new(
        address: H160,
        interface: ethabi::Contract,
        signer: Option<Rc<dyn SigningContext>>,
        options: CallOptions,
    ) -> Self {
        Self {
            address,
            interface,
            signer,
            options,
            subscriptions: Default::default(),
        }
    }

    /// Create a binding to the contract of the selected network
    pub fn from_config(
        config: &Config,
        signer: Option<Rc<dyn SigningContext>>,
    ) -> Result<Self, BindingError> {
        let address = config.contract_address()?;
        let interface = interface::load(config.contract_abi_path.as_deref())?;
        let options = CallOptions::from_config(config)?;

        Ok(Self::new(address, interface, signer, options))
    }

    /// Create a binding to the same contract using another signing context. The new binding
    /// starts without subscriptions.
    pub fn with_signer(&self, signer: Option<Rc<dyn SigningContext>>) -> Self {
        Self::new(
            self.address,
            self.interface.clone(),
            signer,
            self.options.clone(),
        )
    }

    /// Address of the contract
    pub fn address(&self) -> H160 {
        self.address
    }

    /// Interface description of the contract
    pub fn interface(&self) -> &ethabi::Contract {
        &self.interface
    }

    /// Options applied to every operation
    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// Signing context, if any
    pub fn signer(&self) -> Result<&Rc<dyn SigningContext>, BindingError> {
        self.signer.as_ref().ok_or(BindingError::NoSigningContext)
    }

    /// Number of subscriptions still delivering notifications
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().active.len()
    }

    fn function(&self, method: &str) -> Result<&ethabi::Function, ValidationError> {
        self.interface
            .function(method)
            .map_err(|_| ValidationError::UnknownMethod(method.to_string()))
    }

    /// Check `args` against the inputs of `method` and encode the call data
    pub fn encode_call(&self, method: &str, args: &[Token]) -> Result<Vec<u8>, ValidationError> {
        let function = self.function(method)?;
        if function.inputs.len() != args.len() {
            return Err(ValidationError::ArgumentCount {
                method: method.to_string(),
                expected: function.inputs.len(),
                got: args.len(),
            });
        }
        for (param, arg) in function.inputs.iter().zip(args) {
            if !arg.type_check(&param.kind) {
                return Err(ValidationError::ArgumentType {
                    method: method.to_string(),
                    name: param.name.clone(),
                    kind: param.kind.clone(),
                });
            }
        }

        function
            .encode_input(args)
            .map_err(|e| ValidationError::Encode(e.to_string()))
    }

    /// Sign and submit a call to a state-changing method.
    ///
    /// Returns as soon as the transport accepts the transaction. Failed submissions are never
    /// retried.
    pub async fn call(&self, method: &str, args: Vec<Token>) -> Result<PendingTransaction, Error> {
        let signer = self.signer()?;
        let from = signer.account()?;
        let data = self.encode_call(method, &args)?;

        let tx = TransactionRequest {
            from,
            to: Some(self.address),
            gas: self.options.gas,
            gas_price: self.options.gas_price,
            data: Some(Bytes(data)),
            ..Default::default()
        };

        log::debug!("Sending {} to contract {:?}", method, self.address);
        let transaction_hash = signer
            .send_transaction(tx)
            .await
            .map_err(SubmissionError::from)?;
        log::info!("{} accepted with transaction hash {:?}", method, transaction_hash);

        Ok(PendingTransaction {
            transaction_hash,
            confirmations: self.options.confirmations,
            signer: Rc::clone(signer),
        })
    }

    /// Execute a read-only method and decode its outputs
    pub async fn query(&self, method: &str, args: Vec<Token>) -> Result<Vec<Token>, Error> {
        let signer = self.signer()?;
        let data = self.encode_call(method, &args)?;

        let req = CallRequest {
            from: signer.account().ok(),
            to: Some(self.address),
            data: Some(Bytes(data)),
            ..Default::default()
        };

        let output = signer.call(req).await.map_err(Error::Query)?;

        self.function(method)?
            .decode_output(&output.0)
            .map_err(Error::Decode)
    }

    /// Deliver every `event_name` notification emitted by the contract to `handler`, in the
    /// order the transport delivers them.
    ///
    /// Transport errors are logged and the subscription keeps going. Notifications that cannot be
    /// decoded are logged and skipped. The subscription ends when it is released or when the
    /// handler stops accepting messages.
    ///
    /// # Panics
    ///
    /// The subscription runs as a task of the current actix `System`, so this panics when called
    /// outside of a running one.
    pub fn subscribe(
        &self,
        event_name: &str,
        handler: Recipient<LedgerEvent>,
    ) -> Result<Subscription, Error> {
        let signer = self.signer()?;
        let event = self
            .interface
            .event(event_name)
            .map_err(|_| ValidationError::UnknownEvent(event_name.to_string()))?
            .clone();

        let from_block = self
            .options
            .from_block
            .map(|block| BlockNumber::Number(block.into()))
            .unwrap_or(BlockNumber::Latest);
        let filter = FilterBuilder::default()
            .address(vec![self.address])
            .topics(Some(vec![event.signature()]), None, None, None)
            .from_block(from_block)
            .build();
        log::debug!(
            "Subscribing to contract {:?} topic {:?}",
            self.address,
            event.signature()
        );
        let mut logs = signer.logs(filter);

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let id = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let id = SubscriptionId(subscriptions.next_id);
            subscriptions.next_id += 1;
            subscriptions.active.insert(id, abort_handle);

            id
        };

        let registry = Rc::downgrade(&self.subscriptions);
        let forward = async move {
            while let Some(res) = logs.next().await {
                match res {
                    Ok(raw_log) => {
                        if let Some(ledger_event) = decode_log(&event, raw_log) {
                            if !handler.connected() {
                                log::warn!(
                                    "Handler of subscription {} is gone, stopping",
                                    id
                                );
                                break;
                            }
                            handler.do_send(ledger_event);
                        }
                    }
                    Err(e) => {
                        // Keep going, the next poll may succeed
                        log::error!("{} event stream error: {}", event.name, e);
                    }
                }
            }

            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().active.remove(&id);
            }
            log::debug!("Subscription {} to {} finished", id, event.name);
        };
        actix::spawn(async move {
            let _ = Abortable::new(forward, abort_registration).await;
        });

        log::info!("Subscribed to {} events ({})", event_name, id);

        Ok(Subscription {
            id,
            event: event_name.to_string(),
            registry: Rc::downgrade(&self.subscriptions),
        })
    }

    /// Release every subscription created through this binding. Safe to call any number of
    /// times, including before anything was subscribed.
    pub fn unsubscribe_all(&self) {
        let handles: Vec<(SubscriptionId, AbortHandle)> =
            self.subscriptions.borrow_mut().active.drain().collect();
        if handles.is_empty() {
            return;
        }

        log::info!("Releasing {} subscriptions", handles.len());
        for (id, handle) in handles {
            handle.abort();
            log::debug!("Subscription {} released", id);
        }
    }
}

/// Decode a raw log emitted by the contract as `event`
fn decode_log(event: &ethabi::Event, raw_log: Log) -> Option<LedgerEvent> {
    if raw_log.removed == Some(true) {
        log::warn!(
            "Ignoring {} log removed by a chain reorganization: {:?}",
            event.name,
            raw_log.transaction_hash
        );
        return None;
    }

    let Log {
        topics,
        data,
        transaction_hash,
        block_number,
        ..
    } = raw_log;

    match event.parse_log(RawLog {
        topics,
        data: data.0,
    }) {
        Ok(parsed) => Some(LedgerEvent {
            name: event.name.clone(),
            params: parsed.params,
            transaction_hash,
            block_number,
        }),
        Err(e) => {
            log::warn!(
                "Unable to decode {} log of transaction {:?}: {}",
                event.name,
                transaction_hash,
                e
            );
            None
        }
    }
}
