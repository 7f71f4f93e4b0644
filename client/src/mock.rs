//! In-memory `SigningContext` used by the tests
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    time::Duration,
};

use futures::{
    channel::mpsc,
    future::{self, LocalBoxFuture},
    stream::LocalBoxStream,
    FutureExt, StreamExt,
};
use serde_json::json;
use web3::{
    ethabi::{self, Token},
    types::{
        Bytes, CallRequest, Filter, Log, TransactionReceipt, TransactionRequest, H160, H256, U256,
    },
};

use crate::{
    binding::{CallOptions, ContractBinding},
    error::BindingError,
    interface::{self, TRANSACTION_REGISTERED},
    signer::SigningContext,
};

/// Address of the contract used in the tests
pub fn contract_address() -> H160 {
    H160::from_low_u64_be(0xc0ffee)
}

/// Account exposed by the mock wallet
pub fn account() -> H160 {
    H160::from_low_u64_be(0xa11ce)
}

/// What happens when a transaction is sent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendBehaviour {
    Accept,
    Reject,
    Decline,
}

/// What happens when waiting for a confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmBehaviour {
    Confirm,
    Revert,
    Lost,
}

type LogSender = mpsc::UnboundedSender<Result<Log, web3::Error>>;

pub struct MockSigner {
    account: H160,
    revoked: Cell<bool>,
    send: Cell<SendBehaviour>,
    confirm: Cell<ConfirmBehaviour>,
    sent: RefCell<Vec<TransactionRequest>>,
    calls: RefCell<Vec<CallRequest>>,
    call_outputs: RefCell<HashMap<Vec<u8>, Vec<u8>>>,
    filters: RefCell<Vec<Filter>>,
    log_senders: RefCell<Vec<LogSender>>,
}

impl Default for MockSigner {
    fn default() -> Self {
        Self {
            account: account(),
            revoked: Cell::new(false),
            send: Cell::new(SendBehaviour::Accept),
            confirm: Cell::new(ConfirmBehaviour::Confirm),
            sent: Default::default(),
            calls: Default::default(),
            call_outputs: Default::default(),
            filters: Default::default(),
            log_senders: Default::default(),
        }
    }
}

impl MockSigner {
    pub fn revoke(&self) {
        self.revoked.set(true);
    }

    pub fn set_send(&self, behaviour: SendBehaviour) {
        self.send.set(behaviour);
    }

    pub fn set_confirm(&self, behaviour: ConfirmBehaviour) {
        self.confirm.set(behaviour);
    }

    /// Transactions sent so far, including the rejected ones
    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.borrow().clone()
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.borrow().clone()
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.filters.borrow().clone()
    }

    /// Answer read-only calls whose data starts with `selector` with `output`
    pub fn set_call_output(&self, selector: &[u8], output: Vec<u8>) {
        self.call_outputs
            .borrow_mut()
            .insert(selector.to_vec(), output);
    }

    /// Deliver a log to every open log stream
    pub fn emit(&self, log: Log) {
        self.log_senders
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(Ok(log.clone())).is_ok());
    }

    /// Deliver a transport error to every open log stream
    pub fn emit_error(&self) {
        self.log_senders
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(Err(web3::Error::Unreachable)).is_ok());
    }

    /// Number of log streams whose consumer is still alive
    pub fn open_streams(&self) -> usize {
        self.log_senders
            .borrow()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl SigningContext for MockSigner {
    fn account(&self) -> Result<H160, BindingError> {
        if self.revoked.get() {
            Err(BindingError::Revoked(self.account))
        } else {
            Ok(self.account)
        }
    }

    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> LocalBoxFuture<'static, Result<H256, web3::Error>> {
        self.sent.borrow_mut().push(tx);
        let nonce = self.sent.borrow().len() as u64;

        let res = match self.send.get() {
            SendBehaviour::Accept => Ok(H256::from_low_u64_be(nonce)),
            SendBehaviour::Reject => Err(web3::Error::Unreachable),
            SendBehaviour::Decline => Err(web3::Error::Rpc(jsonrpc_core::Error {
                code: jsonrpc_core::ErrorCode::ServerError(4001),
                message: "User denied transaction signature".into(),
                data: None,
            })),
        };

        future::ready(res).boxed_local()
    }

    fn wait_for_confirmation(
        &self,
        transaction_hash: H256,
        _confirmations: usize,
    ) -> LocalBoxFuture<'static, Result<TransactionReceipt, web3::Error>> {
        let res = match self.confirm.get() {
            ConfirmBehaviour::Confirm => Ok(receipt(transaction_hash, 1)),
            ConfirmBehaviour::Revert => Ok(receipt(transaction_hash, 0)),
            ConfirmBehaviour::Lost => Err(web3::Error::InvalidResponse(
                "transaction dropped from the pool".into(),
            )),
        };

        future::ready(res).boxed_local()
    }

    fn call(&self, req: CallRequest) -> LocalBoxFuture<'static, Result<Bytes, web3::Error>> {
        let data = req.data.clone().map(|data| data.0).unwrap_or_default();
        self.calls.borrow_mut().push(req);

        let output = self
            .call_outputs
            .borrow()
            .iter()
            .find(|(selector, _)| data.starts_with(selector))
            .map(|(_, output)| Bytes(output.clone()))
            .ok_or(web3::Error::Unreachable);

        future::ready(output).boxed_local()
    }

    fn logs(&self, filter: Filter) -> LocalBoxStream<'static, Result<Log, web3::Error>> {
        self.filters.borrow_mut().push(filter);
        let (tx, rx) = mpsc::unbounded();
        self.log_senders.borrow_mut().push(tx);

        rx.boxed_local()
    }
}

/// Binding to the test contract with the embedded interface
pub fn binding(signer: Option<std::rc::Rc<dyn SigningContext>>) -> ContractBinding {
    ContractBinding::new(
        contract_address(),
        interface::embedded().unwrap(),
        signer,
        CallOptions::default(),
    )
}

/// Receipt of a mined transaction with the given status
pub fn receipt(transaction_hash: H256, status: u64) -> TransactionReceipt {
    serde_json::from_value(json!({
        "transactionHash": transaction_hash,
        "transactionIndex": "0x0",
        "blockHash": H256::from_low_u64_be(0xb10c),
        "blockNumber": "0x10",
        "from": account(),
        "to": contract_address(),
        "cumulativeGasUsed": "0x5208",
        "gasUsed": "0x5208",
        "contractAddress": null,
        "logs": [],
        "status": format!("{:#x}", status),
        "root": null,
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "type": "0x0",
        "effectiveGasPrice": "0x1",
    }))
    .unwrap()
}

/// Log emitted by the test contract when transaction `id` is registered
pub fn registered_log(id: u64, to: H160, amount: U256, category: &str) -> Log {
    let event = interface::embedded()
        .unwrap()
        .event(TRANSACTION_REGISTERED)
        .unwrap()
        .clone();
    let data = ethabi::encode(&[Token::Uint(amount), Token::String(category.to_string())]);

    serde_json::from_value(json!({
        "address": contract_address(),
        "topics": [
            event.signature(),
            H256::from_low_u64_be(id),
            H256::from(account()),
            H256::from(to),
        ],
        "data": Bytes(data),
        "blockHash": H256::from_low_u64_be(0xb10c),
        "blockNumber": "0x10",
        "transactionHash": H256::from_low_u64_be(id),
        "transactionIndex": "0x0",
        "logIndex": "0x0",
        "transactionLogIndex": "0x0",
        "logType": null,
        "removed": false,
    }))
    .unwrap()
}

/// Let the spawned tasks and the actor mailboxes make progress
pub async fn settle() {
    actix::clock::sleep(Duration::from_millis(50)).await;
}
