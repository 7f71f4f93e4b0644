use std::time::Duration;

use futures::{future::LocalBoxFuture, stream::LocalBoxStream, TryFutureExt};
use web3::{
    transports::Http,
    types::{
        Bytes, CallRequest, Filter, Log, TransactionReceipt, TransactionRequest, H160, H256, U256,
    },
    Transport, Web3,
};

use auditor_config::Config;

use crate::error::BindingError;

/// Capability supplied by a wallet to authorize and submit operations on behalf of a user.
///
/// The client never manages keys: everything that needs a signature goes through this trait.
/// All the futures and streams returned are driven by the single-threaded actix system.
pub trait SigningContext {
    /// Account on whose behalf operations are authorized. Fails when the wallet exposes no
    /// account or access to it was revoked.
    fn account(&self) -> Result<H160, BindingError>;

    /// Sign and submit a transaction, resolving to its hash once the transport accepted it
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> LocalBoxFuture<'static, Result<H256, web3::Error>>;

    /// Wait until the transaction has the given number of confirmations
    fn wait_for_confirmation(
        &self,
        transaction_hash: H256,
        confirmations: usize,
    ) -> LocalBoxFuture<'static, Result<TransactionReceipt, web3::Error>>;

    /// Execute a read-only call
    fn call(&self, req: CallRequest) -> LocalBoxFuture<'static, Result<Bytes, web3::Error>>;

    /// Stream of the logs matching `filter`, in the order the transport delivers them
    fn logs(&self, filter: Filter) -> LocalBoxStream<'static, Result<Log, web3::Error>>;
}

/// `SigningContext` backed by the accounts of an Ethereum JSON-RPC client
#[derive(Clone, Debug)]
pub struct Web3Signer<T: Transport = Http> {
    web3: Web3<T>,
    account: H160,
    txs_polling_rate: Duration,
    event_polling_rate: Duration,
}

impl Web3Signer<Http> {
    /// Connect to the client of the selected network, check that it runs the expected chain
    /// and pick the account used to sign transactions
    pub async fn connect(config: &Config) -> Result<Self, BindingError> {
        let network = config.selected_network()?;
        log::info!(
            "Connecting to Ethereum node running at {}",
            network.eth_jsonrpc_url
        );
        let web3_http = Http::new(&network.eth_jsonrpc_url).map_err(BindingError::Connect)?;
        let web3 = Web3::new(web3_http);

        if let Some(expected) = network.chain_id {
            let actual = web3.eth().chain_id().await.map_err(BindingError::Connect)?;
            if actual != U256::from(expected) {
                return Err(BindingError::WrongNetwork { expected, actual });
            }
        }

        let accounts = web3
            .eth()
            .accounts()
            .await
            .map_err(BindingError::Connect)?;
        log::debug!("Web3 accounts: {:?}", accounts);
        let account = select_account(config.eth_from, accounts)?;
        log::info!("Using account {:?}", account);

        Ok(Self {
            web3,
            account,
            txs_polling_rate: Duration::from_millis(config.eth_txs_polling_rate_ms),
            event_polling_rate: Duration::from_millis(config.eth_event_polling_rate_ms),
        })
    }
}

/// Pick the configured account if the wallet exposes it, or the first one otherwise
fn select_account(eth_from: Option<H160>, accounts: Vec<H160>) -> Result<H160, BindingError> {
    match eth_from {
        Some(account) if accounts.contains(&account) => Ok(account),
        Some(account) => Err(BindingError::UnknownAccount {
            account,
            available: accounts,
        }),
        None => accounts.first().copied().ok_or(BindingError::NoAccount),
    }
}

impl<T: Transport + 'static> SigningContext for Web3Signer<T> {
    fn account(&self) -> Result<H160, BindingError> {
        Ok(self.account)
    }

    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> LocalBoxFuture<'static, Result<H256, web3::Error>> {
        let eth = self.web3.eth();

        Box::pin(async move { eth.send_transaction(tx).await })
    }

    fn wait_for_confirmation(
        &self,
        transaction_hash: H256,
        confirmations: usize,
    ) -> LocalBoxFuture<'static, Result<TransactionReceipt, web3::Error>> {
        let eth = self.web3.eth();
        let eth_filter = self.web3.eth_filter();
        let poll_interval = self.txs_polling_rate;

        Box::pin(async move {
            let check = {
                let eth = eth.clone();
                move || {
                    let eth = eth.clone();
                    async move {
                        let receipt = eth.transaction_receipt(transaction_hash).await?;

                        Ok::<_, web3::Error>(receipt.and_then(|receipt| receipt.block_number))
                    }
                }
            };
            web3::confirm::wait_for_confirmations(
                eth.clone(),
                eth_filter,
                poll_interval,
                confirmations,
                check,
            )
            .await?;

            eth.transaction_receipt(transaction_hash)
                .await?
                .ok_or_else(|| {
                    web3::Error::InvalidResponse(format!(
                        "receipt of transaction {:?} not found",
                        transaction_hash
                    ))
                })
        })
    }

    fn call(&self, req: CallRequest) -> LocalBoxFuture<'static, Result<Bytes, web3::Error>> {
        let eth = self.web3.eth();

        Box::pin(async move { eth.call(req, None).await })
    }

    fn logs(&self, filter: Filter) -> LocalBoxStream<'static, Result<Log, web3::Error>> {
        let eth_filter = self.web3.eth_filter();
        let poll_interval = self.event_polling_rate;

        Box::pin(
            async move { eth_filter.create_logs_filter(filter).await }
                .map_ok(move |filter| {
                    log::debug!("Created logs filter");
                    filter.stream(poll_interval)
                })
                .try_flatten_stream(),
        )
    }
}
