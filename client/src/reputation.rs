use serde::Serialize;
use web3::{
    ethabi::Token,
    types::{H160, U256},
};

use crate::{
    binding::ContractBinding,
    error::Error,
    interface::{GET_AUDITOR_REPUTATION, GET_USER_REPUTATION},
};

/// Reputation scores of a user and an auditor. The two scores are independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReputationPair {
    /// Reputation of the user
    pub user: U256,
    /// Reputation of the auditor
    pub auditor: U256,
}

/// Query both reputation scores
pub async fn fetch(
    binding: &ContractBinding,
    user: H160,
    auditor: H160,
) -> Result<ReputationPair, Error> {
    let user_reputation = score(binding, GET_USER_REPUTATION, user).await?;
    let auditor_reputation = score(binding, GET_AUDITOR_REPUTATION, auditor).await?;
    log::debug!(
        "Reputation of user {:?}: {}, auditor {:?}: {}",
        user,
        user_reputation,
        auditor,
        auditor_reputation
    );

    Ok(ReputationPair {
        user: user_reputation,
        auditor: auditor_reputation,
    })
}

async fn score(binding: &ContractBinding, method: &str, account: H160) -> Result<U256, Error> {
    let output = binding.query(method, vec![Token::Address(account)]).await?;

    match output.as_slice() {
        [Token::Uint(score)] => Ok(*score),
        _ => Err(Error::Decode(web3::ethabi::Error::InvalidData)),
    }
}
