use std::fmt;

use web3::{
    ethabi::Token,
    types::{TransactionReceipt, H160, H256, U64},
};

use crate::{
    binding::ContractBinding,
    error::{Error, Field, ValidationError},
    ether::Ether,
    interface::REGISTER_TRANSACTION,
};

/// Length of an address in hex digits
const ADDRESS_HEX_LEN: usize = 40;

/// Transaction registration, as entered by the user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Recipient address, in hex
    pub recipient: String,
    /// Amount, in ether
    pub amount: String,
    /// Free-text description
    pub description: String,
    /// Category label
    pub category: String,
}

/// Submission request that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Recipient address
    pub recipient: H160,
    /// Amount
    pub amount: Ether,
    /// Description, trimmed
    pub description: String,
    /// Category, trimmed
    pub category: String,
}

impl SubmissionRequest {
    /// Check every field and convert the amount to wei
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let recipient = parse_recipient(&self.recipient)?;
        let amount: Ether = self.amount.parse()?;
        if amount.wei().is_zero() {
            return Err(ValidationError::NotPositive);
        }
        let description = required(&self.description, Field::Description)?;
        let category = required(&self.category, Field::Category)?;

        Ok(ValidatedRequest {
            recipient,
            amount,
            description,
            category,
        })
    }
}

impl ValidatedRequest {
    /// Arguments of `registerTransaction`
    pub fn into_tokens(self) -> Vec<Token> {
        vec![
            Token::Address(self.recipient),
            Token::Uint(self.amount.wei()),
            Token::String(self.description),
            Token::String(self.category),
        ]
    }
}

fn required(value: &str, field: Field) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(value.to_string())
    }
}

/// Parse a hex identifier of at most 20 bytes, with or without `0x` prefix.
///
/// Shorter identifiers are left-padded with zeros, so `0xabc` is the address
/// `0x0000000000000000000000000000000000000abc`.
pub fn parse_recipient(s: &str) -> Result<H160, ValidationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValidationError::Empty(Field::Recipient));
    }

    let invalid = || ValidationError::InvalidRecipient(s.to_string());
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() || digits.len() > ADDRESS_HEX_LEN {
        return Err(invalid());
    }

    let padded = format!("{:0>width$}", digits, width = ADDRESS_HEX_LEN);
    let bytes = hex::decode(padded).map_err(|_| invalid())?;

    Ok(H160::from_slice(&bytes))
}

/// Category of a failed submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad local input, nothing was sent
    Validation,
    /// Missing or unusable signing context
    Binding,
    /// The transport or the wallet refused the transaction
    Submission,
    /// The transaction was not finalized successfully
    Confirmation,
}

impl Error {
    /// Category of this error, as reported by a failed submission
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Validation(_) => FailureKind::Validation,
            Error::Binding(_) => FailureKind::Binding,
            Error::Submission(_) | Error::Query(_) | Error::Decode(_) => FailureKind::Submission,
            Error::Confirmation(_) => FailureKind::Confirmation,
        }
    }
}

/// States of a submission attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    /// No attempt in progress
    Idle,
    /// Checking the request
    Validating,
    /// Waiting for the transport to accept the transaction
    Submitting,
    /// Accepted, waiting for finality
    AwaitingConfirmation {
        /// Hash of the accepted transaction
        transaction_hash: H256,
    },
    /// Finalized successfully
    Succeeded {
        /// Hash of the finalized transaction
        transaction_hash: H256,
        /// Block that includes it
        block_number: Option<U64>,
    },
    /// The attempt ended with an error
    Failed {
        /// Category of the error
        kind: FailureKind,
        /// Human readable cause
        reason: String,
    },
}

impl SubmissionState {
    /// Whether this state ends an attempt
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            SubmissionState::Succeeded { .. } | SubmissionState::Failed { .. }
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "idle"),
            SubmissionState::Validating => write!(f, "validating"),
            SubmissionState::Submitting => write!(f, "submitting"),
            SubmissionState::AwaitingConfirmation { transaction_hash } => {
                write!(f, "awaiting confirmation of {:?}", transaction_hash)
            }
            SubmissionState::Succeeded {
                transaction_hash,
                block_number: Some(block_number),
            } => write!(f, "{:?} confirmed in block {}", transaction_hash, block_number),
            SubmissionState::Succeeded {
                transaction_hash, ..
            } => write!(f, "{:?} confirmed", transaction_hash),
            SubmissionState::Failed { kind, reason } => {
                write!(f, "failed ({:?}): {}", kind, reason)
            }
        }
    }
}

/// State machine followed by every transaction registration.
///
/// Attempts are never retried automatically: a failed attempt stays in `Failed` until the next
/// call to `submit` or `reset`.
#[derive(Clone, Debug)]
pub struct SubmissionFlow {
    state: SubmissionState,
    history: Vec<SubmissionState>,
}

impl Default for SubmissionFlow {
    fn default() -> Self {
        Self {
            state: SubmissionState::Idle,
            history: vec![],
        }
    }
}

impl SubmissionFlow {
    /// New flow, in `Idle` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// States visited by the current (or last) attempt, in order
    pub fn history(&self) -> &[SubmissionState] {
        &self.history
    }

    /// Go back to `Idle` and forget the last attempt
    pub fn reset(&mut self) {
        self.state = SubmissionState::Idle;
        self.history.clear();
    }

    fn transition(&mut self, state: SubmissionState) {
        log::debug!("Submission: {} -> {}", self.state, state);
        self.history.push(state.clone());
        self.state = state;
    }

    fn fail(&mut self, err: Error) -> Error {
        log::warn!("Transaction registration failed: {}", err);
        self.transition(SubmissionState::Failed {
            kind: err.kind(),
            reason: err.to_string(),
        });

        err
    }

    /// Validate `request`, register it through `binding` and wait for it to be confirmed
    pub async fn submit(
        &mut self,
        binding: &ContractBinding,
        request: &SubmissionRequest,
    ) -> Result<TransactionReceipt, Error> {
        self.reset();
        self.history.push(SubmissionState::Idle);

        self.transition(SubmissionState::Validating);
        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(e) => return Err(self.fail(e.into())),
        };
        log::info!(
            "Registering transaction of {} ether to {:?}",
            validated.amount,
            validated.recipient
        );

        self.transition(SubmissionState::Submitting);
        let pending = match binding
            .call(REGISTER_TRANSACTION, validated.into_tokens())
            .await
        {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(SubmissionState::AwaitingConfirmation {
            transaction_hash: pending.transaction_hash(),
        });
        match pending.confirm().await {
            Ok(receipt) => {
                log::info!(
                    "Transaction {:?} confirmed in block {:?}",
                    receipt.transaction_hash,
                    receipt.block_number
                );
                self.transition(SubmissionState::Succeeded {
                    transaction_hash: receipt.transaction_hash,
                    block_number: receipt.block_number,
                });

                Ok(receipt)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use web3::types::U256;

    use super::*;
    use crate::{
        error::{BindingError, ConfirmationError, SubmissionError},
        mock::{self, ConfirmBehaviour, MockSigner, SendBehaviour},
        utils::test_actix_system,
    };

    fn request(
        recipient: &str,
        amount: &str,
        description: &str,
        category: &str,
    ) -> SubmissionRequest {
        SubmissionRequest {
            recipient: recipient.into(),
            amount: amount.into(),
            description: description.into(),
            category: category.into(),
        }
    }

    fn coffee() -> SubmissionRequest {
        request("0xABC", "1.5", "coffee", "retail")
    }

    #[test]
    fn recipient_is_left_padded() {
        assert_eq!(parse_recipient("0xABC"), Ok(H160::from_low_u64_be(0xabc)));
        assert_eq!(parse_recipient(" abc "), Ok(H160::from_low_u64_be(0xabc)));
        assert_eq!(
            parse_recipient("0x00000000000000000000000000000000000a11ce"),
            Ok(H160::from_low_u64_be(0xa11ce))
        );
    }

    #[test]
    fn invalid_recipients() {
        assert_eq!(
            parse_recipient("  "),
            Err(ValidationError::Empty(Field::Recipient))
        );
        let too_long = format!("0x{}", "1".repeat(41));
        for bad in ["0x", "0xZZ", "hello", too_long.as_str()] {
            assert_eq!(
                parse_recipient(bad),
                Err(ValidationError::InvalidRecipient(bad.to_string()))
            );
        }
    }

    #[test]
    fn validate_request() {
        let validated = coffee().validate().unwrap();

        assert_eq!(validated.recipient, H160::from_low_u64_be(0xabc));
        assert_eq!(
            validated.amount.wei(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(
            validated.into_tokens(),
            vec![
                Token::Address(H160::from_low_u64_be(0xabc)),
                Token::Uint(U256::from(1_500_000_000_000_000_000u64)),
                Token::String("coffee".into()),
                Token::String("retail".into()),
            ]
        );
    }

    #[test]
    fn validation_names_the_field() {
        let cases = vec![
            (request("", "1", "d", "c"), Field::Recipient),
            (request("0x1", "", "d", "c"), Field::Amount),
            (request("0x1", "-1", "d", "c"), Field::Amount),
            (request("0x1", "0", "d", "c"), Field::Amount),
            (request("0x1", "ten", "d", "c"), Field::Amount),
            (request("0x1", "1", "   ", "c"), Field::Description),
            (request("0x1", "1", "d", ""), Field::Category),
        ];

        for (req, field) in cases {
            let err = req.validate().unwrap_err();
            assert_eq!(err.field(), Some(field), "{:?}", req);
        }
    }

    #[test]
    fn successful_submission() {
        test_actix_system(|| async {
            let signer = Rc::new(MockSigner::default());
            let binding = mock::binding(Some(signer.clone()));
            let mut flow = SubmissionFlow::new();

            let receipt = flow.submit(&binding, &coffee()).await.unwrap();

            let transaction_hash = H256::from_low_u64_be(1);
            assert_eq!(receipt.transaction_hash, transaction_hash);
            assert_eq!(
                flow.history(),
                &[
                    SubmissionState::Idle,
                    SubmissionState::Validating,
                    SubmissionState::Submitting,
                    SubmissionState::AwaitingConfirmation { transaction_hash },
                    SubmissionState::Succeeded {
                        transaction_hash,
                        block_number: Some(U64::from(0x10)),
                    },
                ][..]
            );

            let sent = signer.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].from, mock::account());
            assert_eq!(sent[0].to, Some(mock::contract_address()));
            let expected_data = binding
                .encode_call(REGISTER_TRANSACTION, &coffee().validate().unwrap().into_tokens())
                .unwrap();
            assert_eq!(sent[0].data.as_ref().unwrap().0, expected_data);
        });
    }

    #[test]
    fn invalid_amount_never_reaches_the_network() {
        test_actix_system(|| async {
            let signer = Rc::new(MockSigner::default());
            let binding = mock::binding(Some(signer.clone()));
            let mut flow = SubmissionFlow::new();
            let overflowing = format!("1{}", "0".repeat(78));

            let cases = [
                ("-1", ValidationError::NotPositive),
                ("0", ValidationError::NotPositive),
                ("0.000", ValidationError::NotPositive),
                ("", ValidationError::Empty(Field::Amount)),
                ("one", ValidationError::NotANumber("one".to_string())),
                ("1.5.0", ValidationError::NotANumber("1.5.0".to_string())),
                (
                    "0.0000000000000000001",
                    ValidationError::TooPrecise("0.0000000000000000001".to_string()),
                ),
                (
                    overflowing.as_str(),
                    ValidationError::Overflow(overflowing.clone()),
                ),
            ];

            for (amount, expected) in cases {
                let err = flow
                    .submit(&binding, &request("0xABC", amount, "coffee", "retail"))
                    .await
                    .unwrap_err();

                match err {
                    Error::Validation(err) => assert_eq!(err, expected, "amount {:?}", amount),
                    err => panic!("amount {:?}: unexpected error {}", amount, err),
                }
                assert!(matches!(
                    flow.state(),
                    SubmissionState::Failed {
                        kind: FailureKind::Validation,
                        ..
                    }
                ));
                assert!(signer.sent().is_empty(), "amount {:?} was sent", amount);
                assert!(signer.calls().is_empty());
            }
        });
    }

    #[test]
    fn rejected_submission_is_not_retried() {
        test_actix_system(|| async {
            let signer = Rc::new(MockSigner::default());
            signer.set_send(SendBehaviour::Reject);
            let binding = mock::binding(Some(signer.clone()));
            let mut flow = SubmissionFlow::new();

            let err = flow.submit(&binding, &coffee()).await.unwrap_err();

            assert!(matches!(
                err,
                Error::Submission(SubmissionError::Rejected(_))
            ));
            assert_eq!(
                flow.history().last().map(|state| state.is_final()),
                Some(true)
            );
            assert!(matches!(
                flow.state(),
                SubmissionState::Failed {
                    kind: FailureKind::Submission,
                    ..
                }
            ));
            assert_eq!(signer.sent().len(), 1);
        });
    }

    #[test]
    fn declined_in_wallet() {
        test_actix_system(|| async {
            let signer = Rc::new(MockSigner::default());
            signer.set_send(SendBehaviour::Decline);
            let binding = mock::binding(Some(signer.clone()));

            let err = SubmissionFlow::new()
                .submit(&binding, &coffee())
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                Error::Submission(SubmissionError::Declined(_))
            ));
        });
    }

    #[test]
    fn missing_or_revoked_signer() {
        test_actix_system(|| async {
            let mut flow = SubmissionFlow::new();

            let err = flow
                .submit(&mock::binding(None), &coffee())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Binding(BindingError::NoSigningContext)
            ));

            let signer = Rc::new(MockSigner::default());
            signer.revoke();
            let err = flow
                .submit(&mock::binding(Some(signer.clone())), &coffee())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Binding(BindingError::Revoked(_))));
            assert!(matches!(
                flow.state(),
                SubmissionState::Failed {
                    kind: FailureKind::Binding,
                    ..
                }
            ));
            assert!(signer.sent().is_empty());
        });
    }

    #[test]
    fn reverted_and_lost_transactions() {
        test_actix_system(|| async {
            let signer = Rc::new(MockSigner::default());
            let binding = mock::binding(Some(signer.clone()));
            let mut flow = SubmissionFlow::new();

            signer.set_confirm(ConfirmBehaviour::Revert);
            let err = flow.submit(&binding, &coffee()).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Confirmation(ConfirmationError::Reverted(_))
            ));
            assert!(flow
                .history()
                .iter()
                .any(|state| matches!(state, SubmissionState::AwaitingConfirmation { .. })));

            signer.set_confirm(ConfirmBehaviour::Lost);
            let err = flow.submit(&binding, &coffee()).await.unwrap_err();
            assert!(matches!(
                err,
                Error::Confirmation(ConfirmationError::NotConfirmed { .. })
            ));
            assert_eq!(flow.history()[0], SubmissionState::Idle);

            flow.reset();
            assert_eq!(flow.state(), &SubmissionState::Idle);
            assert!(flow.history().is_empty());
        });
    }
}
