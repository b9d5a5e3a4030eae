use std::sync::Arc;

use serde_json::Value;

use crate::client::ChainClient;
use crate::error::ClientError;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::tokens::{parse_native_amount, AmountError};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("failed to serialize call arguments: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Deposit(#[from] AmountError),
    /// Submission kept failing after retries. The original cause is
    /// logged, not attached.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

/// One signed function call, optionally preceded by a contract-code
/// deployment in the same transaction. `deposit` is in human units.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub signer_id: String,
    pub receiver_id: String,
    pub method_name: String,
    pub args: Value,
    pub gas: u64,
    pub deposit: String,
    pub code: Option<Vec<u8>>,
}

/// Builds and submits signed function calls through a chain client,
/// retrying transient failures and logging explorer references.
pub struct TransactionSubmitter<C> {
    client: Arc<C>,
    retry: RetryConfig,
    explorer_url: String,
}

impl<C: ChainClient> TransactionSubmitter<C> {
    pub fn new(client: Arc<C>, retry: RetryConfig, explorer_url: impl Into<String>) -> Self {
        Self {
            client,
            retry,
            explorer_url: explorer_url.into(),
        }
    }

    /// Submit `request` and return the transaction hash.
    ///
    /// Serialization and deposit-conversion failures are surfaced
    /// directly; network and execution failures are retried and collapse
    /// into [`SubmitError::TransactionFailed`] once retries are
    /// exhausted.
    pub async fn submit(&self, request: &CallRequest) -> Result<String, SubmitError> {
        let args = serde_json::to_vec(&request.args)?;
        let deposit = parse_native_amount(&request.deposit)?;

        let outcome = retry_with_backoff(&self.retry, || {
            let args = args.clone();
            let code = request.code.clone();
            async move {
                let response = match code {
                    Some(code) => {
                        self.client
                            .deploy_and_call(
                                &request.signer_id,
                                &request.receiver_id,
                                code,
                                &request.method_name,
                                args,
                                request.gas,
                                deposit,
                            )
                            .await?
                    }
                    None => {
                        self.client
                            .call_function(
                                &request.signer_id,
                                &request.receiver_id,
                                &request.method_name,
                                args,
                                request.gas,
                                deposit,
                            )
                            .await?
                    }
                };
                if !response.success {
                    return Err(ClientError::TransactionError(format!(
                        "{} execution failed in {}",
                        request.method_name, response.hash
                    )));
                }
                Ok(response)
            }
        })
        .await;

        match outcome {
            Ok(response) => {
                log::info!(
                    "{}: {}/txns/{}#execution",
                    request.method_name,
                    self.explorer_url,
                    response.hash
                );
                Ok(response.hash)
            }
            Err(error) => {
                log::error!("{}: {}", request.method_name, error);
                log::error!(
                    "{} failed: {}/address/{}",
                    request.method_name,
                    self.explorer_url,
                    request.receiver_id
                );
                Err(SubmitError::TransactionFailed(request.method_name.clone()))
            }
        }
    }
}
