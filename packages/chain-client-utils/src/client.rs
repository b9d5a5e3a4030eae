use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::transaction::TransactionResponse;

/// On-chain state of an account, as reported by `lookup_account`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountState {
    /// Balance in minimal units, decimal string.
    pub amount: String,
    #[serde(default)]
    pub locked: String,
    pub code_hash: String,
    pub storage_usage: u64,
}

/// Capability surface the orchestration layer needs from a chain node.
///
/// Implementations hold the signing keys for the accounts they submit
/// from; `signer_id` selects which key signs a state-changing call. All
/// operations suspend on network I/O and are awaited sequentially by
/// callers.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Look up an account's state. A missing account is `Ok(None)`;
    /// `Err` is reserved for transport and query failures, so existence
    /// checks cannot mistake an outage for an absent account.
    async fn lookup_account(&self, account_id: &str) -> Result<Option<AccountState>, ClientError>;

    /// Execute a read-only contract method and return its JSON result.
    async fn call_view(
        &self,
        contract_id: &str,
        method_name: &str,
        args: Value,
    ) -> Result<Value, ClientError>;

    /// Submit one signed transaction containing a single function call.
    async fn call_function(
        &self,
        signer_id: &str,
        receiver_id: &str,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> Result<TransactionResponse, ClientError>;

    /// Submit one signed transaction that deploys `code` and then calls
    /// `method_name`, in that order.
    async fn deploy_and_call(
        &self,
        signer_id: &str,
        receiver_id: &str,
        code: Vec<u8>,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> Result<TransactionResponse, ClientError>;

    /// Transfer `amount` minimal units from `signer_id` to `receiver_id`.
    async fn send_funds(
        &self,
        signer_id: &str,
        receiver_id: &str,
        amount: u128,
    ) -> Result<TransactionResponse, ClientError>;
}
