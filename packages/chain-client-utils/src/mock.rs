//! Scriptable in-memory chain used to exercise orchestration flows
//! without a node.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{AccountState, ChainClient};
use crate::error::ClientError;
use crate::transaction::TransactionResponse;

/// One state-changing submission accepted by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub signer_id: String,
    pub receiver_id: String,
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
    pub deployed_code: bool,
}

/// One fund transfer accepted by the mock.
#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    pub signer_id: String,
    pub receiver_id: String,
    pub amount: u128,
}

#[derive(Default)]
pub struct MockChainClient {
    accounts: Mutex<HashMap<String, AccountState>>,
    views: Mutex<HashMap<(String, String), Value>>,
    calls: Mutex<Vec<RecordedCall>>,
    transfers: Mutex<Vec<RecordedTransfer>>,
    failures_remaining: Mutex<u32>,
    submission_attempts: Mutex<u32>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing account.
    pub fn put_account(&self, account_id: &str) {
        self.accounts.lock().expect("mock lock poisoned").insert(
            account_id.to_string(),
            AccountState {
                amount: "1000000000000000000000000".to_string(),
                locked: "0".to_string(),
                code_hash: "11111111111111111111111111111111".to_string(),
                storage_usage: 182,
            },
        );
    }

    pub fn remove_account(&self, account_id: &str) {
        self.accounts
            .lock()
            .expect("mock lock poisoned")
            .remove(account_id);
    }

    /// Script the result of a view call on `(contract, method)`.
    pub fn script_view(&self, contract_id: &str, method_name: &str, result: Value) {
        self.views
            .lock()
            .expect("mock lock poisoned")
            .insert((contract_id.to_string(), method_name.to_string()), result);
    }

    /// Make the next `count` submissions fail with a transaction error.
    pub fn fail_next_submissions(&self, count: u32) {
        *self.failures_remaining.lock().expect("mock lock poisoned") = count;
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    pub fn recorded_transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.lock().expect("mock lock poisoned").clone()
    }

    /// Total state-changing submissions attempted, including failed ones.
    pub fn submission_attempts(&self) -> u32 {
        *self.submission_attempts.lock().expect("mock lock poisoned")
    }

    fn accept_submission(&self) -> Result<(), ClientError> {
        *self.submission_attempts.lock().expect("mock lock poisoned") += 1;
        let mut failures = self.failures_remaining.lock().expect("mock lock poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(ClientError::TransactionError(
                "injected submission failure".to_string(),
            ));
        }
        Ok(())
    }

    fn record(&self, call: RecordedCall) -> TransactionResponse {
        let mut calls = self.calls.lock().expect("mock lock poisoned");
        calls.push(call);
        TransactionResponse {
            hash: format!("mock-tx-{}", calls.len()),
            success: true,
            gas_burnt: 0,
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn lookup_account(&self, account_id: &str) -> Result<Option<AccountState>, ClientError> {
        Ok(self
            .accounts
            .lock()
            .expect("mock lock poisoned")
            .get(account_id)
            .cloned())
    }

    async fn call_view(
        &self,
        contract_id: &str,
        method_name: &str,
        _args: Value,
    ) -> Result<Value, ClientError> {
        self.views
            .lock()
            .expect("mock lock poisoned")
            .get(&(contract_id.to_string(), method_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                ClientError::QueryError(format!("no scripted view for {contract_id}.{method_name}"))
            })
    }

    async fn call_function(
        &self,
        signer_id: &str,
        receiver_id: &str,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> Result<TransactionResponse, ClientError> {
        self.accept_submission()?;
        Ok(self.record(RecordedCall {
            signer_id: signer_id.to_string(),
            receiver_id: receiver_id.to_string(),
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
            deployed_code: false,
        }))
    }

    async fn deploy_and_call(
        &self,
        signer_id: &str,
        receiver_id: &str,
        _code: Vec<u8>,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> Result<TransactionResponse, ClientError> {
        self.accept_submission()?;
        Ok(self.record(RecordedCall {
            signer_id: signer_id.to_string(),
            receiver_id: receiver_id.to_string(),
            method_name: method_name.to_string(),
            args,
            gas,
            deposit,
            deployed_code: true,
        }))
    }

    async fn send_funds(
        &self,
        signer_id: &str,
        receiver_id: &str,
        amount: u128,
    ) -> Result<TransactionResponse, ClientError> {
        self.accept_submission()?;
        self.transfers
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedTransfer {
                signer_id: signer_id.to_string(),
                receiver_id: receiver_id.to_string(),
                amount,
            });
        Ok(TransactionResponse {
            hash: "mock-transfer".to_string(),
            success: true,
            gas_burnt: 0,
        })
    }
}
