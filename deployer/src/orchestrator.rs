//! Account activation orchestration: a short sequential state machine
//! that deploys the FastAuth contract, activates an externally-derived
//! account, registers a session key, and relays a signed payload.
//!
//! One logical thread of control per run: every chain interaction is
//! awaited in order, and any submission failure (after retries) moves
//! the run to `Aborted`. Chain state is append-only, so no rollback is
//! attempted; prior steps' effects persist.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use thiserror::Error;

use fastauth_chain_client_utils::client::ChainClient;
use fastauth_chain_client_utils::error::ClientError;
use fastauth_chain_client_utils::keys::KeyPair;
use fastauth_chain_client_utils::keystore::{KeyStore, KeyStoreError};
use fastauth_chain_client_utils::submitter::{CallRequest, SubmitError, TransactionSubmitter};
use fastauth_chain_client_utils::tokens::{format_native_amount, parse_native_amount};

use crate::config::DeployerConfig;
use crate::derivation::{
    derive_eth_address_from_mpc_key, derive_implicit_account_id, DerivationError,
};
use crate::types::{ActionToPerform, FastAuthInitArgs, KeyUsage, NearPayload};

/// Progress of one activation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    ContractDeployed,
    KeyDerived,
    Activated,
    SessionKeyAdded,
    Relayed,
    Done,
    Aborted,
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationState::Idle => "idle",
            ActivationState::ContractDeployed => "contract deployed",
            ActivationState::KeyDerived => "key derived",
            ActivationState::Activated => "activated",
            ActivationState::SessionKeyAdded => "session key added",
            ActivationState::Relayed => "relayed",
            ActivationState::Done => "done",
            ActivationState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("account {0} already exists")]
    AccountAlreadyExists(String),

    #[error("account {0} does not exist after activation")]
    ActivationDidNotTakeEffect(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unexpected view result: {0}")]
    View(String),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{step} failed: {source}")]
    StepFailed {
        step: &'static str,
        source: Box<OrchestratorError>,
    },
}

/// Drives one activation run against a chain client and a key store.
///
/// Not re-entrant; concurrent runs should each use their own signer
/// account and session key pair to avoid key-slot and nonce races.
pub struct ActivationOrchestrator<C: ChainClient, K: KeyStore> {
    client: Arc<C>,
    submitter: TransactionSubmitter<C>,
    keystore: K,
    config: DeployerConfig,
    state: ActivationState,
    contract_id: Option<String>,
    mpc_key: Option<String>,
    derived_account_id: Option<String>,
    session_key: Option<KeyPair>,
}

impl<C: ChainClient, K: KeyStore> ActivationOrchestrator<C, K> {
    pub fn new(client: Arc<C>, keystore: K, config: DeployerConfig) -> Self {
        let submitter = TransactionSubmitter::new(
            client.clone(),
            config.retry.to_retry_config(),
            config.network.explorer_url.clone(),
        );
        Self {
            client,
            submitter,
            keystore,
            contract_id: config.contracts.fastauth_contract_id.clone(),
            config,
            state: ActivationState::Idle,
            mpc_key: None,
            derived_account_id: None,
            session_key: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn contract_id(&self) -> Option<&str> {
        self.contract_id.as_deref()
    }

    pub fn derived_account_id(&self) -> Option<&str> {
        self.derived_account_id.as_deref()
    }

    pub fn session_public_key(&self) -> Option<String> {
        self.session_key.as_ref().map(KeyPair::public_key)
    }

    /// Top-level domain accounts live under, which doubles as the
    /// registrar contract handling `create_account`.
    fn registrar(&self) -> &'static str {
        if self.config.network.network_id == "testnet" {
            "testnet"
        } else {
            "near"
        }
    }

    /// Mint a fresh contract account id under the network's registrar.
    pub fn mint_contract_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("{}-fastauth.{}", millis, self.registrar())
    }

    /// Run the configured flow end to end. Returns the relayed
    /// transaction hash when a relay action was performed.
    pub async fn run(
        &mut self,
        wasm: Option<Vec<u8>>,
        action: Option<ActionToPerform>,
    ) -> Result<Option<String>, OrchestratorError> {
        if self.config.flow.deploy_contract {
            let wasm = wasm.ok_or_else(|| OrchestratorError::InvalidState(
                "contract code is required when flow.deploy_contract is on".to_string(),
            ))?;
            self.deploy_contract(wasm).await?;
        }

        if !self.config.flow.perform_actions {
            self.state = ActivationState::Done;
            return Ok(None);
        }

        self.derive_user_account().await?;

        if self.config.flow.activate {
            self.activate().await?;
        }

        if self.config.flow.add_session_key {
            self.add_session_key(None).await?;
        } else if self.session_key.is_none() {
            // reuse a previously persisted session key
            let derived = self.require_derived_account()?;
            self.session_key = self
                .keystore
                .get_key(&self.config.network.network_id, &derived)?;
        }

        let hash = match action {
            Some(action) => Some(self.relay_call(&action).await?),
            None => None,
        };
        self.state = ActivationState::Done;
        Ok(hash)
    }

    /// `Idle -> ContractDeployed`: create a fresh funded account and
    /// deploy the contract with its constructor call in one transaction.
    pub async fn deploy_contract(&mut self, wasm: Vec<u8>) -> Result<String, OrchestratorError> {
        match self.step_deploy_contract(wasm).await {
            Ok(contract_id) => Ok(contract_id),
            Err(error) => self.fail("deploy_contract", error),
        }
    }

    /// `ContractDeployed -> KeyDerived`: ask the MPC contract for the
    /// derived public key scoped to the deployed contract and derive
    /// the externally-controlled account id from it.
    pub async fn derive_user_account(&mut self) -> Result<String, OrchestratorError> {
        match self.step_derive_user_account().await {
            Ok(account_id) => Ok(account_id),
            Err(error) => self.fail("derived_public_key", error),
        }
    }

    /// `KeyDerived -> Activated`: activate the derived account through
    /// the oracle. Fails fast, without submitting, when the account
    /// already exists.
    pub async fn activate(&mut self) -> Result<(), OrchestratorError> {
        match self.step_activate().await {
            Ok(()) => Ok(()),
            Err(error) => self.fail("activate_account", error),
        }
    }

    /// `Activated -> SessionKeyAdded`: register a session key for the
    /// derivation path. Fails fast when the derived account still does
    /// not exist.
    pub async fn add_session_key(
        &mut self,
        session_key: Option<KeyPair>,
    ) -> Result<(), OrchestratorError> {
        match self.step_add_session_key(session_key).await {
            Ok(()) => Ok(()),
            Err(error) => self.fail("add_session_key", error),
        }
    }

    /// `SessionKeyAdded -> Relayed`: sign a payload with the session key
    /// and relay it through the contract on behalf of the derived
    /// account.
    pub async fn relay_call(
        &mut self,
        action: &ActionToPerform,
    ) -> Result<String, OrchestratorError> {
        match self.step_relay_call(action).await {
            Ok(hash) => Ok(hash),
            Err(error) => self.fail("call_near_contract", error),
        }
    }

    async fn step_deploy_contract(&mut self, wasm: Vec<u8>) -> Result<String, OrchestratorError> {
        let contract_id = self.mint_contract_id();
        if self.client.lookup_account(&contract_id).await?.is_some() {
            return Err(OrchestratorError::AccountAlreadyExists(contract_id));
        }

        log::info!("creating contract account {contract_id}");
        let contract_key = KeyPair::generate();
        self.keystore
            .set_key(&self.config.network.network_id, &contract_id, &contract_key)?;

        self.submitter
            .submit(&CallRequest {
                signer_id: self.config.accounts.signer_account_id.clone(),
                receiver_id: self.registrar().to_string(),
                method_name: "create_account".to_string(),
                args: json!({
                    "new_account_id": contract_id,
                    "new_public_key": contract_key.public_key(),
                }),
                gas: self.config.limits.gas,
                deposit: self.config.contracts.initial_balance.clone(),
                code: None,
            })
            .await?;

        log::info!("deploying contract to {contract_id}");
        let init_args = FastAuthInitArgs {
            mpc_contract: self.config.contracts.mpc_contract_id.clone(),
            oracle_account_id: self.config.accounts.oracle_account_id.clone(),
            contract_key: contract_key.public_key(),
        };
        self.submitter
            .submit(&CallRequest {
                signer_id: contract_id.clone(),
                receiver_id: contract_id.clone(),
                method_name: "new".to_string(),
                args: serde_json::to_value(&init_args).map_err(SubmitError::from)?,
                gas: self.config.limits.gas,
                deposit: "0".to_string(),
                code: Some(wasm),
            })
            .await?;

        self.contract_id = Some(contract_id.clone());
        self.state = ActivationState::ContractDeployed;
        Ok(contract_id)
    }

    async fn step_derive_user_account(&mut self) -> Result<String, OrchestratorError> {
        let contract_id = self.require_contract_id()?;
        let response = self
            .client
            .call_view(
                &self.config.contracts.mpc_contract_id,
                "derived_public_key",
                json!({
                    "path": self.config.contracts.derivation_path,
                    "predecessor": contract_id,
                }),
            )
            .await?;
        let mpc_key = response
            .as_str()
            .ok_or_else(|| {
                OrchestratorError::View(format!("derived_public_key returned {response}"))
            })?
            .to_string();

        let account_id = derive_eth_address_from_mpc_key(&mpc_key)?;
        log::info!("derived account {account_id} from mpc key {mpc_key}");

        self.mpc_key = Some(mpc_key);
        self.derived_account_id = Some(account_id.clone());
        self.state = ActivationState::KeyDerived;
        Ok(account_id)
    }

    async fn step_activate(&mut self) -> Result<(), OrchestratorError> {
        let contract_id = self.require_contract_id()?;
        let account_id = self.require_derived_account()?;
        let mpc_key = self.require_mpc_key()?;

        if self.client.lookup_account(&account_id).await?.is_some() {
            return Err(OrchestratorError::AccountAlreadyExists(account_id));
        }

        self.submitter
            .submit(&CallRequest {
                signer_id: self.config.accounts.oracle_account_id.clone(),
                receiver_id: contract_id,
                method_name: "activate_account".to_string(),
                args: json!({
                    "mpc_key": mpc_key,
                    "eth_address": account_id,
                    "path": self.config.contracts.derivation_path,
                }),
                gas: self.config.limits.gas,
                deposit: self.config.limits.activation_deposit.clone(),
                code: None,
            })
            .await?;

        // let the activation transaction finalize before dependent reads
        tokio::time::sleep(self.config.limits.finalization_delay()).await;

        self.state = ActivationState::Activated;
        Ok(())
    }

    async fn step_add_session_key(
        &mut self,
        session_key: Option<KeyPair>,
    ) -> Result<(), OrchestratorError> {
        let contract_id = self.require_contract_id()?;
        let account_id = self.require_derived_account()?;

        if self.client.lookup_account(&account_id).await?.is_none() {
            return Err(OrchestratorError::ActivationDidNotTakeEffect(account_id));
        }

        let session_key = session_key.unwrap_or_else(KeyPair::generate);
        self.keystore
            .set_key(&self.config.network.network_id, &account_id, &session_key)?;

        self.submitter
            .submit(&CallRequest {
                signer_id: self.config.accounts.oracle_account_id.clone(),
                receiver_id: contract_id,
                method_name: "add_session_key".to_string(),
                args: json!({
                    "path": self.config.contracts.derivation_path,
                    "public_key": session_key.public_key(),
                }),
                gas: self.config.limits.gas,
                deposit: self.config.limits.activation_deposit.clone(),
                code: None,
            })
            .await?;

        self.session_key = Some(session_key);
        self.state = ActivationState::SessionKeyAdded;
        Ok(())
    }

    async fn step_relay_call(
        &mut self,
        action: &ActionToPerform,
    ) -> Result<String, OrchestratorError> {
        let contract_id = self.require_contract_id()?;
        let account_id = self.require_derived_account()?;
        let session_key = self.session_key.clone().ok_or_else(|| {
            OrchestratorError::InvalidState("no session key available for signing".to_string())
        })?;

        let args_bytes = serde_json::to_vec(&action.args).map_err(SubmitError::from)?;
        let deposit = parse_native_amount(&action.attached_deposit).map_err(SubmitError::from)?;

        // the nonce must reflect the account's current value right
        // before signing
        let nonce = self
            .client
            .call_view(&account_id, "get_nonce", json!({}))
            .await?;
        let nonce = match nonce {
            Value::String(value) => value,
            Value::Number(value) => value.to_string(),
            other => return Err(OrchestratorError::View(format!("get_nonce returned {other}"))),
        };

        let payload = NearPayload {
            contract_id: action.target_contract_id.clone(),
            method_name: action.method_name.clone(),
            args: args_bytes,
            gas: action.gas.clone(),
            deposit: deposit.to_string(),
            nonce,
        };

        let payload_bytes = serde_json::to_vec(&payload).map_err(SubmitError::from)?;
        let signature = BASE64.encode(session_key.sign(&payload_bytes));

        let hash = self
            .submitter
            .submit(&CallRequest {
                signer_id: self.config.accounts.oracle_account_id.clone(),
                receiver_id: contract_id,
                method_name: "call_near_contract".to_string(),
                args: json!({
                    "signature": signature,
                    "payload": payload,
                    "session_key": session_key.public_key(),
                }),
                gas: self.config.limits.gas,
                deposit: self.config.limits.relay_deposit.clone(),
                code: None,
            })
            .await?;

        self.state = ActivationState::Relayed;
        Ok(hash)
    }

    /// View helper over the contract's per-key usage bookkeeping.
    pub async fn query_key_usage(
        &self,
        public_key: &str,
    ) -> Result<Option<KeyUsage>, OrchestratorError> {
        let contract_id = self.require_contract_id()?;
        let response = self
            .client
            .call_view(
                &contract_id,
                "get_key_usage",
                json!({ "public_key": public_key }),
            )
            .await?;
        if response.is_null() {
            return Ok(None);
        }
        serde_json::from_value(response)
            .map(Some)
            .map_err(|e| OrchestratorError::View(e.to_string()))
    }

    /// Derive the chain-native implicit id for the MPC key, seed it with
    /// funds, and report whether it exists after the finalization delay.
    pub async fn fund_implicit_account(
        &self,
        amount: &str,
    ) -> Result<(String, bool), OrchestratorError> {
        let mpc_key = self.require_mpc_key()?;
        let implicit_id = derive_implicit_account_id(&mpc_key)?;

        let yocto = parse_native_amount(amount).map_err(SubmitError::from)?;
        log::info!(
            "sending {} to {implicit_id}",
            format_native_amount(yocto)
        );
        self.client
            .send_funds(
                &self.config.accounts.signer_account_id,
                &implicit_id,
                yocto,
            )
            .await?;

        tokio::time::sleep(self.config.limits.finalization_delay()).await;

        let exists = self.client.lookup_account(&implicit_id).await?.is_some();
        Ok((implicit_id, exists))
    }

    fn require_contract_id(&self) -> Result<String, OrchestratorError> {
        self.contract_id.clone().ok_or_else(|| {
            OrchestratorError::InvalidState(
                "no contract id: deploy a contract or configure contracts.fastauth_contract_id"
                    .to_string(),
            )
        })
    }

    fn require_derived_account(&self) -> Result<String, OrchestratorError> {
        self.derived_account_id.clone().ok_or_else(|| {
            OrchestratorError::InvalidState("no derived account id yet".to_string())
        })
    }

    fn require_mpc_key(&self) -> Result<String, OrchestratorError> {
        self.mpc_key
            .clone()
            .ok_or_else(|| OrchestratorError::InvalidState("no derived mpc key yet".to_string()))
    }

    fn fail<T>(
        &mut self,
        step: &'static str,
        source: OrchestratorError,
    ) -> Result<T, OrchestratorError> {
        self.state = ActivationState::Aborted;
        let error = OrchestratorError::StepFailed {
            step,
            source: Box::new(source),
        };
        log::error!("{error}");
        Err(error)
    }
}
