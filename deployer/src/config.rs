use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fastauth_chain_client_utils::retry::RetryConfig;
use fastauth_chain_client_utils::tokens::parse_native_amount;

/// Errors that can occur when loading or validating the deployer
/// configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid field {0}: {1}")]
    InvalidField(String, String),
}

/// Configuration for one deployer run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeployerConfig {
    pub network: NetworkConfig,
    pub accounts: AccountsConfig,
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Network configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Network identifier (e.g. "testnet").
    pub network_id: String,

    /// JSON-RPC URL for the chain.
    pub rpc_url: String,

    /// Block explorer base URL used in logged references.
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

/// Signer and oracle account configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountsConfig {
    /// Funding account that creates the contract account.
    pub signer_account_id: String,

    /// Oracle account trusted by the contract for activation calls.
    pub oracle_account_id: String,

    /// Directory holding unencrypted account credentials.
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: String,
}

/// Contract identities and deployment inputs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractsConfig {
    /// MPC signer contract issuing derived public keys.
    pub mpc_contract_id: String,

    /// Existing FastAuth contract, reused when `flow.deploy_contract`
    /// is off.
    pub fastauth_contract_id: Option<String>,

    /// Compiled contract code to deploy.
    #[serde(default = "default_wasm_path")]
    pub wasm_path: String,

    /// Initial balance for the fresh contract account, human units.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: String,

    /// Derivation path registered with the MPC contract.
    pub derivation_path: String,
}

/// Which stages of the flow to run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlowConfig {
    #[serde(default = "default_true")]
    pub deploy_contract: bool,

    #[serde(default = "default_true")]
    pub perform_actions: bool,

    #[serde(default = "default_true")]
    pub activate: bool,

    #[serde(default = "default_true")]
    pub add_session_key: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            deploy_contract: true,
            perform_actions: true,
            activate: true,
            add_session_key: true,
        }
    }
}

/// Gas and deposit limits applied to every state-changing call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Gas budget per state-changing call.
    #[serde(default = "default_gas")]
    pub gas: u64,

    /// Deposit attached to activation and session-key calls, human
    /// units.
    #[serde(default = "default_activation_deposit")]
    pub activation_deposit: String,

    /// Deposit attached to the relay call, human units.
    #[serde(default = "default_relay_deposit")]
    pub relay_deposit: String,

    /// Wait after activation before dependent reads, seconds.
    #[serde(default = "default_finalization_delay")]
    pub finalization_delay_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            gas: default_gas(),
            activation_deposit: default_activation_deposit(),
            relay_deposit: default_relay_deposit(),
            finalization_delay_secs: default_finalization_delay(),
        }
    }
}

impl LimitsConfig {
    pub fn finalization_delay(&self) -> Duration {
        Duration::from_secs(self.finalization_delay_secs)
    }
}

/// Retry behavior for transaction submission.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Delay multiplier between attempts. 1.0 keeps the delay constant.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_factor: self.backoff_factor,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_explorer_url() -> String {
    "https://testnet.nearblocks.io".to_string()
}

fn default_credentials_dir() -> String {
    "~/.near-credentials".to_string()
}

fn default_wasm_path() -> String {
    "./out/fastauth.wasm".to_string()
}

fn default_initial_balance() -> String {
    "25".to_string()
}

fn default_gas() -> u64 {
    300_000_000_000_000
}

fn default_activation_deposit() -> String {
    "0.1".to_string()
}

fn default_relay_deposit() -> String {
    "0".to_string()
}

fn default_finalization_delay() -> u64 {
    2
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    10_000
}

fn default_backoff_factor() -> f64 {
    1.0
}

/// Load and validate configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DeployerConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: DeployerConfig = toml::from_str(&contents)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &DeployerConfig) -> Result<(), ConfigError> {
    let required = [
        ("accounts.signer_account_id", &config.accounts.signer_account_id),
        ("accounts.oracle_account_id", &config.accounts.oracle_account_id),
        ("contracts.mpc_contract_id", &config.contracts.mpc_contract_id),
        ("contracts.derivation_path", &config.contracts.derivation_path),
    ];
    for (name, value) in required {
        if value.is_empty() {
            return Err(ConfigError::MissingField(name.to_string()));
        }
    }

    if !config.flow.deploy_contract && config.contracts.fastauth_contract_id.is_none() {
        return Err(ConfigError::MissingField(
            "contracts.fastauth_contract_id (required when flow.deploy_contract is off)"
                .to_string(),
        ));
    }

    for (name, value) in [
        ("limits.activation_deposit", &config.limits.activation_deposit),
        ("limits.relay_deposit", &config.limits.relay_deposit),
        ("contracts.initial_balance", &config.contracts.initial_balance),
    ] {
        if let Err(error) = parse_native_amount(value) {
            return Err(ConfigError::InvalidField(name.to_string(), error.to_string()));
        }
    }

    if config.retry.max_retries == 0 {
        return Err(ConfigError::InvalidField(
            "retry.max_retries".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    if !config.retry.backoff_factor.is_finite() || config.retry.backoff_factor < 0.0 {
        return Err(ConfigError::InvalidField(
            "retry.backoff_factor".to_string(),
            "must be a finite non-negative number".to_string(),
        ));
    }

    Ok(())
}

/// Rewrite the `fastauth_contract_id` line of a config file in place
/// after a fresh deployment.
pub fn update_contract_id<P: AsRef<Path>>(path: P, contract_id: &str) -> Result<(), ConfigError> {
    let contents = fs::read_to_string(&path)?;
    let mut replaced = false;
    let updated: Vec<String> = contents
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("fastauth_contract_id") {
                replaced = true;
                format!("fastauth_contract_id = \"{contract_id}\"")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        return Err(ConfigError::MissingField(
            "contracts.fastauth_contract_id".to_string(),
        ));
    }

    fs::write(&path, updated.join("\n") + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_parameters() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.gas, 300_000_000_000_000);
        assert_eq!(limits.activation_deposit, "0.1");
        assert_eq!(limits.relay_deposit, "0");

        let retry = RetrySettings::default().to_retry_config();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(10_000));
        assert_eq!(retry.backoff_factor, 1.0);
    }
}
