/*
 * fastauth-deployer: library for orchestrating FastAuth deployments.
 * Deploys the contract to a fresh funded account, derives the
 * externally-controlled implicit account from an MPC-issued key,
 * activates it, registers a session key, and relays session-signed
 * payloads through the oracle-authorized contract.
 */

pub mod config;
pub mod derivation;
pub mod orchestrator;
pub mod types;

pub use config::{load_config, update_contract_id, ConfigError, DeployerConfig};
pub use derivation::{
    derive_eth_address_from_mpc_key, derive_implicit_account_id, DerivationError,
};
pub use orchestrator::{ActivationOrchestrator, ActivationState, OrchestratorError};
pub use types::{ActionToPerform, FastAuthInitArgs, KeyUsage, NearPayload, UsageStats};
