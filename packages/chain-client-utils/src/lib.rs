/*
 * fastauth-chain-client-utils: chain-facing plumbing for the FastAuth
 * deployer. Provides the chain client capability trait with a JSON-RPC
 * view transport, retry-with-backoff execution, exact token-amount
 * conversion, ed25519 key pairs with a key store capability, and the
 * transaction submitter the activation orchestrator drives.
 */

pub mod client;
pub mod error;
pub mod keys;
pub mod keystore;
pub mod mock;
pub mod retry;
pub mod rpc;
pub mod submitter;
pub mod tokens;
pub mod transaction;

pub use client::{AccountState, ChainClient};
pub use error::ClientError;
pub use keys::{verify_signature, KeyError, KeyPair};
pub use keystore::{FileKeyStore, InMemoryKeyStore, KeyStore, KeyStoreError};
pub use mock::MockChainClient;
pub use retry::{retry_with_backoff, RetryConfig};
pub use rpc::JsonRpcClient;
pub use submitter::{CallRequest, SubmitError, TransactionSubmitter};
pub use tokens::{format_native_amount, parse_native_amount, AmountError, NATIVE_DECIMALS};
pub use transaction::TransactionResponse;
