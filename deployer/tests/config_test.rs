use std::io::Write;

use fastauth_deployer::config::{load_config, update_contract_id, ConfigError};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_valid_config() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"
    explorer_url = "https://testnet.nearblocks.io"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"
    credentials_dir = "/tmp/.near-credentials"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    fastauth_contract_id = "1732654372972-fastauth.testnet"
    wasm_path = "./out/fastauth.wasm"
    initial_balance = "25"
    derivation_path = "MPC_PATH"

    [flow]
    deploy_contract = false

    [retry]
    max_retries = 3
    initial_delay_ms = 500
    "#;

    let file = write_config(config_content);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.network.network_id, "testnet");
    assert_eq!(config.accounts.signer_account_id, "benjiman.testnet");
    assert_eq!(
        config.contracts.fastauth_contract_id.as_deref(),
        Some("1732654372972-fastauth.testnet")
    );
    assert!(!config.flow.deploy_contract);
    // unspecified flags keep their defaults
    assert!(config.flow.perform_actions);
    assert!(config.flow.activate);

    // operational defaults
    assert_eq!(config.limits.gas, 300_000_000_000_000);
    assert_eq!(config.limits.activation_deposit, "0.1");
    assert_eq!(config.limits.relay_deposit, "0");

    let retry = config.retry.to_retry_config();
    assert_eq!(retry.max_retries, 3);
    assert_eq!(retry.initial_delay.as_millis(), 500);
    assert_eq!(retry.backoff_factor, 1.0);
}

#[test]
fn test_missing_contract_id_without_deploy() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    derivation_path = "MPC_PATH"

    [flow]
    deploy_contract = false
    "#;

    let file = write_config(config_content);
    let result = load_config(file.path());

    match result {
        Err(ConfigError::MissingField(field)) => {
            assert!(field.contains("fastauth_contract_id"));
        }
        other => panic!("expected MissingField error, got {other:?}"),
    }
}

#[test]
fn test_invalid_deposit_is_rejected() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    derivation_path = "MPC_PATH"

    [limits]
    activation_deposit = "0.1.2"
    "#;

    let file = write_config(config_content);
    let result = load_config(file.path());

    match result {
        Err(ConfigError::InvalidField(field, _)) => {
            assert_eq!(field, "limits.activation_deposit");
        }
        other => panic!("expected InvalidField error, got {other:?}"),
    }
}

#[test]
fn test_zero_retries_is_rejected() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    derivation_path = "MPC_PATH"

    [retry]
    max_retries = 0
    "#;

    let file = write_config(config_content);
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::InvalidField(field, _)) if field == "retry.max_retries"
    ));
}

#[test]
fn test_update_contract_id_rewrites_in_place() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    fastauth_contract_id = "old-fastauth.testnet"
    derivation_path = "MPC_PATH"
    "#;

    let file = write_config(config_content);
    update_contract_id(file.path(), "1732654372972-fastauth.testnet").unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(
        config.contracts.fastauth_contract_id.as_deref(),
        Some("1732654372972-fastauth.testnet")
    );
    // unrelated fields survive the rewrite
    assert_eq!(config.contracts.mpc_contract_id, "v1.signer-prod.testnet");
}

#[test]
fn test_update_contract_id_requires_existing_line() {
    let config_content = r#"
    [network]
    network_id = "testnet"
    rpc_url = "https://rpc.testnet.example.com"

    [accounts]
    signer_account_id = "benjiman.testnet"
    oracle_account_id = "fastauth-oracle-1.testnet"

    [contracts]
    mpc_contract_id = "v1.signer-prod.testnet"
    derivation_path = "MPC_PATH"
    "#;

    let file = write_config(config_content);
    assert!(matches!(
        update_contract_id(file.path(), "new-fastauth.testnet"),
        Err(ConfigError::MissingField(_))
    ));
}
