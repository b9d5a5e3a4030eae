use std::path::Path;
use std::sync::Arc;
use std::{env, fs, process};

use fastauth_chain_client_utils::keystore::FileKeyStore;
use fastauth_chain_client_utils::rpc::JsonRpcClient;
use fastauth_deployer::config;
use fastauth_deployer::orchestrator::ActivationOrchestrator;
use fastauth_deployer::types::ActionToPerform;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    println!("Loading configuration from {config_path}");

    if !Path::new(&config_path).exists() {
        eprintln!("Configuration file not found: {config_path}");
        process::exit(1);
    }

    let config = config::load_config(&config_path)?;

    let wasm = if config.flow.deploy_contract {
        Some(fs::read(&config.contracts.wasm_path)?)
    } else {
        None
    };

    let client = Arc::new(JsonRpcClient::new(config.network.rpc_url.clone()));
    let keystore = FileKeyStore::new(&config.accounts.credentials_dir);

    let deploy_contract = config.flow.deploy_contract;
    let mut orchestrator = ActivationOrchestrator::new(client, keystore, config);

    let action = ActionToPerform {
        target_contract_id: "guestbook.near-examples.testnet".to_string(),
        method_name: "add_message".to_string(),
        args: serde_json::json!({ "text": "Hello from the Eth Implicit Account!" }),
        attached_deposit: "0".to_string(),
        gas: "100000000000000".to_string(),
    };

    let result = orchestrator.run(wasm, Some(action)).await;

    // persist a freshly minted contract id even if a later step failed
    if deploy_contract {
        if let Some(contract_id) = orchestrator.contract_id() {
            config::update_contract_id(&config_path, contract_id)?;
            println!("Updated {config_path} with contract id {contract_id}");
        }
    }

    match result {
        Ok(Some(hash)) => println!("Relayed transaction: {hash}"),
        Ok(None) => println!("Run complete, no actions performed"),
        Err(error) => {
            eprintln!("Error in deploy: {error}");
            process::exit(1);
        }
    }

    Ok(())
}
