use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cross-contract call description relayed through the FastAuth
/// contract on behalf of a derived account.
///
/// Field names and string-encoded numerics are part of the wire
/// contract; `args` serializes as a JSON byte array. The signed message
/// is exactly the JSON serialization of this struct.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NearPayload {
    pub contract_id: String,
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: String,
    pub deposit: String,
    pub nonce: String,
}

/// The action a relay run performs on behalf of the activated account.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActionToPerform {
    pub target_contract_id: String,
    pub method_name: String,
    pub args: Value,
    /// Attached deposit in human units.
    pub attached_deposit: String,
    /// Gas for the relayed call, decimal string.
    pub gas: String,
}

/// Constructor arguments for the FastAuth contract's `new` method.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FastAuthInitArgs {
    pub mpc_contract: String,
    pub oracle_account_id: String,
    pub contract_key: String,
}

/// Usage bookkeeping the contract keeps per session key.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UsageStats {
    pub total_interactions: u64,
    pub interactions_per_day: HashMap<u64, u64>,
    pub methods_called: HashMap<String, u64>,
    pub contracts_called: HashMap<String, u64>,
    pub gas_used: u128,
    pub deposit_used: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct KeyUsage {
    pub usage_stats: UsageStats,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_args_serialize_as_a_byte_array() {
        let payload = NearPayload {
            contract_id: "guestbook.near-examples.testnet".to_string(),
            method_name: "add_message".to_string(),
            args: vec![123, 125],
            gas: "100000000000000".to_string(),
            deposit: "0".to_string(),
            nonce: "1".to_string(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["args"], json!([123, 125]));
        assert_eq!(value["gas"], json!("100000000000000"));

        let restored: NearPayload = serde_json::from_value(value).unwrap();
        assert_eq!(restored, payload);
    }
}
