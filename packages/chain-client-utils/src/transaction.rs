/// Outcome of a submitted transaction.
#[derive(Debug, Clone)]
pub struct TransactionResponse {
    pub hash: String,
    pub success: bool,
    pub gas_burnt: u64,
}
