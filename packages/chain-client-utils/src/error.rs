/// error type to be returned by all chain-facing client types.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client error: {0}")]
    ClientError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::ParseError(value.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        ClientError::ClientError(value.to_string())
    }
}
