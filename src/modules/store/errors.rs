use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Document {0} does not exist")]
    NotFound(String),
    #[error("Missing or insufficient permissions for {0}")]
    PermissionDenied(String),
    #[error("Failed to decode document {0}")]
    Decode(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
