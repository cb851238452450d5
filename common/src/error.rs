use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("`{namespace}/{key}` holds a {found} value, expected {expected}")]
    TypeMismatch {
        namespace: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("settings backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid manifest json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest does not name a latest version")]
    MissingLatest,
    #[error("manifest has no firmware url for version {0}")]
    MissingUrl(String),
}
