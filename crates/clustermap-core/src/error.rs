pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate {kind} uid: {uid}")]
    DuplicateUid { kind: &'static str, uid: String },

    #[error("Invalid {kind} {uid}: {message}")]
    InvalidEntity {
        kind: &'static str,
        uid: String,
        message: String,
    },

    #[error("Link {link} references unknown gene {gene}")]
    UnknownGene { link: String, gene: String },

    #[error("Invalid config value at {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("Invalid input JSON: {0}")]
    Json(#[from] serde_json::Error),
}
