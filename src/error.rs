use thiserror::Error;

/// Errors from the log store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("payload encryption failed")]
    Encryption,

    #[error("payload decryption failed: {0}")]
    Decryption(String),

    #[error("operation not supported in degraded mode: {0}")]
    NotSupported(&'static str),
}

/// Errors while composing or delivering an alert; never leave the dispatcher
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("alerts are disabled")]
    Disabled,

    #[error("sender credentials not configured")]
    MissingCredentials,

    #[error("no valid recipients")]
    NoRecipients,

    #[error("alert relay endpoint not configured")]
    MissingEndpoint,

    #[error("SMTP server not configured")]
    MissingSmtpServer,

    #[error("invalid address {0}")]
    InvalidAddress(String),

    #[error("relay rejected alert: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("message build failed: {0}")]
    Message(#[from] lettre::error::Error),
}

/// Errors loading the model prior
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    #[error("failed to load model {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Errors surfaced to callers of the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("no text provided")]
    EmptyInput,

    #[error("no valid logs found")]
    NoValidLogs,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
