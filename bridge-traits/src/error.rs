use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Decoder could not bind to its output surface: {0}")]
    SurfaceUnavailable(String),

    #[error("Decoder failed to load source: {0}")]
    LoadFailed(String),

    #[error("Subscription not found: {0}")]
    UnknownSubscription(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
