use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudlogError {
    #[error("invalid query: {0}")]
    ClientInput(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("{op}: {source}")]
    Provider {
        op: String,
        #[source]
        source: ProviderError,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("{0}: request cancelled")]
    Cancelled(String),

    #[error("{0}: deadline exceeded")]
    DeadlineExceeded(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CloudlogError {
    pub fn provider(op: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            op: op.into(),
            source,
        }
    }

    /// True for failures caused by the caller's context rather than the provider.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded(_))
    }
}

/// Failures surfaced by a log provider client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, CloudlogError>;
