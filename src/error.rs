//! Error types for regwatch.

/// Result type alias for regwatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Boxed error returned by a fallible subscription callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while watching a namespace node.
///
/// Duration expiry and cancellation are not errors; they are reported as
/// [`WatchExit`](crate::notify::WatchExit) values.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The path has an unrecognized root or names a node that does not exist.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller lacks the rights to open or watch the node.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other OS-level failure while opening, arming or waiting.
    #[error("{context} failed with status {code}")]
    OperationFailed {
        /// The operation that failed
        context: &'static str,
        /// The underlying OS status code
        code: u32,
    },

    /// A signal or handle could not be created.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The subscription callback returned an error.
    #[error("Subscription callback failed: {0}")]
    CallbackFailed(#[source] CallbackError),

    #[cfg(feature = "toml")]
    /// Subscription options could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for other cases.
    #[error("Watch error: {0}")]
    Other(String),
}

impl WatchError {
    /// Create an `OperationFailed` error for the given operation and status.
    pub fn operation(context: &'static str, code: u32) -> Self {
        Self::OperationFailed { context, code }
    }

    /// The OS status code carried by this error, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::OperationFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error was caused by the path rather than the OS.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Short machine-readable name of the error kind, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::InvalidArgument(_) => "invalid_argument",
            WatchError::PermissionDenied(_) => "permission_denied",
            WatchError::OperationFailed { .. } => "operation_failed",
            WatchError::ResourceExhausted(_) => "resource_exhausted",
            WatchError::CallbackFailed(_) => "callback_failed",
            #[cfg(feature = "toml")]
            WatchError::InvalidConfig(_) => "invalid_config",
            WatchError::Other(_) => "other",
        }
    }
}
