//! Errors a completion request can end with.

/// Why a completion failed.
///
/// The session treats every variant the same way (the reply fails, the
/// user's turn stays logged); the split exists for logs and HTTP mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No answer in time
    #[error("request timed out")]
    Timeout,

    /// Throttled by the provider, with the advertised wait if any
    #[error("rate limited (retry after {0:?}s)")]
    RateLimited(Option<u64>),

    /// Prompt larger than the context budget, in bytes
    #[error("prompt of {0} bytes exceeds the context budget")]
    ContextOverflow(usize),

    /// Provider overloaded or down
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Credentials rejected
    #[error("authentication failed")]
    Unauthorized,

    /// Provider refused the request as malformed
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Answer could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport failure, including a stream cut mid-reply
    #[error("connection failed: {0}")]
    Connection(String),
}

impl ProviderError {
    /// [`ProviderError::Unavailable`].
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// [`ProviderError::Rejected`].
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// [`ProviderError::Malformed`].
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// [`ProviderError::Connection`].
    #[must_use]
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection(reason.into())
    }

    /// Transient failures an embedding caller may retry. Nothing in this
    /// crate retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited(_) | Self::Unavailable(_) | Self::Connection(_)
        )
    }
}
