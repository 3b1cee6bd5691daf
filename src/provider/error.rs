//! Provider-specific error handling.

use thiserror::Error;

use super::ProviderKind;

/// Errors raised while talking to a source-control provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider selector is not one of the supported providers.
    #[error("Unsupported provider '{0}'. Expected one of: github, gitlab")]
    UnknownProvider(String),

    /// Repository identifier does not have the expected `owner/name` shape.
    #[error("Invalid repository name format: {0}. Expected format: owner/repo")]
    InvalidRepositoryName(String),

    /// Configured API base URL cannot be used to build endpoint URLs.
    #[error("Invalid provider API URL: {0}")]
    InvalidApiUrl(String),

    /// The provider rejected the supplied token.
    #[error("{provider} authentication failed: {message}")]
    AuthenticationFailed {
        /// Provider that rejected the token.
        provider: ProviderKind,
        /// Detail reported by the provider.
        message: String,
    },

    /// Provider API request returned a non-success status.
    #[error("{provider} API request failed: HTTP {status}: {body}")]
    RequestFailed {
        /// Provider that served the request.
        provider: ProviderKind,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Invalid response format from the provider API.
    #[error("Invalid response format from provider API: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The requested change-request is not among the open ones.
    #[error("Change request #{number} not found among open change requests of {repository}")]
    ChangeRequestNotFound {
        /// Repository that was searched.
        repository: String,
        /// Requested change-request number.
        number: u64,
    },
}

impl ProviderError {
    /// Returns true for errors caused by caller input rather than the remote side.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_) | Self::InvalidRepositoryName(_) | Self::InvalidApiUrl(_)
        )
    }
}

/// Result alias used throughout the provider layer.
pub type Result<T> = std::result::Result<T, ProviderError>;
