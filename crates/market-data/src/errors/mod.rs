//! Error types for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ErrorKind`]: The coarse taxonomy callers match on after fallback and
//!   stale-cache handling

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Errors that can occur during market data operations.
#[derive(Error, Debug, Clone)]
pub enum MarketDataError {
    /// The provider could not serve the request (network failure, timeout,
    /// server error).
    #[error("Provider unavailable: {provider} - {message}")]
    ProviderUnavailable {
        /// The provider that failed
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// The provider responded but has no data for the symbol.
    #[error("Symbol not found: {symbol} ({provider})")]
    SymbolNotFound {
        /// The provider that was asked
        provider: String,
        /// The requested symbol
        symbol: String,
    },

    /// The provider signalled throttling, or the local rate limiter refused
    /// the call.
    #[error("Rate limit exceeded: {provider}")]
    RateLimitExceeded {
        /// The throttled provider
        provider: String,
    },

    /// Missing or invalid settings, or a missing dependency at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A wait for rate-limit capacity was cancelled or timed out.
    #[error("Cancelled while waiting for provider: {provider}")]
    Cancelled {
        /// The provider being waited on
        provider: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by provider: {provider}")]
    NotSupported {
        /// The operation name
        operation: String,
        /// The provider
        provider: String,
    },
}

/// Coarse error taxonomy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    ProviderUnavailable,
    SymbolNotFound,
    RateLimitExceeded,
    Configuration,
    Cancelled,
    NotSupported,
}

impl MarketDataError {
    /// Shorthand for a [`MarketDataError::ProviderUnavailable`].
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`MarketDataError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns the taxonomy kind of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotehub_market_data::errors::{ErrorKind, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimitExceeded { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.kind(), ErrorKind::RateLimitExceeded);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Self::SymbolNotFound { .. } => ErrorKind::SymbolNotFound,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
        }
    }

    /// The provider this error is attributed to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::SymbolNotFound { provider, .. }
            | Self::RateLimitExceeded { provider }
            | Self::Cancelled { provider }
            | Self::NotSupported { provider, .. } => Some(provider),
            Self::Configuration(_) => None,
        }
    }
}
