//! Error types for the gateway client.
//!
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Local input errors** ([`GatewayError::InvalidInput`], [`GatewayError::MissingField`]):
//!   raised before any network call is attempted
//! - **Response integrity errors** ([`GatewayError::InvalidResponse`],
//!   [`GatewayError::SignatureMismatch`]): the response must not be trusted
//! - **Network errors** ([`GatewayError::TransportFailure`], [`GatewayError::HttpError`]):
//!   reported to the caller, never retried by this crate
//! - **Configuration errors** ([`GatewayError::ConfigError`])
//! - **3DS loop bound** ([`GatewayError::ChallengeLimitExceeded`])
//!
//! A declined payment is not an error. It is reported as
//! [`Outcome::Declined`](crate::gateway::Outcome::Declined).
//!
//! # Examples
//!
//! ```
//! use threeds_gateway::error::{GatewayError, Result};
//!
//! fn require_action(action: Option<&str>) -> Result<&str> {
//!     action.ok_or(GatewayError::MissingField("action".to_owned()))
//! }
//!
//! assert!(require_action(None).is_err());
//! ```

use std::fmt;

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Which side of the exchange is out of step when a response signature fails.
///
/// The three kinds are kept apart so that logs show whether the merchant and
/// the gateway disagree about having a secret at all. The [`Display`](fmt::Display)
/// output of [`GatewayError::SignatureMismatch`] only exposes a numeric suffix,
/// which is safe to show to a cardholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMismatchKind {
    /// The response is signed but no secret is configured locally.
    Unexpected,
    /// A secret is configured locally but the response carries no signature.
    Missing,
    /// Both sides signed and the digests differ.
    Digest,
}

impl SignatureMismatchKind {
    /// Short label used as a structured log field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unexpected => "unexpected_signature",
            Self::Missing => "missing_signature",
            Self::Digest => "digest_mismatch",
        }
    }
}

impl fmt::Display for SignatureMismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected => f.write_str(" (1)"),
            Self::Missing => f.write_str(" (2)"),
            Self::Digest => Ok(()),
        }
    }
}

/// Errors that can occur while talking to the payment gateway.
///
/// # Error Recovery
///
/// - **Input errors** ([`InvalidInput`](Self::InvalidInput),
///   [`MissingField`](Self::MissingField)): fix the request and resubmit
/// - **Integrity errors** ([`SignatureMismatch`](Self::SignatureMismatch),
///   [`InvalidResponse`](Self::InvalidResponse)): discard the response, check
///   the merchant secret
/// - **Transport errors** ([`TransportFailure`](Self::TransportFailure),
///   [`HttpError`](Self::HttpError)): the caller decides whether a retry is safe
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request field set is malformed.
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// A required field is absent and no configured default could supply it.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::error::GatewayError;
    ///
    /// let err = GatewayError::MissingField("action".to_owned());
    /// assert_eq!(err.to_string(), "Request must contain 'action'");
    /// ```
    #[error("Request must contain '{0}'")]
    MissingField(String),

    /// The gateway answered with something that is not a gateway response.
    ///
    /// Raised when `responseCode` is absent, or when a 3DS step lacks the
    /// fields needed to continue.
    #[error("Invalid response from Payment Gateway: {0}")]
    InvalidResponse(String),

    /// The response signature could not be verified.
    ///
    /// The payload must be discarded. The message deliberately avoids saying
    /// which side holds a secret; use the kind for diagnostics.
    #[error("Incorrectly signed response from Payment Gateway{0}")]
    SignatureMismatch(SignatureMismatchKind),

    /// The request could not be delivered or the reply could not be read.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// HTTP client error (connection, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Merchant or transport configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A 3DS challenge loop ran past its iteration or time bound.
    #[error("3DS challenge did not complete after {iterations} continuation(s)")]
    ChallengeLimitExceeded {
        /// Continuations processed before the bound was hit.
        iterations: u32,
    },
}

impl GatewayError {
    /// Returns true for network-level failures the caller may choose to retry.
    ///
    /// Retrying a SALE that timed out can charge the cardholder twice, so the
    /// decision is left to the caller.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::TransportFailure(_) | Self::HttpError(_))
    }
}
