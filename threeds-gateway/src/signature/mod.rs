//! Request signing and response verification.
//!
//! The gateway authenticates every message with a shared merchant secret.
//! The signature is the hex-encoded SHA-512 digest of the canonical encoding
//! of the fields (see [`crate::encoding`]) immediately followed by the secret:
//!
//! ```text
//! signature = hex(SHA-512(encode(fields) || secret))
//! ```
//!
//! A signature may cover only some of the fields. Such a *partial* signature
//! is suffixed with `|` and the comma-separated names it covers, so the
//! receiver knows which fields to re-hash:
//!
//! ```text
//! 3b1f...9ac0|action,amount,merchantID
//! ```
//!
//! # Key Components
//!
//! - [`sign`]: computes a [`Signature`] for a field set under a [`SignScope`]
//! - [`verify_response`]: checks and strips the signature on a gateway response
//!
//! # Examples
//!
//! ```rust
//! use threeds_gateway::{
//!     fields::FieldSet,
//!     signature::{SignScope, sign, verify_response},
//! };
//!
//! # fn example() -> threeds_gateway::error::Result<()> {
//! let mut response = FieldSet::from([("responseCode", "0"), ("amount", "1001")]);
//! let signature = sign(&response, "secret", &SignScope::All);
//! response.insert("signature", signature.to_string());
//!
//! let verified = verify_response(response, Some("secret"))?;
//! assert!(!verified.contains_key("signature"));
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! - Digests are compared in constant time.
//! - A response that fails verification is consumed and dropped; callers
//!   never get a handle on untrusted fields.

pub mod signer;
pub mod verifier;


pub use signer::{SignScope, Signature, sign};
pub use verifier::verify_response;

/// Name of the field carrying the signature on requests and responses.
pub const SIGNATURE_FIELD: &str = "signature";
