//! Transport abstraction for gateway round-trips.
//!
//! The gateway speaks one verb: a form POST that returns a form-encoded body.
//! [`Transport`] captures exactly that, so hosts can substitute their own HTTP
//! stack (or a recording double in tests) without touching signing or the 3DS
//! state machine.
//!
//! # Architecture
//!
//! - **Transport**: delivers already-signed, already-encoded bytes
//! - **[`Gateway`](crate::gateway::Gateway)**: owns preparation, signing,
//!   verification and outcome classification
//!
//! # Examples
//!
//! ```rust,no_run
//! use threeds_gateway::transport::{HttpTransport, Transport};
//!
//! # async fn example() -> threeds_gateway::error::Result<()> {
//! let transport = HttpTransport::new()?;
//! let response = transport
//!     .post_form("https://gateway.example.com/direct/", b"action=QUERY&merchantID=100001")
//!     .await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use crate::error::Result;

pub mod config;
pub mod http;

pub use config::{HttpConfig, HttpVersion};
pub use http::HttpTransport;

/// Content type of every request body sent to the gateway.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Response from a transport round-trip.
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code (or protocol equivalent).
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

/// Single-shot request/response delivery to the gateway.
///
/// Implementations must not retry on their own: a SALE that reached the
/// gateway but whose reply was lost would be charged twice. Failures are
/// reported as [`GatewayError::TransportFailure`](crate::error::GatewayError::TransportFailure)
/// or [`GatewayError::HttpError`](crate::error::GatewayError::HttpError) and
/// the caller decides what to do.
///
/// Cancellation is dropping the returned future.
///
/// # Examples
///
/// A canned transport for tests:
///
/// ```
/// use threeds_gateway::{
///     error::Result,
///     transport::{Transport, TransportResponse},
/// };
///
/// struct Canned(&'static [u8]);
///
/// impl Transport for Canned {
///     async fn post_form<'a>(&'a self, _url: &'a str, _body: &'a [u8]) -> Result<TransportResponse> {
///         Ok(TransportResponse { status: 200, body: self.0.to_vec(), headers: vec![] })
///     }
///
///     fn protocol_name(&self) -> &'static str {
///         "canned"
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// POSTs an `application/x-www-form-urlencoded` body to `url`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected, the request cannot be delivered,
    /// or the gateway answers with a non-success status.
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        body: &'a [u8],
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;

    /// Returns the protocol name for logging.
    ///
    /// Examples: "http/1.1", "http/2"
    fn protocol_name(&self) -> &'static str;
}
