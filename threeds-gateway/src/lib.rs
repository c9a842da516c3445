//! threeds-gateway: signed requests and 3-D Secure continuation for a card
//! payment gateway.
//!
//! A client integration layer for a gateway that takes form-encoded
//! requests signed with a shared secret, and that authenticates cardholders
//! with 3-D Secure (3DS) by bouncing their browser through the issuer's
//! Access Control Server (ACS).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   FieldSet   ┌──────────────┐   signed    ┌──────────────┐
//! │   Merchant   │─────────────►│   Request    │────────────►│  Canonical   │
//! │  application │              │   Preparer   │             │   Encoder    │
//! └──────▲───────┘              └──────────────┘             └──────┬───────┘
//!        │                                                          │ POST
//!        │ Step / Outcome                                           ▼
//! ┌──────┴───────┐   verified   ┌──────────────┐   response  ┌──────────────┐
//! │     3DS      │◄─────────────│   Verifier   │◄────────────│  Transport   │
//! │    Engine    │              │              │             │   (HTTPS)    │
//! └──────────────┘              └──────────────┘             └──────────────┘
//! ```
//!
//! Every step apart from the transport is synchronous and pure. 3DS state is
//! a [`ThreeDSSession`](threeds::ThreeDSSession) value the caller stores
//! between browser round-trips; nothing in this crate holds global state.
//!
//! # Quick Start
//!
//! ## 1. Sign and Verify
//!
//! ```rust
//! use threeds_gateway::{
//!     fields::FieldSet,
//!     signature::{SIGNATURE_FIELD, SignScope, sign, verify_response},
//! };
//!
//! let mut response = FieldSet::from([("responseCode", "0"), ("amount", "1001")]);
//! let signature = sign(&response, "Threeds2Test60System", &SignScope::All);
//! response.insert(SIGNATURE_FIELD, signature.to_string());
//!
//! let verified = verify_response(response, Some("Threeds2Test60System")).unwrap();
//! assert!(!verified.contains_key(SIGNATURE_FIELD));
//! ```
//!
//! ## 2. Direct SALE with 3DS
//!
//! ```rust,no_run
//! use threeds_gateway::{
//!     fields::FieldSet,
//!     gateway::Gateway,
//!     merchant::MerchantContext,
//!     threeds::{ContinuationEngine, Step, ThreeDSSession},
//! };
//!
//! # async fn example(browser_post: FieldSet, acs_post: FieldSet) -> threeds_gateway::Result<()> {
//! let gateway = Gateway::from_context(MerchantContext::test_account())?;
//! let engine = ContinuationEngine::default();
//!
//! let mut sale = FieldSet::from([
//!     ("action", "SALE"),
//!     ("merchantID", "100856"),
//!     ("type", "1"),
//!     ("amount", "1001"),
//!     ("transactionUnique", "order-42"),
//! ]);
//!
//! let session = engine.await_browser_info(ThreeDSSession::new(&sale)?)?;
//! // ... render `gateway.collect_browser_info(..)`, receive `browser_post` ...
//! let session = engine.submit_browser_info(session, &mut sale, &browser_post)?;
//!
//! match gateway.advance(&engine, session, sale).await? {
//!     Step::Complete(outcome) => println!("finished: {}", outcome.is_approved()),
//!     Step::Challenge { session, challenge } => {
//!         // ... render `challenge.to_form()`, store `session`, receive `acs_post` ...
//!         let next = engine.continuation_request(&session, &acs_post)?;
//!         let _step = gateway.advance(&engine, session, next).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`fields`]: Ordered, nestable name/value model
//! - [`encoding`]: Canonical form encoding used for signing and transport
//! - [`signature`]: SHA-512 request signing and fail-closed response verification
//! - [`merchant`]: Merchant configuration and request preparation
//! - [`outcome`]: Response codes and terminal outcomes
//! - [`threeds`]: 3DS session state and continuation engine
//! - [`form`]: Browser form model and HTML rendering
//! - [`transport`]: Transport abstraction and HTTPS implementation
//! - [`gateway`]: Client tying the pieces together
//! - [`error`]: Error types
//!
//! # Security Considerations
//!
//! - **Fail closed**: a response whose signature is missing, unexpected or
//!   wrong is an error and its payload is never returned
//! - **Constant-time comparison** of digests
//! - **Secrets stay local**: per-request `merchantSecret` overrides are
//!   stripped before sending, and `Debug` output redacts secrets
//! - **HTTPS only** for gateway endpoints
//! - **No automatic retries**: a lost reply to a SALE must not charge twice
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`](error::Result). A declined payment is
//! an [`Outcome`](outcome::Outcome), not an error:
//!
//! ```rust
//! use threeds_gateway::{GatewayError, fields::FieldSet, outcome::Outcome};
//!
//! let response = FieldSet::from([("responseCode", "5"), ("responseMessage", "DECLINED")]);
//! match Outcome::classify(response) {
//!     Ok(Outcome::Approved { .. }) => println!("approved"),
//!     Ok(Outcome::Declined { message, .. }) => println!("declined: {message}"),
//!     Ok(Outcome::Failed { code, message, .. }) => println!("failed {code:?}: {message}"),
//!     Err(GatewayError::InvalidResponse(msg)) => eprintln!("bad response: {msg}"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions, reason = "transitive dependencies from reqwest")]

pub mod encoding;
pub mod error;
pub mod fields;
pub mod form;
pub mod gateway;
pub mod merchant;
pub mod outcome;
pub mod signature;
pub mod threeds;
pub mod transport;

pub use error::{GatewayError, Result};
pub use gateway::Gateway;
