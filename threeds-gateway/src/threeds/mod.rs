//! 3-D Secure continuation.
//!
//! A 3DS v2 payment bounces the cardholder's browser between the merchant,
//! the gateway and the card issuer's Access Control Server (ACS):
//!
//! 1. The browser posts its fingerprint ([`BrowserHeaders`], [`DEVICE_FIELDS`]).
//! 2. The SALE is sent with the fingerprint merged in.
//! 3. The gateway answers `65802` (authentication required) with a
//!    `threeDSRef`, a `threeDSURL` and `threeDSRequest[...]` fields.
//! 4. The browser posts those fields to the ACS, hidden for a method step and
//!    visible for a challenge.
//! 5. The ACS posts back; the merchant relays the post to the gateway under
//!    `threeDSResponse[...]` with the same `threeDSRef`.
//! 6. Steps 3-5 repeat until a terminal response code arrives.
//!
//! [`ContinuationEngine`] drives steps 2-6 without doing any I/O, and
//! [`ThreeDSSession`] carries the state between them. Sessions belong to the
//! host, one per transaction, so concurrent payments never share state.

mod browser;
mod engine;
mod session;

pub use browser::{BROWSER_INFO_FIELD, BrowserHeaders, DEVICE_FIELDS, posted_browser_info};
pub use engine::{ACS_FRAME_NAME, Challenge, ContinuationEngine, Presentation, Step};
pub use session::{ChallengeLimits, ThreeDSSession, ThreeDSState};
