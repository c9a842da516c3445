//! Per-transaction 3DS correlation state.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{GatewayError, Result},
    fields::FieldSet,
};

/// Where a transaction is in the 3DS exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeDSState {
    /// Created; nothing sent yet.
    Init,
    /// Waiting for the cardholder's browser to post its fingerprint.
    AwaitingBrowserInfo,
    /// The SALE has been sent; waiting for the gateway's answer.
    Submitted,
    /// The ACS has been given a challenge or method request; waiting for it
    /// to post back.
    ChallengePending,
    /// Terminal: approved.
    Approved,
    /// Terminal: declined by the issuer.
    Declined,
    /// Terminal: any other failure, including an exceeded challenge bound.
    Failed,
}

impl ThreeDSState {
    /// Returns true once no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Declined | Self::Failed)
    }

    /// Short label used as a structured log field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::AwaitingBrowserInfo => "awaiting_browser_info",
            Self::Submitted => "submitted",
            Self::ChallengePending => "challenge_pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Failed => "failed",
        }
    }
}

/// Bounds on a challenge loop.
///
/// The gateway may ask for any number of ACS round-trips; these limits stop
/// a misbehaving ACS from holding a transaction open forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeLimits {
    /// Maximum authentication-required responses per transaction.
    pub max_iterations: u32,
    /// Maximum wall-clock time from session creation.
    pub max_duration: Duration,
}

impl Default for ChallengeLimits {
    fn default() -> Self {
        Self { max_iterations: 10, max_duration: Duration::from_secs(15 * 60) }
    }
}

/// Correlation state for one in-flight 3DS transaction.
///
/// The engine never stores sessions. The host persists this value between
/// browser round-trips (it is `serde`-serialisable) and hands it back on
/// the next call.
///
/// # Examples
///
/// ```
/// use threeds_gateway::{fields::FieldSet, threeds::{ThreeDSSession, ThreeDSState}};
///
/// let sale = FieldSet::from([
///     ("action", "SALE"),
///     ("merchantID", "100856"),
///     ("transactionUnique", "order-42"),
/// ]);
/// let session = ThreeDSSession::new(&sale).unwrap();
/// assert_eq!(session.state(), ThreeDSState::Init);
/// assert!(session.three_ds_ref().is_none());
///
/// let json = serde_json::to_string(&session).unwrap();
/// let restored: ThreeDSSession = serde_json::from_str(&json).unwrap();
/// assert_eq!(restored, session);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDSSession {
    correlation_id: Uuid,
    state: ThreeDSState,
    #[serde(rename = "threeDSRef", default, skip_serializing_if = "Option::is_none")]
    three_ds_ref: Option<String>,
    action: String,
    #[serde(rename = "merchantID")]
    merchant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_unique: Option<String>,
    iterations: u32,
    started_at: u64,
}

impl ThreeDSSession {
    /// Starts a session for a prepared SALE (or other action) request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingField`] if `action` or `merchantID` is absent.
    pub fn new(request: &FieldSet) -> Result<Self> {
        let required = |name: &str| {
            request
                .text(name)
                .map(|value| value.into_owned())
                .ok_or_else(|| GatewayError::MissingField(name.to_owned()))
        };

        Ok(Self {
            correlation_id: Uuid::new_v4(),
            state: ThreeDSState::Init,
            three_ds_ref: None,
            action: required("action")?,
            merchant_id: required("merchantID")?,
            transaction_unique: request.text("transactionUnique").map(|value| value.into_owned()),
            iterations: 0,
            started_at: unix_now(),
        })
    }

    /// Caller-side key for this transaction before a `threeDSRef` is issued.
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ThreeDSState {
        self.state
    }

    /// Gateway-issued correlation token, once the first challenge arrived.
    #[must_use]
    pub fn three_ds_ref(&self) -> Option<&str> {
        self.three_ds_ref.as_deref()
    }

    /// Action to resume with.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Merchant the transaction belongs to.
    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Merchant's own transaction reference, if the request carried one.
    #[must_use]
    pub fn transaction_unique(&self) -> Option<&str> {
        self.transaction_unique.as_deref()
    }

    /// Authentication-required responses seen so far.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Unix time (seconds) the session was created.
    #[must_use]
    pub const fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Time since creation, saturating at zero if the clock went backwards.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.started_at))
    }

    pub(crate) fn set_state(&mut self, state: ThreeDSState) {
        self.state = state;
    }

    pub(crate) fn set_three_ds_ref(&mut self, three_ds_ref: String) {
        self.three_ds_ref = Some(three_ds_ref);
    }

    pub(crate) fn record_iteration(&mut self) -> u32 {
        self.iterations = self.iterations.saturating_add(1);
        self.iterations
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: Duration) {
        self.started_at = self.started_at.saturating_sub(by.as_secs());
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
}
