//! The 3DS continuation state machine.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{
    browser::posted_browser_info,
    session::{ChallengeLimits, ThreeDSSession, ThreeDSState},
};
use crate::{
    error::{GatewayError, Result},
    fields::FieldSet,
    form::{Form, SubmitButton, Submission},
    outcome::{Outcome, ResponseCode},
};

/// Name of the frame the ACS form is posted into.
pub const ACS_FRAME_NAME: &str = "threeds_acs";

/// Response field carrying the ACS URL.
const THREE_DS_URL: &str = "threeDSURL";
/// Response and request field carrying the gateway correlation token.
const THREE_DS_REF: &str = "threeDSRef";
/// Parent of the fields to relay to the ACS.
const THREE_DS_REQUEST: &str = "threeDSRequest";
/// Parent of the ACS post-back fields relayed to the gateway.
const THREE_DS_RESPONSE: &str = "threeDSResponse";
/// Present on the ACS request for a device-fingerprinting (method) step.
const METHOD_DATA: &str = "threeDSMethodData";

/// How the ACS post is shown to the cardholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Frictionless method step; post into a frame that is not displayed.
    Hidden,
    /// Genuine challenge; the cardholder interacts with the ACS.
    Visible,
}

/// An ACS round-trip the browser must perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    /// ACS URL (`threeDSURL`).
    pub url: String,
    /// Every `threeDSRequest[...]` field, flattened, plus `threeDSRef`.
    pub fields: FieldSet,
    /// Whether the cardholder sees the frame.
    pub presentation: Presentation,
}

impl Challenge {
    /// The auto-submitting form that relays the challenge to the ACS.
    ///
    /// Targets the [`ACS_FRAME_NAME`] frame; render the frame itself with
    /// [`HtmlFormRenderer::render_frame`](crate::form::HtmlFormRenderer::render_frame).
    #[must_use]
    pub fn to_form(&self) -> Form {
        Form::post(&self.url, self.fields.clone())
            .with_id("silentPost")
            .with_target(ACS_FRAME_NAME)
            .with_submit(SubmitButton::Text("Continue".to_owned()))
            .with_submission(Submission::Auto)
    }

    /// Returns true for a frictionless step.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.presentation == Presentation::Hidden
    }
}

/// What to do after a gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Send the browser to the ACS, keep the session.
    Challenge {
        /// Updated session to persist until the ACS posts back.
        session: ThreeDSSession,
        /// The ACS post to present.
        challenge: Challenge,
    },
    /// The transaction is finished; discard the session.
    Complete(Outcome),
}

/// Stateless driver of the 3DS exchange.
///
/// Every method takes the [`ThreeDSSession`] by value or reference and
/// returns the updated one; the engine performs no I/O and stores nothing.
///
/// ```text
/// Init ─► AwaitingBrowserInfo ─► Submitted ─► ChallengePending ◄─┐
///   └──────────────────────────────┘    │            │          │
///                                       ▼            └──────────┘
///                               Approved | Declined | Failed
/// ```
///
/// # Examples
///
/// ```
/// use threeds_gateway::{
///     fields::FieldSet,
///     threeds::{ContinuationEngine, Step, ThreeDSSession},
/// };
///
/// # fn example() -> threeds_gateway::error::Result<()> {
/// let engine = ContinuationEngine::default();
/// let sale = FieldSet::from([("action", "SALE"), ("merchantID", "100856")]);
/// let session = engine.submit(ThreeDSSession::new(&sale)?)?;
///
/// let response = FieldSet::from([
///     ("responseCode", "65802"),
///     ("threeDSRef", "REF-1"),
///     ("threeDSURL", "https://acs.example.com/method"),
///     ("threeDSRequest[threeDSMethodData]", "eyJ0aHJlZURT"),
/// ]);
///
/// let Step::Challenge { session, challenge } = engine.process_response(session, &response)? else {
///     unreachable!();
/// };
/// assert!(challenge.is_hidden());
///
/// let acs_post = FieldSet::from([("threeDSMethodData", "eyJ0aHJlZURT")]);
/// let next = engine.continuation_request(&session, &acs_post)?;
/// assert_eq!(next.text("threeDSRef").as_deref(), Some("REF-1"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuationEngine {
    limits: ChallengeLimits,
}

impl ContinuationEngine {
    /// Creates an engine with the given challenge bounds.
    #[must_use]
    pub const fn new(limits: ChallengeLimits) -> Self {
        Self { limits }
    }

    /// The configured challenge bounds.
    #[must_use]
    pub const fn limits(&self) -> ChallengeLimits {
        self.limits
    }

    /// Moves a new session to [`ThreeDSState::AwaitingBrowserInfo`].
    ///
    /// Call this when rendering the fingerprint form.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] unless the session is in [`ThreeDSState::Init`].
    pub fn await_browser_info(&self, mut session: ThreeDSSession) -> Result<ThreeDSSession> {
        expect_state(&session, &[ThreeDSState::Init])?;
        session.set_state(ThreeDSState::AwaitingBrowserInfo);
        Ok(session)
    }

    /// Merges the fingerprint the browser posted into the SALE request.
    ///
    /// Each posted `browserInfo[name]` becomes a top-level `name` field of
    /// `sale`, and the session moves to [`ThreeDSState::Submitted`]. The caller
    /// sends `sale` next.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the session is not awaiting
    /// browser info or the post carries no fingerprint fields.
    #[instrument(skip_all, fields(correlation_id = %session.correlation_id()))]
    pub fn submit_browser_info(
        &self,
        mut session: ThreeDSSession,
        sale: &mut FieldSet,
        browser_post: &FieldSet,
    ) -> Result<ThreeDSSession> {
        expect_state(&session, &[ThreeDSState::AwaitingBrowserInfo])?;

        let info = posted_browser_info(browser_post);
        if info.is_empty() {
            return Err(GatewayError::InvalidInput(
                "browser post carries no browserInfo fields".to_owned(),
            ));
        }

        debug!(fields = info.len(), "merging browser fingerprint");
        sale.extend(info);
        session.set_state(ThreeDSState::Submitted);
        Ok(session)
    }

    /// Moves a new session straight to [`ThreeDSState::Submitted`], for
    /// requests that already carry their fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] unless the session is in [`ThreeDSState::Init`].
    pub fn submit(&self, mut session: ThreeDSSession) -> Result<ThreeDSSession> {
        expect_state(&session, &[ThreeDSState::Init])?;
        session.set_state(ThreeDSState::Submitted);
        Ok(session)
    }

    /// Interprets a verified gateway response.
    ///
    /// An authentication-required code yields [`Step::Challenge`] with the
    /// ACS post to present; any other code ends the transaction with
    /// [`Step::Complete`]. The session's `threeDSRef` is taken from the
    /// response, or kept from an earlier one when the response omits it.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] if the session is not waiting for a response
    /// - [`GatewayError::InvalidResponse`] if `responseCode` is missing, or an
    ///   authentication-required response lacks `threeDSURL` or any `threeDSRef`
    /// - [`GatewayError::ChallengeLimitExceeded`] if the loop ran past the
    ///   configured bounds; the session is then terminal and dropped
    #[instrument(
        skip_all,
        fields(correlation_id = %session.correlation_id(), state = session.state().as_str())
    )]
    pub fn process_response(&self, mut session: ThreeDSSession, response: &FieldSet) -> Result<Step> {
        expect_state(&session, &[ThreeDSState::Submitted, ThreeDSState::ChallengePending])?;

        let code = ResponseCode::of(response)?;
        if code.is_terminal() {
            let outcome = Outcome::classify(response.clone())?;
            let state = match outcome {
                Outcome::Approved { .. } => ThreeDSState::Approved,
                Outcome::Declined { .. } => ThreeDSState::Declined,
                Outcome::Failed { .. } => ThreeDSState::Failed,
            };
            session.set_state(state);
            info!(code = code.value(), state = state.as_str(), "3DS transaction complete");
            return Ok(Step::Complete(outcome));
        }

        let iterations = session.record_iteration();
        if iterations > self.limits.max_iterations || session.elapsed() > self.limits.max_duration {
            session.set_state(ThreeDSState::Failed);
            warn!(iterations, elapsed_secs = session.elapsed().as_secs(), "3DS challenge bound exceeded");
            return Err(GatewayError::ChallengeLimitExceeded { iterations });
        }

        if let Some(three_ds_ref) = response.text(THREE_DS_REF).filter(|value| !value.is_empty()) {
            session.set_three_ds_ref(three_ds_ref.into_owned());
        }
        let three_ds_ref = session
            .three_ds_ref()
            .ok_or_else(|| GatewayError::InvalidResponse("missing threeDSRef".to_owned()))?
            .to_owned();

        let url = response
            .text(THREE_DS_URL)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| GatewayError::InvalidResponse("missing threeDSURL".to_owned()))?
            .into_owned();

        let mut fields = response.children(THREE_DS_REQUEST);
        let presentation = if fields.text(METHOD_DATA).is_some_and(|data| !data.is_empty()) {
            Presentation::Hidden
        } else {
            Presentation::Visible
        };
        fields.insert(THREE_DS_REF, three_ds_ref);

        session.set_state(ThreeDSState::ChallengePending);
        debug!(iterations, ?presentation, "3DS challenge issued");

        Ok(Step::Challenge { session, challenge: Challenge { url, fields, presentation } })
    }

    /// Builds the request that relays the ACS post-back to the gateway.
    ///
    /// The result carries `action`, `merchantID` and `threeDSRef` from the
    /// session, with every posted field nested under `threeDSResponse`.
    /// Prepare, sign and send it like any other request, then pass the
    /// response to [`process_response`](Self::process_response).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the session has no challenge
    /// pending or the post is empty.
    pub fn continuation_request(&self, session: &ThreeDSSession, acs_post: &FieldSet) -> Result<FieldSet> {
        expect_state(session, &[ThreeDSState::ChallengePending])?;
        if acs_post.is_empty() {
            return Err(GatewayError::InvalidInput("ACS post-back is empty".to_owned()));
        }
        let three_ds_ref = session.three_ds_ref().ok_or_else(|| {
            GatewayError::InvalidInput("session has no threeDSRef".to_owned())
        })?;

        let mut request = FieldSet::new();
        request.insert("action", session.action());
        request.insert("merchantID", session.merchant_id());
        request.insert(THREE_DS_REF, three_ds_ref);
        request.insert(THREE_DS_RESPONSE, acs_post.clone());
        Ok(request)
    }
}

fn expect_state(session: &ThreeDSSession, allowed: &[ThreeDSState]) -> Result<()> {
    if allowed.contains(&session.state()) {
        Ok(())
    } else {
        Err(GatewayError::InvalidInput(format!(
            "3DS session is {}, expected {}",
            session.state().as_str(),
            allowed.iter().map(|state| state.as_str()).collect::<Vec<_>>().join(" or ")
        )))
    }
}
