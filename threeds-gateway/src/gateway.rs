//! Gateway client tying preparation, signing, transport and verification together.
//!
//! [`Gateway`] covers the three integration styles of the gateway:
//!
//! - **Direct**: [`Gateway::direct_request`] posts a signed request from the
//!   server and returns the verified response.
//! - **Hosted**: [`Gateway::hosted_request`] returns a signed [`Form`] that
//!   the cardholder's browser posts to the hosted payment page.
//! - **3DS**: [`Gateway::collect_browser_info`] and [`Gateway::advance`]
//!   feed the [`ContinuationEngine`].

use tracing::{debug, info, instrument};

pub use crate::outcome::Outcome;
use crate::{
    encoding::encode,
    error::{GatewayError, Result},
    fields::FieldSet,
    form::{Form, SubmitButton, Submission},
    merchant::{MerchantContext, RequestSettings, prepare_request},
    signature::{SIGNATURE_FIELD, SignScope, sign, verify_response},
    threeds::{BROWSER_INFO_FIELD, BrowserHeaders, ContinuationEngine, Step, ThreeDSSession},
    transport::{HttpTransport, Transport},
};

/// Field the hosted page redirects the cardholder back to.
const REDIRECT_URL_FIELD: &str = "redirectURL";

/// Id of the fingerprint collection form.
const BROWSER_INFO_FORM_ID: &str = "collectBrowserInfo";

/// Options for [`Gateway::hosted_request`].
#[derive(Debug, Clone, Default)]
pub struct HostedOptions {
    /// Fields to sign. `None` signs every field with a partial marker listing
    /// them all, as the hosted page expects.
    pub scope: Option<SignScope>,
    /// Submit button; `None` uses the default text button.
    pub submit: Option<SubmitButton>,
    /// Raw extra attributes for the `<form>` tag.
    pub form_attrs: Option<String>,
    /// Raw extra attributes for the submit button.
    pub submit_attrs: Option<String>,
}

/// Options for [`Gateway::collect_browser_info`].
#[derive(Debug, Clone)]
pub struct BrowserInfoOptions {
    /// Where the browser posts its fingerprint; defaults to the current page.
    pub action: String,
    /// Extra hidden fields posted alongside the fingerprint.
    pub form_data: FieldSet,
    /// Raw extra attributes for the `<form>` tag.
    pub form_attrs: Option<String>,
}

impl Default for BrowserInfoOptions {
    fn default() -> Self {
        Self { action: "?".to_owned(), form_data: FieldSet::new(), form_attrs: None }
    }
}

/// Client for one merchant account.
///
/// Stateless apart from its configuration; share it across tasks freely.
/// 3DS state lives in [`ThreeDSSession`] values owned by the caller.
///
/// # Examples
///
/// ```no_run
/// use threeds_gateway::{fields::FieldSet, gateway::Gateway, merchant::MerchantContext};
///
/// # async fn example() -> threeds_gateway::error::Result<()> {
/// let gateway = Gateway::from_context(MerchantContext::test_account())?;
///
/// let response = gateway
///     .direct_request(FieldSet::from([
///         ("action", "SALE"),
///         ("type", "1"),
///         ("amount", "1001"),
///         ("transactionUnique", "order-42"),
///     ]))
///     .await?;
/// println!("{:?}", response.text("responseMessage"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Gateway<T> {
    context: MerchantContext,
    transport: T,
}

impl Gateway<HttpTransport> {
    /// Creates a client using HTTPS with the context's transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if the context is invalid, or an
    /// error if the HTTP client cannot be built.
    pub fn from_context(context: MerchantContext) -> Result<Self> {
        context.validate()?;
        let transport = HttpTransport::with_config(&context.transport)?;
        Ok(Self { context, transport })
    }
}

impl<T: Transport> Gateway<T> {
    /// Creates a client over any transport.
    #[must_use]
    pub const fn new(context: MerchantContext, transport: T) -> Self {
        Self { context, transport }
    }

    /// The merchant configuration.
    #[must_use]
    pub const fn context(&self) -> &MerchantContext {
        &self.context
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a request to the Direct API and returns the verified response.
    ///
    /// The request is prepared (see [`prepare_request`]), signed when a secret
    /// is configured, and posted to the direct URL. The response's signature
    /// is checked and removed before it is returned. Declines are returned as
    /// ordinary responses; use [`Outcome::classify`] to interpret them.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MissingField`] / [`GatewayError::InvalidInput`] before
    ///   anything is sent
    /// - [`GatewayError::TransportFailure`] / [`GatewayError::HttpError`] if
    ///   the round-trip fails
    /// - [`GatewayError::InvalidResponse`] / [`GatewayError::SignatureMismatch`]
    ///   if the response cannot be trusted
    #[instrument(skip_all, fields(action = ?request.text("action"), protocol = self.transport.protocol_name()))]
    pub async fn direct_request(&self, mut request: FieldSet) -> Result<FieldSet> {
        let settings = prepare_request(&mut request, &self.context)?;
        sign_request(&mut request, &settings, &SignScope::All);

        let body = encode(&request);
        let response = self.transport.post_form(&settings.direct_url, body.as_bytes()).await?;
        debug!(status = response.status, bytes = response.body.len(), "direct response received");

        let verified = verify_response(FieldSet::from_urlencoded(&response.body), settings.signing_secret())?;
        info!(response_code = ?verified.text("responseCode"), "direct request complete");
        Ok(verified)
    }

    /// Builds the signed form that sends the cardholder to the hosted page.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingField`] if `action`, `merchantID` or
    /// `redirectURL` is absent, or [`GatewayError::InvalidInput`] for a
    /// malformed override.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::{
    ///     fields::FieldSet,
    ///     form::{FormRenderer, HtmlFormRenderer},
    ///     gateway::{Gateway, HostedOptions},
    ///     merchant::MerchantContext,
    /// };
    ///
    /// let gateway = Gateway::from_context(MerchantContext::test_account()).unwrap();
    /// let form = gateway
    ///     .hosted_request(
    ///         FieldSet::from([
    ///             ("action", "SALE"),
    ///             ("amount", "1001"),
    ///             ("redirectURL", "https://shop.example.com/return"),
    ///         ]),
    ///         &HostedOptions::default(),
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(form.action, "https://example.com/hosted/");
    /// assert!(HtmlFormRenderer.render(&form).contains("name=\"signature\""));
    /// ```
    #[instrument(skip_all, fields(action = ?request.text("action")))]
    pub fn hosted_request(&self, mut request: FieldSet, options: &HostedOptions) -> Result<Form> {
        let settings = prepare_request(&mut request, &self.context)?;
        if !request.contains_key(REDIRECT_URL_FIELD) {
            return Err(GatewayError::MissingField(REDIRECT_URL_FIELD.to_owned()));
        }

        let scope = options.scope.clone().unwrap_or_else(|| SignScope::every_field(&request));
        sign_request(&mut request, &settings, &scope);

        let mut form = Form::post(settings.hosted_url, request)
            .with_submit(options.submit.clone().unwrap_or_default());
        form.form_attrs.clone_from(&options.form_attrs);
        form.submit_attrs.clone_from(&options.submit_attrs);
        Ok(form)
    }

    /// Builds the self-posting form that captures the browser fingerprint.
    ///
    /// Fields are filled with server-side defaults from `headers`; the
    /// [`Submission::CaptureBrowserInfo`] renderer script overwrites them with
    /// the values the browser reports before posting. Feed the post to
    /// [`ContinuationEngine::submit_browser_info`].
    #[must_use]
    pub fn collect_browser_info(&self, headers: &BrowserHeaders, options: &BrowserInfoOptions) -> Form {
        let mut fields = FieldSet::new();
        fields.insert(BROWSER_INFO_FIELD, headers.device_fields());
        fields.extend(options.form_data.clone());

        let mut form = Form::post(options.action.clone(), fields)
            .with_id(BROWSER_INFO_FORM_ID)
            .with_submission(Submission::CaptureBrowserInfo);
        form.form_attrs.clone_from(&options.form_attrs);
        form
    }

    /// Sends `request` through the Direct API and hands the verified
    /// response to `engine`.
    ///
    /// Use it for the initial SALE (with the session
    /// [`Submitted`](crate::threeds::ThreeDSState::Submitted)) and for every
    /// [`continuation_request`](ContinuationEngine::continuation_request).
    ///
    /// # Errors
    ///
    /// Any error of [`direct_request`](Self::direct_request) or
    /// [`ContinuationEngine::process_response`].
    pub async fn advance(
        &self,
        engine: &ContinuationEngine,
        session: ThreeDSSession,
        request: FieldSet,
    ) -> Result<Step> {
        let response = self.direct_request(request).await?;
        engine.process_response(session, &response)
    }
}

fn sign_request(request: &mut FieldSet, settings: &RequestSettings, scope: &SignScope) {
    if let Some(secret) = settings.signing_secret() {
        let signature = sign(request, secret, scope);
        request.insert(SIGNATURE_FIELD, signature.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        error::SignatureMismatchKind,
        transport::TransportResponse,
    };

    /// Records requests and answers with a fixed body.
    struct Replay {
        body: Vec<u8>,
        seen: Mutex<Vec<(String, FieldSet)>>,
    }

    impl Replay {
        fn new(body: &str) -> Self {
            Self { body: body.as_bytes().to_vec(), seen: Mutex::new(Vec::new()) }
        }

        fn last(&self) -> (String, FieldSet) {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Replay {
        async fn post_form<'a>(&'a self, url: &'a str, body: &'a [u8]) -> Result<TransportResponse> {
            self.seen.lock().unwrap().push((url.to_owned(), FieldSet::from_urlencoded(body)));
            Ok(TransportResponse { status: 200, body: self.body.clone(), headers: vec![] })
        }

        fn protocol_name(&self) -> &'static str {
            "replay"
        }
    }

    fn signed_body(fields: &FieldSet, secret: &str) -> String {
        let mut fields = fields.clone();
        let signature = sign(&fields, secret, &SignScope::All);
        fields.insert(SIGNATURE_FIELD, signature.to_string());
        encode(&fields)
    }

    #[tokio::test]
    async fn test_direct_request_signs_and_strips_overrides() {
        let response = FieldSet::from([("responseCode", "0"), ("responseMessage", "OK")]);
        let transport = Replay::new(&signed_body(&response, "S"));
        let gateway = Gateway::new(MerchantContext::new("100856").with_secret("S"), transport);

        let verified = gateway
            .direct_request(FieldSet::from([
                ("action", "SALE"),
                ("amount", "1001"),
                ("directUrl", "https://other.example.com/direct/"),
            ]))
            .await
            .unwrap();
        assert_eq!(verified, response);

        let (url, sent) = gateway.transport().last();
        assert_eq!(url, "https://other.example.com/direct/");
        assert!(!sent.contains_key("directUrl"));
        assert_eq!(sent.text("merchantID").as_deref(), Some("100856"));

        let mut unsigned = sent.clone();
        let signature = unsigned.remove(SIGNATURE_FIELD).and_then(|v| v.as_text().map(|t| t.into_owned()));
        assert_eq!(signature, Some(sign(&unsigned, "S", &SignScope::All).to_string()));
    }

    #[tokio::test]
    async fn test_direct_request_without_secret_sends_no_signature() {
        let transport = Replay::new("responseCode=0");
        let gateway = Gateway::new(MerchantContext::new("100856"), transport);

        gateway.direct_request(FieldSet::from([("action", "SALE")])).await.unwrap();
        assert!(!gateway.transport().last().1.contains_key(SIGNATURE_FIELD));
    }

    #[tokio::test]
    async fn test_direct_request_rejects_unsigned_response() {
        let transport = Replay::new("responseCode=0");
        let gateway = Gateway::new(MerchantContext::new("100856").with_secret("S"), transport);

        let err = gateway.direct_request(FieldSet::from([("action", "SALE")])).await.unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Missing)));
    }

    #[tokio::test]
    async fn test_missing_action_fails_before_sending() {
        let transport = Replay::new("responseCode=0");
        let gateway = Gateway::new(MerchantContext::new("100856"), transport);

        let err = gateway.direct_request(FieldSet::from([("amount", "1")])).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingField(ref f) if f == "action"));
        assert!(gateway.transport().seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_hosted_request_requires_redirect() {
        let gateway = Gateway::new(MerchantContext::test_account(), Replay::new(""));
        let err = gateway
            .hosted_request(FieldSet::from([("action", "SALE")]), &HostedOptions::default())
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingField(ref f) if f == "redirectURL"));
    }

    #[test]
    fn test_hosted_request_partial_signature_lists_every_field() {
        let context = MerchantContext::new("100856").with_secret("S");
        let gateway = Gateway::new(context, Replay::new(""));
        let form = gateway
            .hosted_request(
                FieldSet::from([
                    ("action", "SALE"),
                    ("amount", "1001"),
                    ("redirectURL", "https://shop.example.com/return"),
                ]),
                &HostedOptions {
                    submit: Some(SubmitButton::Image("https://shop.example.com/pay.png".to_owned())),
                    form_attrs: Some("class=\"pay\"".to_owned()),
                    ..HostedOptions::default()
                },
            )
            .unwrap();

        let signature = form.fields.text(SIGNATURE_FIELD).unwrap();
        let (_, listed) = signature.split_once('|').unwrap();
        assert_eq!(listed, "action,amount,redirectURL,merchantID");
        assert!(matches!(form.submit, Some(SubmitButton::Image(_))));
        assert_eq!(form.form_attrs.as_deref(), Some("class=\"pay\""));
        assert_eq!(form.action, "https://example.com/hosted/");
    }

    #[test]
    fn test_hosted_request_full_scope_has_no_marker() {
        let gateway = Gateway::new(MerchantContext::new("1").with_secret("S"), Replay::new(""));
        let form = gateway
            .hosted_request(
                FieldSet::from([("action", "SALE"), ("redirectURL", "https://shop.example.com/")]),
                &HostedOptions { scope: Some(SignScope::All), ..HostedOptions::default() },
            )
            .unwrap();
        assert!(!form.fields.text(SIGNATURE_FIELD).unwrap().contains('|'));
        assert_eq!(form.submit, Some(SubmitButton::default()));
    }

    #[test]
    fn test_collect_browser_info_form() {
        let gateway = Gateway::new(MerchantContext::test_account(), Replay::new(""));
        let headers = BrowserHeaders::from_pairs([("User-Agent", "Mozilla/5.0")]);
        let options = BrowserInfoOptions {
            form_data: FieldSet::from([("orderRef", "42")]),
            ..BrowserInfoOptions::default()
        };
        let form = gateway.collect_browser_info(&headers, &options);

        assert_eq!(form.action, "?");
        assert_eq!(form.id.as_deref(), Some("collectBrowserInfo"));
        assert_eq!(form.submission, Submission::CaptureBrowserInfo);
        let flat = form.fields.flatten();
        assert!(flat.contains(&("browserInfo[deviceIdentity]".to_owned(), "Mozilla/5.0".to_owned())));
        assert!(flat.contains(&("orderRef".to_owned(), "42".to_owned())));
    }
}
