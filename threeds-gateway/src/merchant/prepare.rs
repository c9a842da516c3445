//! Request preparation: defaults in, overrides and echo fields out.

use std::fmt;

use tracing::{debug, instrument};

use super::MerchantContext;
use crate::{
    error::{GatewayError, Result},
    fields::FieldSet,
};

/// Fields a previous response may carry that must never be sent back.
pub const ECHO_FIELDS: &[&str] = &[
    "responseCode",
    "responseMessage",
    "responseStatus",
    "state",
    "signature",
    "merchantAlias",
    "merchantID2",
];

/// Per-request override of the merchant secret.
pub const SECRET_OVERRIDE: &str = "merchantSecret";
/// Per-request override of the Direct API endpoint.
pub const DIRECT_URL_OVERRIDE: &str = "directUrl";
/// Per-request override of the Hosted API endpoint.
pub const HOSTED_URL_OVERRIDE: &str = "hostedUrl";

/// Settings resolved for one request.
///
/// Built from the [`MerchantContext`] and any overrides the caller embedded
/// in the field set.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestSettings {
    /// Secret to sign the request and verify the response with.
    pub secret: Option<String>,
    /// Direct API endpoint.
    pub direct_url: String,
    /// Hosted API endpoint.
    pub hosted_url: String,
}

impl RequestSettings {
    /// The secret, treating an empty string as none.
    #[must_use]
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|secret| !secret.is_empty())
    }
}

impl fmt::Debug for RequestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("direct_url", &self.direct_url)
            .field("hosted_url", &self.hosted_url)
            .finish()
    }
}

/// Prepares `request` for sending and resolves its settings.
///
/// In order:
/// 1. `action` must be present.
/// 2. `merchantID` and `merchantPwd` are filled from `context` when absent.
/// 3. `merchantSecret`, `directUrl` and `hostedUrl` are moved out of the
///    request into the returned [`RequestSettings`].
/// 4. [`ECHO_FIELDS`] are removed.
///
/// No other field is validated. On error `request` is left unchanged.
///
/// # Errors
///
/// - [`GatewayError::MissingField`] if `action` is absent, or `merchantID`
///   is absent and the context has none
/// - [`GatewayError::InvalidInput`] if an override is not a plain value
///
/// # Examples
///
/// ```
/// use threeds_gateway::{
///     fields::FieldSet,
///     merchant::{MerchantContext, prepare_request},
/// };
///
/// let context = MerchantContext::new("100001").with_secret("pass");
/// let mut request = FieldSet::from([
///     ("action", "SALE"),
///     ("merchantSecret", "other"),
///     ("responseCode", "0"),
/// ]);
///
/// let settings = prepare_request(&mut request, &context).unwrap();
/// assert_eq!(settings.secret.as_deref(), Some("other"));
/// assert_eq!(request.text("merchantID").as_deref(), Some("100001"));
/// assert!(!request.contains_key("merchantSecret"));
/// assert!(!request.contains_key("responseCode"));
/// ```
#[instrument(skip_all, fields(field_count = request.len()))]
pub fn prepare_request(request: &mut FieldSet, context: &MerchantContext) -> Result<RequestSettings> {
    if !request.contains_key("action") {
        return Err(GatewayError::MissingField("action".to_owned()));
    }
    if context.merchant_id.is_empty() && !request.contains_key("merchantID") {
        return Err(GatewayError::MissingField("merchantID".to_owned()));
    }

    let settings = RequestSettings {
        secret: read_override(request, SECRET_OVERRIDE)?.or_else(|| context.secret.clone()),
        direct_url: read_override(request, DIRECT_URL_OVERRIDE)?
            .unwrap_or_else(|| context.direct_url.clone()),
        hosted_url: read_override(request, HOSTED_URL_OVERRIDE)?
            .unwrap_or_else(|| context.hosted_url.clone()),
    };

    if !context.merchant_id.is_empty() {
        request.insert_if_absent("merchantID", context.merchant_id.as_str());
    }
    if let Some(password) = &context.merchant_pwd {
        request.insert_if_absent("merchantPwd", password.as_str());
    }
    request.retain(|name, _| {
        ![SECRET_OVERRIDE, DIRECT_URL_OVERRIDE, HOSTED_URL_OVERRIDE].contains(&name)
            && !ECHO_FIELDS.contains(&name)
    });

    debug!(signed = settings.signing_secret().is_some(), "request prepared");
    Ok(settings)
}

fn read_override(request: &FieldSet, name: &str) -> Result<Option<String>> {
    let Some(value) = request.get(name) else {
        return Ok(None);
    };
    value
        .as_text()
        .map(|text| Some(text.into_owned()))
        .ok_or_else(|| GatewayError::InvalidInput(format!("'{name}' must be a plain value")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MerchantContext {
        MerchantContext::new("100856").with_secret("Threeds2Test60System")
    }

    #[test]
    fn test_missing_action() {
        let mut request = FieldSet::from([("amount", "1001")]);
        let err = prepare_request(&mut request, &context()).unwrap_err();
        assert!(matches!(err, GatewayError::MissingField(ref field) if field == "action"));
    }

    #[test]
    fn test_merchant_id_filled_when_absent() {
        let mut request = FieldSet::from([("action", "SALE")]);
        prepare_request(&mut request, &context()).unwrap();
        assert_eq!(request.text("merchantID").as_deref(), Some("100856"));
        assert!(!request.contains_key("merchantPwd"));
    }

    #[test]
    fn test_merchant_id_in_request_is_kept() {
        let mut request = FieldSet::from([("action", "SALE"), ("merchantID", "100001")]);
        prepare_request(&mut request, &context()).unwrap();
        assert_eq!(request.text("merchantID").as_deref(), Some("100001"));
    }

    #[test]
    fn test_missing_merchant_id_everywhere() {
        let mut request = FieldSet::from([("action", "SALE")]);
        let err = prepare_request(&mut request, &MerchantContext::new("")).unwrap_err();
        assert!(matches!(err, GatewayError::MissingField(ref field) if field == "merchantID"));
    }

    #[test]
    fn test_password_filled_when_configured() {
        let mut request = FieldSet::from([("action", "SALE")]);
        prepare_request(&mut request, &context().with_password("pwd")).unwrap();
        assert_eq!(request.text("merchantPwd").as_deref(), Some("pwd"));

        let mut request = FieldSet::from([("action", "SALE"), ("merchantPwd", "mine")]);
        prepare_request(&mut request, &context().with_password("pwd")).unwrap();
        assert_eq!(request.text("merchantPwd").as_deref(), Some("mine"));
    }

    #[test]
    fn test_settings_default_to_context() {
        let mut request = FieldSet::from([("action", "SALE")]);
        let settings = prepare_request(&mut request, &context()).unwrap();
        assert_eq!(settings.signing_secret(), Some("Threeds2Test60System"));
        assert_eq!(settings.direct_url, "https://example.com/direct/");
        assert_eq!(settings.hosted_url, "https://example.com/hosted/");
    }

    #[test]
    fn test_overrides_are_extracted_and_removed() {
        let mut request = FieldSet::from([
            ("action", "SALE"),
            ("merchantSecret", "per-request"),
            ("directUrl", "https://other.example.com/direct/"),
            ("hostedUrl", "https://other.example.com/hosted/"),
        ]);
        let settings = prepare_request(&mut request, &context()).unwrap();

        assert_eq!(settings.secret.as_deref(), Some("per-request"));
        assert_eq!(settings.direct_url, "https://other.example.com/direct/");
        assert_eq!(settings.hosted_url, "https://other.example.com/hosted/");
        for name in [SECRET_OVERRIDE, DIRECT_URL_OVERRIDE, HOSTED_URL_OVERRIDE] {
            assert!(!request.contains_key(name), "{name} must not be sent");
        }
    }

    #[test]
    fn test_group_override_is_invalid() {
        let mut request = FieldSet::from([("action", "SALE")]);
        request.insert("merchantSecret", FieldSet::from([("a", "b")]));
        let err = prepare_request(&mut request, &context()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[test]
    fn test_rejected_request_is_left_unchanged() {
        let mut request = FieldSet::from([("action", "SALE"), ("directUrl", "https://other.example.com/")]);
        request.insert("hostedUrl", FieldSet::from([("a", "b")]));
        let before = request.clone();

        let err = prepare_request(&mut request, &context().with_password("pwd")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(ref msg) if msg.contains("hostedUrl")));
        assert_eq!(request, before);

        let mut request = FieldSet::from([("action", "SALE"), ("responseCode", "0")]);
        let before = request.clone();
        let context = MerchantContext::new("").with_password("pwd");
        assert!(matches!(prepare_request(&mut request, &context), Err(GatewayError::MissingField(_))));
        assert_eq!(request, before);
    }

    #[test]
    fn test_echo_fields_are_stripped() {
        let mut request = FieldSet::from([("action", "SALE"), ("amount", "1001")]);
        for name in ECHO_FIELDS {
            request.insert(*name, "echo");
        }
        prepare_request(&mut request, &context()).unwrap();

        for name in ECHO_FIELDS {
            assert!(!request.contains_key(name), "{name} must be stripped");
        }
        assert_eq!(request.keys().collect::<Vec<_>>(), ["action", "amount", "merchantID"]);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut request = FieldSet::from([("action", "SALE")]);
        let settings = prepare_request(&mut request, &context()).unwrap();
        assert!(!format!("{settings:?}").contains("Threeds2Test60System"));
    }
}
