//! Verification of signed gateway responses.

use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use super::{SIGNATURE_FIELD, signer::Signature, signer::sign};
use crate::{
    error::{GatewayError, Result, SignatureMismatchKind},
    fields::FieldSet,
};

/// Verifies a gateway response and returns it with the signature removed.
///
/// An absent or empty `secret` means the merchant account does not sign; the
/// response must then carry no signature either. With a secret configured,
/// the signature must be present and must match the digest recomputed over
/// the remaining fields (or over the listed subset, for a partial signature).
///
/// # Errors
///
/// - [`GatewayError::InvalidResponse`] if `responseCode` is absent
/// - [`GatewayError::SignatureMismatch`] with:
///   - [`SignatureMismatchKind::Unexpected`] when signed but no secret is configured
///   - [`SignatureMismatchKind::Missing`] when a secret is configured but the response is unsigned
///   - [`SignatureMismatchKind::Digest`] when the digests differ
///
/// # Examples
///
/// ```
/// use threeds_gateway::{
///     error::GatewayError,
///     fields::FieldSet,
///     signature::verify_response,
/// };
///
/// let unsigned = FieldSet::from([("responseCode", "0")]);
/// assert!(verify_response(unsigned.clone(), None).is_ok());
/// assert!(matches!(
///     verify_response(unsigned, Some("secret")),
///     Err(GatewayError::SignatureMismatch(_))
/// ));
/// ```
#[instrument(skip_all, fields(field_count = response.len()))]
pub fn verify_response(mut response: FieldSet, secret: Option<&str>) -> Result<FieldSet> {
    if !response.contains_key("responseCode") {
        return Err(GatewayError::InvalidResponse("missing responseCode".to_owned()));
    }

    let received = response
        .remove(SIGNATURE_FIELD)
        .and_then(|value| value.as_text().map(|text| text.into_owned()))
        .filter(|text| !text.is_empty());
    let secret = secret.filter(|secret| !secret.is_empty());

    match (secret, received) {
        (None, None) => Ok(response),
        (None, Some(_)) => Err(mismatch(SignatureMismatchKind::Unexpected)),
        (Some(_), None) => Err(mismatch(SignatureMismatchKind::Missing)),
        (Some(secret), Some(received)) => {
            let received = Signature::parse(&received);
            let expected = sign(&response, secret, &received.scope());

            if bool::from(expected.digest().as_bytes().ct_eq(received.digest().as_bytes())) {
                debug!(partial = received.fields().is_some(), "response signature verified");
                Ok(response)
            } else {
                Err(mismatch(SignatureMismatchKind::Digest))
            }
        }
    }
}

fn mismatch(kind: SignatureMismatchKind) -> GatewayError {
    warn!(kind = kind.as_str(), "rejecting incorrectly signed gateway response");
    GatewayError::SignatureMismatch(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignScope;

    const SECRET: &str = "Threeds2Test60System";

    fn signed(mut fields: FieldSet, scope: &SignScope) -> FieldSet {
        let signature = sign(&fields, SECRET, scope);
        fields.insert(SIGNATURE_FIELD, signature.to_string());
        fields
    }

    fn approved() -> FieldSet {
        FieldSet::from([
            ("responseCode", "0"),
            ("responseMessage", "AUTHCODE:123456"),
            ("amount", "1001"),
        ])
    }

    #[test]
    fn test_valid_signature_is_stripped() {
        let verified = verify_response(signed(approved(), &SignScope::All), Some(SECRET))
            .expect("signature should verify");
        assert_eq!(verified, approved());
    }

    #[test]
    fn test_missing_response_code_is_invalid() {
        let response = FieldSet::from([("responseMessage", "oops")]);
        let err = verify_response(response, None).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[test]
    fn test_unsigned_without_secret_passes() {
        assert!(verify_response(approved(), None).is_ok());
        assert!(verify_response(approved(), Some("")).is_ok());
    }

    #[test]
    fn test_signed_without_secret_is_unexpected() {
        let err = verify_response(signed(approved(), &SignScope::All), None).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Unexpected)));
        assert_eq!(err.to_string(), "Incorrectly signed response from Payment Gateway (1)");
    }

    #[test]
    fn test_unsigned_with_secret_is_missing() {
        let err = verify_response(approved(), Some(SECRET)).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Missing)));
        assert_eq!(err.to_string(), "Incorrectly signed response from Payment Gateway (2)");
    }

    #[test]
    fn test_empty_signature_counts_as_missing() {
        let mut response = approved();
        response.insert(SIGNATURE_FIELD, "");
        let err = verify_response(response, Some(SECRET)).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Missing)));
    }

    #[test]
    fn test_tampered_field_fails() {
        let mut response = signed(approved(), &SignScope::All);
        response.insert("amount", "1");
        let err = verify_response(response, Some(SECRET)).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Digest)));
        assert_eq!(err.to_string(), "Incorrectly signed response from Payment Gateway");
    }

    #[test]
    fn test_wrong_secret_fails() {
        let err = verify_response(signed(approved(), &SignScope::All), Some("other")).unwrap_err();
        assert!(matches!(err, GatewayError::SignatureMismatch(SignatureMismatchKind::Digest)));
    }

    #[test]
    fn test_partial_signature_tolerates_unlisted_changes() {
        let scope = SignScope::fields(["responseCode", "amount"]);
        let mut response = signed(approved(), &scope);
        response.insert("responseMessage", "changed in flight");
        response.insert("extra", "added");

        let verified = verify_response(response, Some(SECRET)).expect("partial signature");
        assert_eq!(verified.text("responseMessage").as_deref(), Some("changed in flight"));
    }

    #[test]
    fn test_partial_signature_detects_listed_changes() {
        let scope = SignScope::fields(["responseCode", "amount"]);
        let mut response = signed(approved(), &scope);
        response.insert("amount", "9999");
        assert!(verify_response(response, Some(SECRET)).is_err());
    }
}
