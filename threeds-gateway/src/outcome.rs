//! Gateway response codes and terminal transaction outcomes.

use serde::Serialize;

use crate::{
    error::{GatewayError, Result},
    fields::FieldSet,
};

/// A gateway `responseCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i64")]
pub enum ResponseCode {
    /// `0`: transaction successful.
    Success,
    /// `5`: do not honour; the issuer declined.
    DoNotHonor,
    /// `85`: no reason to decline; a verify-style action succeeded.
    NoReasonToDecline,
    /// `65802` (`0x1010A`): 3DS authentication required.
    AuthenticationRequired,
    /// Any other code.
    Other(i64),
}

impl ResponseCode {
    /// Numeric value of `SUCCESS`.
    pub const SUCCESS: i64 = 0;
    /// Numeric value of `DO_NOT_HONOR`.
    pub const DO_NOT_HONOR: i64 = 5;
    /// Numeric value of `NO_REASON_TO_DECLINE`.
    pub const NO_REASON_TO_DECLINE: i64 = 85;
    /// Numeric value of `3DS_AUTHENTICATION_REQUIRED`.
    pub const AUTHENTICATION_REQUIRED: i64 = 0x1010A;

    /// Reads `responseCode` from a response.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResponse`] if the field is absent or not an integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::{fields::FieldSet, outcome::ResponseCode};
    ///
    /// let response = FieldSet::from([("responseCode", "65802")]);
    /// assert_eq!(ResponseCode::of(&response).unwrap(), ResponseCode::AuthenticationRequired);
    /// ```
    pub fn of(response: &FieldSet) -> Result<Self> {
        let raw = response
            .text("responseCode")
            .ok_or_else(|| GatewayError::InvalidResponse("missing responseCode".to_owned()))?;
        raw.trim()
            .parse::<i64>()
            .map(Self::from)
            .map_err(|_| GatewayError::InvalidResponse(format!("non-numeric responseCode '{raw}'")))
    }

    /// The numeric code.
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Success => Self::SUCCESS,
            Self::DoNotHonor => Self::DO_NOT_HONOR,
            Self::NoReasonToDecline => Self::NO_REASON_TO_DECLINE,
            Self::AuthenticationRequired => Self::AUTHENTICATION_REQUIRED,
            Self::Other(code) => code,
        }
    }

    /// Returns true for every code but [`AuthenticationRequired`](Self::AuthenticationRequired).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::AuthenticationRequired)
    }
}

impl From<i64> for ResponseCode {
    fn from(code: i64) -> Self {
        match code {
            Self::SUCCESS => Self::Success,
            Self::DO_NOT_HONOR => Self::DoNotHonor,
            Self::NO_REASON_TO_DECLINE => Self::NoReasonToDecline,
            Self::AUTHENTICATION_REQUIRED => Self::AuthenticationRequired,
            other => Self::Other(other),
        }
    }
}

impl From<ResponseCode> for i64 {
    fn from(code: ResponseCode) -> Self {
        code.value()
    }
}

/// Final result of a verified gateway response.
///
/// Declines and failures are ordinary outcomes, not errors. Every variant
/// keeps the verified response so callers can read `xref`, `authorisationCode`
/// and the like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The transaction or verification succeeded.
    Approved {
        /// `0` or `85`.
        code: ResponseCode,
        /// The verified response.
        response: FieldSet,
    },
    /// The issuer declined.
    Declined {
        /// The gateway's `responseMessage`.
        message: String,
        /// The verified response.
        response: FieldSet,
    },
    /// Any other non-success code.
    Failed {
        /// The gateway's `responseCode`.
        code: ResponseCode,
        /// The gateway's `responseMessage`.
        message: String,
        /// The verified response.
        response: FieldSet,
    },
}

impl Outcome {
    /// Classifies a verified response.
    ///
    /// [`ResponseCode::AuthenticationRequired`] is not terminal; it is
    /// classified as [`Outcome::Failed`] here and should instead be handed to
    /// the [`ContinuationEngine`](crate::threeds::ContinuationEngine).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResponse`] if `responseCode` is absent or malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::{fields::FieldSet, outcome::Outcome};
    ///
    /// let declined = FieldSet::from([("responseCode", "5"), ("responseMessage", "DECLINED")]);
    /// assert!(matches!(Outcome::classify(declined).unwrap(), Outcome::Declined { .. }));
    /// ```
    pub fn classify(response: FieldSet) -> Result<Self> {
        let code = ResponseCode::of(&response)?;
        let message = response.text("responseMessage").map(|m| m.into_owned()).unwrap_or_default();

        Ok(match code {
            ResponseCode::Success | ResponseCode::NoReasonToDecline => {
                Self::Approved { code, response }
            }
            ResponseCode::DoNotHonor => Self::Declined { message, response },
            ResponseCode::AuthenticationRequired | ResponseCode::Other(_) => {
                Self::Failed { code, message, response }
            }
        })
    }

    /// Returns true for [`Outcome::Approved`].
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// The verified response behind this outcome.
    #[must_use]
    pub const fn response(&self) -> &FieldSet {
        match self {
            Self::Approved { response, .. }
            | Self::Declined { response, .. }
            | Self::Failed { response, .. } => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: &str, message: &str) -> FieldSet {
        FieldSet::from([("responseCode", code), ("responseMessage", message)])
    }

    #[test]
    fn test_response_code_mapping() {
        assert_eq!(ResponseCode::from(0), ResponseCode::Success);
        assert_eq!(ResponseCode::from(5), ResponseCode::DoNotHonor);
        assert_eq!(ResponseCode::from(85), ResponseCode::NoReasonToDecline);
        assert_eq!(ResponseCode::from(65802), ResponseCode::AuthenticationRequired);
        assert_eq!(ResponseCode::from(66311), ResponseCode::Other(66311));
        assert_eq!(ResponseCode::AuthenticationRequired.value(), 65802);
    }

    #[test]
    fn test_response_code_of() {
        assert_eq!(ResponseCode::of(&response("0", "")).unwrap(), ResponseCode::Success);
        assert!(matches!(
            ResponseCode::of(&FieldSet::new()),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            ResponseCode::of(&response("abc", "")),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_only_auth_required_is_not_terminal() {
        assert!(!ResponseCode::AuthenticationRequired.is_terminal());
        assert!(ResponseCode::Success.is_terminal());
        assert!(ResponseCode::Other(1).is_terminal());
    }

    #[test]
    fn test_classify_approved() {
        let outcome = Outcome::classify(response("0", "AUTHCODE:123456")).unwrap();
        assert!(outcome.is_approved());
        assert_eq!(outcome.response().text("responseMessage").as_deref(), Some("AUTHCODE:123456"));

        let verified = Outcome::classify(response("85", "NO REASON TO DECLINE")).unwrap();
        assert!(matches!(verified, Outcome::Approved { code: ResponseCode::NoReasonToDecline, .. }));
    }

    #[test]
    fn test_classify_declined() {
        let outcome = Outcome::classify(response("5", "CARD DECLINED")).unwrap();
        assert!(matches!(outcome, Outcome::Declined { ref message, .. } if message == "CARD DECLINED"));
    }

    #[test]
    fn test_classify_failed_keeps_code_and_message() {
        let outcome = Outcome::classify(response("66311", "INVALID CARDNUMBER")).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Failed { code: ResponseCode::Other(66311), ref message, .. } if message == "INVALID CARDNUMBER"
        ));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = Outcome::classify(response("5", "DECLINED")).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "declined");
        assert_eq!(json["response"]["responseCode"], "5");
    }
}
