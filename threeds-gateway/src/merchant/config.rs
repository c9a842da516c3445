//! Merchant account configuration.
//!
//! This module defines the TOML-deserializable [`MerchantContext`]: the
//! merchant identity, shared secret and gateway endpoints every request is
//! prepared against.
//!
//! ```toml
//! merchant_id = "100856"
//! secret_env = "GATEWAY_SECRET"
//! direct_url = "https://gateway.example.com/direct/"
//! hosted_url = "https://gateway.example.com/hosted/"
//!
//! [transport]
//! timeout_secs = 30
//! ```

use std::{fmt, path::Path};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    transport::HttpConfig,
};

/// Sample Direct API endpoint.
pub const DEFAULT_DIRECT_URL: &str = "https://example.com/direct/";

/// Sample Hosted API endpoint.
pub const DEFAULT_HOSTED_URL: &str = "https://example.com/hosted/";

/// Merchant identity, secret and endpoints.
///
/// Set once at start-up and read-only afterwards. Individual requests may
/// still override the secret and endpoints; see
/// [`prepare_request`](super::prepare_request).
///
/// The [`Debug`] output redacts the secret and password.
#[derive(Clone, Deserialize)]
pub struct MerchantContext {
    /// Merchant account id or alias.
    pub merchant_id: String,

    /// Merchant account password, if the account has one.
    #[serde(default)]
    pub merchant_pwd: Option<String>,

    /// Shared signing secret. `None` means the account does not sign.
    #[serde(default)]
    pub secret: Option<String>,

    /// Name of an environment variable holding the secret.
    ///
    /// Resolved by [`MerchantContext::from_toml`] when `secret` is unset.
    #[serde(default)]
    pub secret_env: Option<String>,

    /// Direct API endpoint.
    #[serde(default = "default_direct_url")]
    pub direct_url: String,

    /// Hosted API endpoint.
    #[serde(default = "default_hosted_url")]
    pub hosted_url: String,

    /// HTTP transport settings.
    #[serde(default)]
    pub transport: HttpConfig,
}

impl fmt::Debug for MerchantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantContext")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_pwd", &self.merchant_pwd.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_env", &self.secret_env)
            .field("direct_url", &self.direct_url)
            .field("hosted_url", &self.hosted_url)
            .field("transport", &self.transport)
            .finish()
    }
}

impl MerchantContext {
    /// Creates a context for `merchant_id` with the sample endpoints and no secret.
    #[must_use]
    pub fn new(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            merchant_pwd: None,
            secret: None,
            secret_env: None,
            direct_url: default_direct_url(),
            hosted_url: default_hosted_url(),
            transport: HttpConfig::default(),
        }
    }

    /// The gateway's public 3DS test account.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::merchant::MerchantContext;
    ///
    /// let context = MerchantContext::test_account();
    /// assert_eq!(context.merchant_id, "100856");
    /// assert!(context.validate().is_ok());
    /// ```
    #[must_use]
    pub fn test_account() -> Self {
        Self::new("100856").with_secret("Threeds2Test60System")
    }

    /// Sets the shared secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the merchant password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.merchant_pwd = Some(password.into());
        self
    }

    /// Sets both gateway endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, direct_url: impl Into<String>, hosted_url: impl Into<String>) -> Self {
        self.direct_url = direct_url.into();
        self.hosted_url = hosted_url.into();
        self
    }

    /// Parses, resolves and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if the TOML is malformed, the
    /// `secret_env` variable is unset, or [`validate`](Self::validate) fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::merchant::MerchantContext;
    ///
    /// let context = MerchantContext::from_toml(
    ///     r#"
    ///     merchant_id = "100001"
    ///     secret = "pass"
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(context.direct_url, "https://example.com/direct/");
    /// ```
    pub fn from_toml(source: &str) -> Result<Self> {
        let mut context: Self = toml::from_str(source)
            .map_err(|e| GatewayError::ConfigError(format!("invalid merchant config: {e}")))?;
        context.resolve_secret()?;
        context.validate()?;
        Ok(context)
    }

    /// Reads a TOML configuration file; see [`from_toml`](Self::from_toml).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if the file cannot be read or
    /// its content is rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&source)
    }

    /// Validates the merchant configuration.
    ///
    /// This method checks for:
    /// - A non-empty merchant id
    /// - Endpoints that parse as HTTPS URLs
    /// - A well-formed `secret_env` name
    /// - Transport bounds (see [`HttpConfig::validate`])
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if any validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.merchant_id.trim().is_empty() {
            return Err(GatewayError::ConfigError("merchant_id cannot be empty".to_owned()));
        }

        validate_endpoint("direct_url", &self.direct_url)?;
        validate_endpoint("hosted_url", &self.hosted_url)?;

        if let Some(name) = &self.secret_env {
            validate_env_var_name(name)?;
        }

        self.transport.validate()
    }

    /// The configured secret, treating an empty string as none.
    #[must_use]
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|secret| !secret.is_empty())
    }

    fn resolve_secret(&mut self) -> Result<()> {
        if self.secret.is_some() {
            return Ok(());
        }
        if let Some(name) = &self.secret_env {
            validate_env_var_name(name)?;
            let value = std::env::var(name).map_err(|_| {
                GatewayError::ConfigError(format!("environment variable {name} is not set"))
            })?;
            self.secret = Some(value);
        }
        Ok(())
    }
}

fn default_direct_url() -> String {
    DEFAULT_DIRECT_URL.to_owned()
}

fn default_hosted_url() -> String {
    DEFAULT_HOSTED_URL.to_owned()
}

/// Validates a gateway endpoint URL.
fn validate_endpoint(name: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| GatewayError::ConfigError(format!("invalid {name} '{raw}': {e}")))?;

    if url.scheme() != "https" {
        return Err(GatewayError::ConfigError(format!(
            "{name} must use HTTPS, got: {}",
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates an environment variable name.
fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(GatewayError::ConfigError(
            "environment variable name cannot be empty".to_owned(),
        ));
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(GatewayError::ConfigError(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(GatewayError::ConfigError(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let context = MerchantContext::from_toml("merchant_id = \"100001\"").unwrap();
        assert_eq!(context.merchant_id, "100001");
        assert_eq!(context.direct_url, DEFAULT_DIRECT_URL);
        assert_eq!(context.hosted_url, DEFAULT_HOSTED_URL);
        assert!(context.secret.is_none());
        assert!(context.merchant_pwd.is_none());
        assert_eq!(context.transport, HttpConfig::default());
    }

    #[test]
    fn test_complete_toml() {
        let toml = r#"
            merchant_id = "100856"
            merchant_pwd = "pwd"
            secret = "Threeds2Test60System"
            direct_url = "https://gateway.example.com/direct/"
            hosted_url = "https://gateway.example.com/hosted/"

            [transport]
            timeout_secs = 20
            http_version = "http1"
        "#;

        let context = MerchantContext::from_toml(toml).unwrap();
        assert_eq!(context.merchant_pwd.as_deref(), Some("pwd"));
        assert_eq!(context.signing_secret(), Some("Threeds2Test60System"));
        assert_eq!(context.direct_url, "https://gateway.example.com/direct/");
        assert_eq!(context.transport.timeout_secs, 20);
    }

    #[test]
    fn test_missing_merchant_id() {
        let result = MerchantContext::from_toml("secret = \"x\"");
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_toml_syntax() {
        let result = MerchantContext::from_toml("merchant_id = ");
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_http_endpoint() {
        let context = MerchantContext::new("100001")
            .with_endpoints("http://gateway.example.com/direct/", DEFAULT_HOSTED_URL);
        let err = context.validate().unwrap_err();
        assert!(err.to_string().contains("direct_url must use HTTPS"));
    }

    #[test]
    fn test_validate_rejects_unparsable_endpoint() {
        let context = MerchantContext::new("100001").with_endpoints(DEFAULT_DIRECT_URL, "nope");
        assert!(matches!(context.validate(), Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_blank_merchant_id() {
        assert!(MerchantContext::new("  ").validate().is_err());
    }

    #[test]
    fn test_validate_env_var_name() {
        assert!(validate_env_var_name("GATEWAY_SECRET").is_ok());
        assert!(validate_env_var_name("_SECRET2").is_ok());
        assert!(validate_env_var_name("").is_err());
        assert!(validate_env_var_name("2SECRET").is_err());
        assert!(validate_env_var_name("SECRET-KEY").is_err());
    }

    #[test]
    fn test_secret_env_unset_is_config_error() {
        let toml = r#"
            merchant_id = "100001"
            secret_env = "THREEDS_GATEWAY_TEST_SECRET_THAT_IS_NEVER_SET"
        "#;
        let err = MerchantContext::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }

    #[test]
    fn test_explicit_secret_wins_over_secret_env() {
        let toml = r#"
            merchant_id = "100001"
            secret = "inline"
            secret_env = "THREEDS_GATEWAY_TEST_SECRET_THAT_IS_NEVER_SET"
        "#;
        let context = MerchantContext::from_toml(toml).unwrap();
        assert_eq!(context.signing_secret(), Some("inline"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let context = MerchantContext::test_account().with_password("hunter2");
        let debug = format!("{context:?}");
        assert!(debug.contains("100856"));
        assert!(!debug.contains("Threeds2Test60System"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_secret_is_no_secret() {
        let context = MerchantContext::new("100001").with_secret("");
        assert!(context.signing_secret().is_none());
    }
}
