//! Browser fingerprint fields required for 3DS v2.

use crate::fields::FieldSet;

/// Parent name the fingerprint fields are nested under on the browser post.
pub const BROWSER_INFO_FIELD: &str = "browserInfo";

/// Fingerprint fields, in the order they are rendered.
pub const DEVICE_FIELDS: [&str; 11] = [
    "deviceChannel",
    "deviceIdentity",
    "deviceTimeZone",
    "deviceCapabilities",
    "deviceScreenResolution",
    "deviceAcceptContent",
    "deviceAcceptEncoding",
    "deviceAcceptLanguage",
    "deviceAcceptCharset",
    "deviceOperatingSystem",
    "deviceType",
];

/// Request headers the server side can fill fingerprint fields from.
///
/// Values the browser reports itself (screen, time zone, capabilities) are
/// overwritten by the capture script before the form is posted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserHeaders {
    /// `User-Agent`.
    pub user_agent: Option<String>,
    /// `Accept`.
    pub accept: Option<String>,
    /// `Accept-Encoding`.
    pub accept_encoding: Option<String>,
    /// `Accept-Language`.
    pub accept_language: Option<String>,
}

impl BrowserHeaders {
    /// Picks the relevant headers out of `(name, value)` pairs, matching names
    /// case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::threeds::BrowserHeaders;
    ///
    /// let headers = BrowserHeaders::from_pairs([("User-Agent", "Mozilla/5.0"), ("Host", "shop")]);
    /// assert_eq!(headers.user_agent.as_deref(), Some("Mozilla/5.0"));
    /// assert!(headers.accept.is_none());
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_ref().to_ascii_lowercase().as_str() {
                "user-agent" => &mut headers.user_agent,
                "accept" => &mut headers.accept,
                "accept-encoding" => &mut headers.accept_encoding,
                "accept-language" => &mut headers.accept_language,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        headers
    }

    /// Builds the default fingerprint group.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::threeds::{BrowserHeaders, DEVICE_FIELDS};
    ///
    /// let info = BrowserHeaders::default().device_fields();
    /// assert_eq!(info.keys().collect::<Vec<_>>(), DEVICE_FIELDS);
    /// assert_eq!(info.text("deviceScreenResolution").as_deref(), Some("1x1x1"));
    /// ```
    #[must_use]
    pub fn device_fields(&self) -> FieldSet {
        let header = |value: &Option<String>| value.clone().unwrap_or_default();

        let mut fields = FieldSet::new();
        fields.insert("deviceChannel", "browser");
        fields.insert("deviceIdentity", header(&self.user_agent));
        fields.insert("deviceTimeZone", "0");
        fields.insert("deviceCapabilities", "");
        fields.insert("deviceScreenResolution", "1x1x1");
        fields.insert("deviceAcceptContent", header(&self.accept));
        fields.insert("deviceAcceptEncoding", header(&self.accept_encoding));
        fields.insert("deviceAcceptLanguage", header(&self.accept_language));
        fields.insert("deviceAcceptCharset", "");
        fields.insert("deviceOperatingSystem", "win");
        fields.insert("deviceType", "desktop");
        fields
    }
}

/// Extracts the fingerprint the browser posted back.
///
/// Accepts both flat `browserInfo[deviceType]` names (a parsed form post) and
/// a nested `browserInfo` group.
#[must_use]
pub fn posted_browser_info(post: &FieldSet) -> FieldSet {
    post.children(BROWSER_INFO_FIELD)
}
