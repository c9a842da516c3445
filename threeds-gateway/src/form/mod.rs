//! Browser-side forms.
//!
//! Three flows hand control to the cardholder's browser: the Hosted payment
//! page, fingerprint collection, and the silent post to the ACS. Each is a
//! [`Form`] value; turning it into markup is a [`FormRenderer`]'s job, so
//! hosts can plug in their own templating. [`HtmlFormRenderer`] is a plain
//! fragment renderer.

use serde::Serialize;

use crate::fields::FieldSet;

mod html;

pub use html::HtmlFormRenderer;

/// Label used when no submit button is configured.
pub const DEFAULT_SUBMIT_TEXT: &str = "Pay Now";

/// The button that submits a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SubmitButton {
    /// `<input type="image">` with this image URL.
    Image(String),
    /// `<button>` with this raw inner markup.
    Html(String),
    /// `<input type="submit">` with this label.
    Text(String),
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self::Text(DEFAULT_SUBMIT_TEXT.to_owned())
    }
}

/// How the form gets submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// The cardholder presses the button.
    #[default]
    Manual,
    /// Submitted by script as soon as it loads.
    Auto,
    /// Fingerprint fields are filled in by script, then submitted.
    CaptureBrowserInfo,
}

/// A form to be rendered for the cardholder's browser.
///
/// # Examples
///
/// ```
/// use threeds_gateway::{
///     fields::FieldSet,
///     form::{Form, FormRenderer, HtmlFormRenderer, SubmitButton},
/// };
///
/// let form = Form::post("https://gateway.example.com/hosted/", FieldSet::from([("amount", "1001")]))
///     .with_submit(SubmitButton::Text("Pay".to_owned()));
///
/// let html = HtmlFormRenderer.render(&form);
/// assert!(html.contains(r#"<input type="hidden" name="amount" value="1001" />"#));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Form {
    /// Element id; required by script-driven submissions.
    pub id: Option<String>,
    /// Target URL.
    pub action: String,
    /// HTTP method, always `post` for gateway flows.
    pub method: &'static str,
    /// Browsing context (frame name) to submit into.
    pub target: Option<String>,
    /// Hidden fields; nested groups render as `parent[child]`.
    pub fields: FieldSet,
    /// Submit button, if one is shown.
    pub submit: Option<SubmitButton>,
    /// Submission behaviour.
    pub submission: Submission,
    /// Raw extra attributes for the `<form>` tag, inserted unescaped.
    pub form_attrs: Option<String>,
    /// Raw extra attributes for the submit button, inserted unescaped.
    pub submit_attrs: Option<String>,
}

impl Form {
    /// A POST form with no button.
    #[must_use]
    pub fn post(action: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            id: None,
            action: action.into(),
            method: "post",
            target: None,
            fields,
            submit: None,
            submission: Submission::Manual,
            form_attrs: None,
            submit_attrs: None,
        }
    }

    /// Sets the element id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the target frame.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the submit button.
    #[must_use]
    pub fn with_submit(mut self, submit: SubmitButton) -> Self {
        self.submit = Some(submit);
        self
    }

    /// Sets the submission behaviour.
    #[must_use]
    pub const fn with_submission(mut self, submission: Submission) -> Self {
        self.submission = submission;
        self
    }
}

/// Turns a [`Form`] into markup.
///
/// Implemented by the host for its own templating; [`HtmlFormRenderer`]
/// covers the plain case.
pub trait FormRenderer {
    /// Renders the form.
    fn render(&self, form: &Form) -> String;
}
