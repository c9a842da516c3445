use std::fmt::Write as _;

use super::{Form, FormRenderer, SubmitButton, Submission};

/// Id given to script-submitted forms that have none.
const DEFAULT_SCRIPT_FORM_ID: &str = "silentPost";

const CAPTURE_SCRIPT: &str = r"
var screen_width = (window && window.screen ? window.screen.width : '0');
var screen_height = (window && window.screen ? window.screen.height : '0');
var screen_depth = (window && window.screen ? window.screen.colorDepth : '0');
var identity = (window && window.navigator ? window.navigator.userAgent : '');
var language = (window && window.navigator ? (window.navigator.language ? window.navigator.language : window.navigator.browserLanguage) : '');
var timezone = (new Date()).getTimezoneOffset();
var java = (window && window.navigator && navigator.javaEnabled ? navigator.javaEnabled() : false);
fields['browserInfo[deviceIdentity]'].value = identity;
fields['browserInfo[deviceTimeZone]'].value = timezone;
fields['browserInfo[deviceCapabilities]'].value = 'javascript' + (java ? ',java' : '');
fields['browserInfo[deviceAcceptLanguage]'].value = language;
fields['browserInfo[deviceScreenResolution]'].value = screen_width + 'x' + screen_height + 'x' + screen_depth;
fields['browserInfo[deviceAcceptCharset]'].value = '';
fields['browserInfo[deviceOperatingSystem]'].value = 'win';
fields['browserInfo[deviceType]'].value = 'desktop';
";

/// Renders forms as bare HTML fragments.
///
/// Names and values are entity-escaped; `form_attrs`, `submit_attrs` and
/// [`SubmitButton::Html`] are trusted markup and inserted as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormRenderer;

impl HtmlFormRenderer {
    /// Renders the frame a challenge form is posted into.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::form::HtmlFormRenderer;
    ///
    /// let frame = HtmlFormRenderer.render_frame("threeds_acs", true);
    /// assert!(frame.contains("display: none;"));
    /// ```
    #[must_use]
    pub fn render_frame(&self, name: &str, hidden: bool) -> String {
        let display = if hidden { " display: none;" } else { "" };
        format!(
            "<iframe name=\"{}\" style=\"height:420px; width:420px;{display}\"></iframe>\n",
            escape(name)
        )
    }
}

impl FormRenderer for HtmlFormRenderer {
    fn render(&self, form: &Form) -> String {
        let scripted = form.submission != Submission::Manual;
        let id = form.id.as_deref().or(scripted.then_some(DEFAULT_SCRIPT_FORM_ID));

        let mut out = String::from("<form");
        if let Some(id) = id {
            let _ = write!(out, " id=\"{}\"", escape(id));
        }
        let _ = write!(out, " method=\"{}\"", form.method);
        if let Some(attrs) = &form.form_attrs {
            let _ = write!(out, " {attrs}");
        }
        let _ = write!(out, " action=\"{}\"", escape(&form.action));
        if let Some(target) = &form.target {
            let _ = write!(out, " target=\"{}\"", escape(target));
        }
        out.push_str(">\n");

        for (name, value) in form.fields.flatten() {
            let _ = writeln!(
                out,
                "<input type=\"hidden\" name=\"{}\" value=\"{}\" />",
                escape(&name),
                escape(&value)
            );
        }

        if let Some(submit) = &form.submit {
            let attrs = form.submit_attrs.as_deref().map(|attrs| format!(" {attrs}")).unwrap_or_default();
            match submit {
                SubmitButton::Image(src) => {
                    let _ = writeln!(out, "<input{attrs} type=\"image\" src=\"{}\">", escape(src));
                }
                SubmitButton::Html(markup) => {
                    let _ = writeln!(out, "<button type=\"submit\"{attrs}>{markup}</button>");
                }
                SubmitButton::Text(label) => {
                    let _ = writeln!(out, "<input{attrs} type=\"submit\" value=\"{}\">", escape(label));
                }
            }
        }
        out.push_str("</form>\n");

        if let Some(id) = id.filter(|_| scripted) {
            out.push_str("<script>\n");
            let _ = writeln!(out, "var form = document.getElementById('{}');", escape_script_string(id));
            if form.submission == Submission::CaptureBrowserInfo {
                out.push_str("var fields = form.elements;");
                out.push_str(CAPTURE_SCRIPT);
            }
            out.push_str("window.setTimeout(function () { form.submit(); }, 0);\n</script>\n");
        }

        out
    }
}

/// Escapes text for a single-quoted JS string inside a `<script>` block.
///
/// `<` and `>` are emitted as `\x3c` and `\x3e` so the text can never close
/// the block; quotes, backslashes and line terminators are escaped too.
fn escape_script_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\x22"),
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            '&' => out.push_str("\\x26"),
            '\u{0}'..='\u{1f}' | '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", u32::from(ch));
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes text for an HTML attribute or text node.
///
/// `& < > ' "` become named or numeric entities and control characters
/// `0x00-0x1f` become `&#N;`.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            '\u{0}'..='\u{1f}' => {
                let _ = write!(out, "&#{};", u32::from(ch));
            }
            _ => out.push(ch),
        }
    }
    out
}
