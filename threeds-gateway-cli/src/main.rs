//! threeds-gw: command line front end for the threeds-gateway client.
//!
//! Field sets are read and written as JSON objects (`-` reads stdin). 3DS
//! sessions are kept in a JSON file between `sale` and `continue`, the way a
//! web application would keep them in its session store.
//!
//! # Examples
//!
//! ```bash
//! # Sign a request with the sample account's secret
//! echo '{"action":"SALE","amount":"1001"}' | threeds-gw sign -
//!
//! # Start a SALE; a challenge writes the session file and prints the ACS form
//! threeds-gw sale sale.json --session session.json --browser-post browser.json
//!
//! # Relay the ACS post-back
//! threeds-gw continue acs_post.json --session session.json
//! ```

mod observability;

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use threeds_gateway::{
    Gateway,
    fields::FieldSet,
    form::{FormRenderer, HtmlFormRenderer, SubmitButton},
    gateway::{BrowserInfoOptions, HostedOptions},
    merchant::MerchantContext,
    signature::{SignScope, sign, verify_response},
    threeds::{ACS_FRAME_NAME, BrowserHeaders, ContinuationEngine, Step, ThreeDSSession},
};
use tracing::{debug, info};

use crate::observability::{LogFormat, init_logging};

#[derive(Debug, Parser)]
#[command(name = "threeds-gw", version, about = "Signed gateway requests and 3-D Secure from the shell")]
struct Cli {
    /// Merchant configuration file (TOML). Defaults to the gateway test account.
    #[arg(long, short, env = "THREEDS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log output format; falls back to `LOG_FORMAT`.
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the signature for a field set.
    Sign {
        /// JSON field set.
        fields: PathBuf,
        /// Comma-separated field names for a partial signature.
        #[arg(long)]
        partial: Option<String>,
    },
    /// Verify a form-encoded gateway response and print it as JSON.
    Verify {
        /// Raw response body.
        response: PathBuf,
    },
    /// Print the hosted payment page form.
    Hosted {
        /// JSON request; must contain `redirectURL`.
        request: PathBuf,
        /// Comma-separated field names to sign; every field by default.
        #[arg(long)]
        partial: Option<String>,
        /// Submit button label.
        #[arg(long, conflicts_with = "submit_image")]
        submit_text: Option<String>,
        /// Submit button image URL.
        #[arg(long)]
        submit_image: Option<String>,
    },
    /// Print the fingerprint collection form.
    BrowserInfo {
        /// Where the browser posts the fingerprint.
        #[arg(long, default_value = "?")]
        action: String,
        /// `User-Agent` header to pre-fill.
        #[arg(long)]
        user_agent: Option<String>,
        /// `Accept` header to pre-fill.
        #[arg(long)]
        accept: Option<String>,
        /// `Accept-Encoding` header to pre-fill.
        #[arg(long)]
        accept_encoding: Option<String>,
        /// `Accept-Language` header to pre-fill.
        #[arg(long)]
        accept_language: Option<String>,
    },
    /// Send a SALE through the Direct API.
    Sale {
        /// JSON request.
        request: PathBuf,
        /// Where to keep the 3DS session if a challenge is issued.
        #[arg(long)]
        session: PathBuf,
        /// JSON browser post carrying `browserInfo[...]` fields.
        #[arg(long)]
        browser_post: Option<PathBuf>,
    },
    /// Relay an ACS post-back and continue the 3DS exchange.
    Continue {
        /// JSON ACS post-back.
        acs_post: PathBuf,
        /// Session file written by `sale`.
        #[arg(long)]
        session: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format.unwrap_or_else(LogFormat::from_env));

    let context = load_context(cli.config.as_deref())?;
    debug!(?context, "merchant context loaded");

    match cli.command {
        Command::Sign { fields, partial } => {
            let fields = read_fields(&fields)?;
            let secret = context.signing_secret().context("no signing secret configured")?;
            let scope = partial.as_deref().map_or(SignScope::All, parse_scope);
            println!("{}", sign(&fields, secret, &scope));
        }
        Command::Verify { response } => {
            let body = read_input(&response)?;
            let verified = verify_response(FieldSet::from_urlencoded(&body), context.signing_secret())?;
            println!("{}", serde_json::to_string_pretty(&verified)?);
        }
        Command::Hosted { request, partial, submit_text, submit_image } => {
            let gateway = Gateway::from_context(context)?;
            let options = HostedOptions {
                scope: partial.as_deref().map(parse_scope),
                submit: submit_image.map(SubmitButton::Image).or(submit_text.map(SubmitButton::Text)),
                ..HostedOptions::default()
            };
            let form = gateway.hosted_request(read_fields(&request)?, &options)?;
            println!("{}", HtmlFormRenderer.render(&form));
        }
        Command::BrowserInfo { action, user_agent, accept, accept_encoding, accept_language } => {
            let gateway = Gateway::from_context(context)?;
            let headers = BrowserHeaders { user_agent, accept, accept_encoding, accept_language };
            let options = BrowserInfoOptions { action, ..BrowserInfoOptions::default() };
            println!("{}", HtmlFormRenderer.render(&gateway.collect_browser_info(&headers, &options)));
        }
        Command::Sale { request, session, browser_post } => {
            let gateway = Gateway::from_context(context)?;
            let engine = ContinuationEngine::default();
            let mut sale = read_fields(&request)?;
            prefill_merchant(&mut sale, gateway.context());

            let started = ThreeDSSession::new(&sale)?;
            info!(correlation_id = %started.correlation_id(), "starting sale");
            let submitted = match browser_post {
                Some(path) => {
                    let post = read_fields(&path)?;
                    let waiting = engine.await_browser_info(started)?;
                    engine.submit_browser_info(waiting, &mut sale, &post)?
                }
                None => engine.submit(started)?,
            };

            let step = gateway.advance(&engine, submitted, sale).await?;
            report(step, &session)?;
        }
        Command::Continue { acs_post, session } => {
            let gateway = Gateway::from_context(context)?;
            let engine = ContinuationEngine::default();
            let pending: ThreeDSSession = serde_json::from_slice(&read_input(&session)?)
                .with_context(|| format!("invalid session file {}", session.display()))?;

            let request = engine.continuation_request(&pending, &read_fields(&acs_post)?)?;
            let step = gateway.advance(&engine, pending, request).await?;
            report(step, &session)?;
        }
    }

    Ok(())
}

/// Loads the merchant context from `path`, or the test account.
fn load_context(path: Option<&Path>) -> Result<MerchantContext> {
    match path {
        Some(path) => MerchantContext::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(MerchantContext::test_account()),
    }
}

/// The session needs `merchantID` before the preparer would add it.
fn prefill_merchant(request: &mut FieldSet, context: &MerchantContext) {
    if !context.merchant_id.is_empty() {
        request.insert_if_absent("merchantID", context.merchant_id.as_str());
    }
}

fn parse_scope(partial: &str) -> SignScope {
    partial.parse().unwrap_or_default()
}

/// Prints the step; keeps the session file while a challenge is pending.
fn report(step: Step, session_path: &Path) -> Result<()> {
    match &step {
        Step::Challenge { session, challenge } => {
            fs::write(session_path, serde_json::to_vec_pretty(session)?)
                .with_context(|| format!("failed to write session {}", session_path.display()))?;
            eprintln!("{}", HtmlFormRenderer.render_frame(ACS_FRAME_NAME, challenge.is_hidden()));
            eprintln!("{}", HtmlFormRenderer.render(&challenge.to_form()));
        }
        Step::Complete(_) => {
            if session_path.exists() {
                fs::remove_file(session_path)
                    .with_context(|| format!("failed to remove session {}", session_path.display()))?;
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&step)?);
    Ok(())
}

fn read_fields(path: &Path) -> Result<FieldSet> {
    let raw = read_input(path)?;
    let fields: FieldSet = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a JSON object of fields", path.display()))?;
    if fields.is_empty() {
        bail!("{} contains no fields", path.display());
    }
    Ok(fields)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("failed to read stdin")?;
        Ok(buf)
    } else {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}
