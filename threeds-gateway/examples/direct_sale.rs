//! Direct API SALE with 3-D Secure.
//!
//! Walks one transaction through the continuation engine against the
//! gateway's sample endpoint. The browser round-trips are simulated: the
//! fingerprint post is built by hand and ACS forms are printed instead of
//! being shown to a cardholder.
//!
//! # Running this example
//!
//! ```bash
//! export GATEWAY_DIRECT_URL=https://gateway.example.com/direct/
//! cargo run --example direct_sale
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::use_debug,
    reason = "examples are allowed to use println and simple formatting"
)]

use std::env;

use threeds_gateway::{
    GatewayError,
    fields::FieldSet,
    form::{FormRenderer, HtmlFormRenderer},
    gateway::{Gateway, Outcome},
    merchant::{DEFAULT_HOSTED_URL, MerchantContext},
    threeds::{ACS_FRAME_NAME, ContinuationEngine, Step, ThreeDSSession},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().with_env_filter("threeds_gateway=debug").try_init();

    let mut context = MerchantContext::test_account();
    if let Ok(direct_url) = env::var("GATEWAY_DIRECT_URL") {
        context = context.with_endpoints(direct_url, DEFAULT_HOSTED_URL);
    }
    let gateway = Gateway::from_context(context)?;
    let engine = ContinuationEngine::default();

    let mut sale = FieldSet::new();
    sale.insert("action", "SALE");
    sale.insert("merchantID", gateway.context().merchant_id.as_str());
    sale.insert("type", 1);
    sale.insert("amount", 1001);
    sale.insert("currencyCode", 826);
    sale.insert("countryCode", 826);
    sale.insert("cardNumber", "4012001037141112");
    sale.insert("cardExpiryMonth", 12);
    sale.insert("cardExpiryYear", 30);
    sale.insert("cardCVV", "083");
    sale.insert("transactionUnique", "direct-example-1");
    sale.insert("remoteAddress", "127.0.0.1");

    let session = engine.await_browser_info(ThreeDSSession::new(&sale)?)?;
    let browser_post = FieldSet::from([
        ("browserInfo[deviceChannel]", "browser"),
        ("browserInfo[deviceIdentity]", "Mozilla/5.0"),
        ("browserInfo[deviceTimeZone]", "0"),
        ("browserInfo[deviceCapabilities]", "javascript"),
        ("browserInfo[deviceScreenResolution]", "1920x1080x24"),
        ("browserInfo[deviceAcceptLanguage]", "en-GB"),
    ]);
    let mut session = engine.submit_browser_info(session, &mut sale, &browser_post)?;
    let mut request = sale;

    loop {
        match gateway.advance(&engine, session, request).await {
            Ok(Step::Complete(Outcome::Approved { response, .. })) => {
                println!("Approved: {:?}", response.text("responseMessage"));
                return Ok(());
            }
            Ok(Step::Complete(outcome)) => {
                println!("Not approved: {outcome:?}");
                return Ok(());
            }
            Ok(Step::Challenge { session: pending, challenge }) => {
                println!("{}", HtmlFormRenderer.render_frame(ACS_FRAME_NAME, challenge.is_hidden()));
                println!("{}", HtmlFormRenderer.render(&challenge.to_form()));

                // A real ACS posts back to the merchant; the sample ACS
                // accepts its own request echoed back.
                let mut acs_post = challenge.fields.clone();
                acs_post.remove("threeDSRef");
                request = engine.continuation_request(&pending, &acs_post)?;
                session = pending;
            }
            Err(GatewayError::ChallengeLimitExceeded { iterations }) => {
                eprintln!("Gave up after {iterations} challenges");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }
}
