//! Hosted payment page example.
//!
//! Builds the signed form that sends a cardholder to the gateway's hosted
//! payment page and prints the HTML fragment. Nothing is sent over the
//! network.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example hosted_form
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "examples are allowed to use println"
)]

use threeds_gateway::{
    fields::FieldSet,
    form::{FormRenderer, HtmlFormRenderer, SubmitButton},
    gateway::{Gateway, HostedOptions},
    merchant::MerchantContext,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Gateway::from_context(MerchantContext::test_account())?;

    let mut request = FieldSet::new();
    request.insert("action", "SALE");
    request.insert("type", 1);
    request.insert("countryCode", 826);
    request.insert("currencyCode", 826);
    request.insert("amount", 1001);
    request.insert("orderRef", "Test purchase");
    request.insert("transactionUnique", "hosted-example-1");
    request.insert("redirectURL", "https://shop.example.com/payment/return");

    let options = HostedOptions {
        submit: Some(SubmitButton::Html("<b>Pay &pound;10.01</b>".to_owned())),
        form_attrs: Some("class=\"hosted-payment\"".to_owned()),
        ..HostedOptions::default()
    };

    let form = gateway.hosted_request(request, &options)?;
    println!("{}", HtmlFormRenderer.render(&form));

    Ok(())
}
