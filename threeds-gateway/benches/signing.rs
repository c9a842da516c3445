//! Benchmarks for canonical encoding and request signing.
//!
//! Run with: `cargo bench --bench signing`

#![allow(clippy::let_underscore_must_use, reason = "Criterion benchmarks ignore results")]
#![allow(missing_docs, reason = "Benchmark functions are self-documenting")]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use threeds_gateway::{
    encoding::encode,
    fields::FieldSet,
    signature::{SIGNATURE_FIELD, SignScope, sign, verify_response},
    threeds::BrowserHeaders,
};

const SECRET: &str = "Threeds2Test60System";

/// A SALE of roughly the size sent after fingerprint collection.
fn sale_request(extra_fields: usize) -> FieldSet {
    let mut fields = FieldSet::new();
    fields.insert("action", "SALE");
    fields.insert("merchantID", "100856");
    fields.insert("type", 1);
    fields.insert("amount", 1001);
    fields.insert("currencyCode", 826);
    fields.insert("countryCode", 826);
    fields.insert("cardNumber", "4012001037141112");
    fields.insert("transactionUnique", "bench-order-*-42");
    fields.insert("customerAddress", "Flat 6\r\nPrimrose Rise\r\n347 Lavender Road");
    fields.insert("browserInfo", BrowserHeaders::default().device_fields());
    for i in 0..extra_fields {
        fields.insert(format!("merchantData[item{i}]"), format!("value {i} & more"));
    }
    fields
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for extra in [0, 32, 256] {
        let fields = sale_request(extra);
        group.bench_with_input(BenchmarkId::from_parameter(extra), &fields, |b, fields| {
            b.iter(|| black_box(encode(black_box(fields))));
        });
    }
    group.finish();
}

fn bench_sign(c: &mut Criterion) {
    let fields = sale_request(0);

    c.bench_function("sign_all", |b| {
        b.iter(|| black_box(sign(black_box(&fields), SECRET, &SignScope::All)));
    });

    let partial = SignScope::fields(["action", "amount", "merchantID"]);
    c.bench_function("sign_partial", |b| {
        b.iter(|| black_box(sign(black_box(&fields), SECRET, &partial)));
    });
}

fn bench_verify(c: &mut Criterion) {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::ERROR).try_init();

    let mut response = sale_request(0);
    response.insert("responseCode", 0);
    let signature = sign(&response, SECRET, &SignScope::All);
    response.insert(SIGNATURE_FIELD, signature.to_string());

    c.bench_function("verify_response", |b| {
        b.iter(|| black_box(verify_response(black_box(response.clone()), Some(SECRET))));
    });
}

criterion_group!(benches, bench_encode, bench_sign, bench_verify);
criterion_main!(benches);
