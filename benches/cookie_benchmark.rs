use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use igetback::services::Credentials;
use std::hint::black_box;

fn benchmark_parse_cookie(c: &mut Criterion) {
    let credentials = Credentials::new("benchmark secret").expect("Failed to derive key");
    let token = credentials
        .build_auth_token("ADA@TUFTS.EDU", Utc::now())
        .expect("Failed to build token");

    let single = format!("IgetbackAuth={}", token);
    // Typical browser header with analytics cookies around the session
    let crowded = format!(
        "_ga=GA1.2.1234567890.1700000000; theme=dark; IgetbackAuth={}; _gid=GA1.2.987654321.1700000000; lang=en-US",
        token
    );
    let garbage = "IgetbackAuth=deadbeefdeadbeefdeadbeefdeadbeefdeadbeef; theme=dark";

    let mut group = c.benchmark_group("auth_cookie");

    group.bench_function("single_cookie", |b| {
        b.iter(|| credentials.parse_cookie(black_box(&single)))
    });

    group.bench_function("crowded_header", |b| {
        b.iter(|| credentials.parse_cookie(black_box(&crowded)))
    });

    group.bench_function("undecryptable_token", |b| {
        b.iter(|| credentials.parse_cookie(black_box(garbage)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_parse_cookie);
criterion_main!(benches);
