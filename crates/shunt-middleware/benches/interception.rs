// Interception overhead benchmarks
//
// Run with: cargo bench -p shunt-middleware --bench interception

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shunt_core::testing::{MockHandler, Recorder};
use shunt_core::{CapabilityMask, Handler, Request, StatusCode};
use shunt_middleware::{AccessLog, AccessLogOutput, MiddlewareBuilder, StaticErrors};
use std::io;

fn request() -> Request {
    Request::builder()
        .uri("/api/test")
        .header("host", "bench.local")
        .build()
        .unwrap()
}

fn benchmark_access_log(c: &mut Criterion) {
    let handler = MockHandler::new(StatusCode::OK).body("benchmark response");
    let logged = AccessLog::new(handler, AccessLogOutput::writer(io::sink())).unwrap();
    let req = request();

    let mut group = c.benchmark_group("access_log");
    group.throughput(Throughput::Elements(1));

    for bits in [0u8, 5, 15] {
        let mask = CapabilityMask::from_bits(bits);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{mask:?}")), &mask, |b, &mask| {
            b.iter(|| {
                let mut rec = Recorder::with_capabilities(mask);
                logged.serve(&mut rec, &req);
                black_box(rec.code())
            });
        });
    }

    group.finish();
}

fn benchmark_static_errors(c: &mut Criterion) {
    let req = request();
    let mut group = c.benchmark_group("static_errors");
    group.throughput(Throughput::Elements(1));

    let diverted = StaticErrors::with_default_pages(MockHandler::new(StatusCode::NOT_FOUND));
    group.bench_function("diverted", |b| {
        b.iter(|| {
            let mut rec = Recorder::new();
            diverted.serve(&mut rec, &req);
            black_box(rec.code())
        });
    });

    let passed = StaticErrors::with_default_pages(MockHandler::new(StatusCode::OK).body("ok"));
    group.bench_function("pass_through", |b| {
        b.iter(|| {
            let mut rec = Recorder::new();
            passed.serve(&mut rec, &req);
            black_box(rec.code())
        });
    });

    group.finish();
}

fn benchmark_middleware_stack(c: &mut Criterion) {
    let app = MiddlewareBuilder::new()
        .with_access_log_output(AccessLogOutput::writer(io::sink()))
        .with_security_headers()
        .with_default_error_pages()
        .with_never_modified()
        .build(MockHandler::new(StatusCode::OK).body("benchmark response"))
        .unwrap();
    let req = request();

    let mut group = c.benchmark_group("middleware_stack");
    group.throughput(Throughput::Elements(1));
    group.bench_function("full_stack", |b| {
        b.iter(|| {
            let mut rec = Recorder::with_capabilities(CapabilityMask::ALL);
            app.serve(&mut rec, &req);
            black_box(rec.code())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_access_log,
    benchmark_static_errors,
    benchmark_middleware_stack
);
criterion_main!(benches);
