//! End-to-end behaviour of interceptor stacks

use parking_lot::Mutex;
use shunt_core::testing::{MockHandler, Recorder};
use shunt_core::{
    handler_fn, CapabilityMask, Commit, Error, Handler, HeaderValue, Request, StatusCode,
};
use shunt_middleware::{
    AccessLog, AccessLogOutput, MiddlewareBuilder, NeverModified, SetHeaders, StaticError,
    StaticErrors, StatusCodeSwitch, StatusHandlers,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn get(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header("host", "example.test")
        .build()
        .unwrap()
}

#[test]
fn test_every_capability_subset_survives_a_stack() {
    init_tracing();

    for bits in 0..CapabilityMask::COMBINATIONS as u8 {
        let mask = CapabilityMask::from_bits(bits);
        let seen = Arc::new(Mutex::new(None));
        let record = Arc::clone(&seen);
        let inner = handler_fn(move |w, _| {
            *record.lock() = Some(CapabilityMask::probe(w));
        });

        let app = MiddlewareBuilder::new()
            .with_access_log_output(AccessLogOutput::writer(io::sink()))
            .with_security_headers()
            .with_default_error_pages()
            .build(inner)
            .unwrap();

        let mut rec = Recorder::with_capabilities(mask);
        app.serve(&mut rec, &get("/"));
        assert_eq!(*seen.lock(), Some(mask), "mask {mask:?}");
    }
}

#[test]
fn test_canonical_keys_win_through_the_stack() {
    let app = SetHeaders::new(
        MockHandler::new(StatusCode::OK),
        [
            ("x-served-by", "lower"),
            ("X-Served-By", "canonical"),
            ("X-SERVED-BY", "upper"),
        ],
    )
    .unwrap();

    let mut rec = Recorder::new();
    app.serve(&mut rec, &get("/"));
    let values: Vec<_> = rec.sent_headers().get_all("x-served-by").iter().collect();
    assert_eq!(values, ["canonical"]);
}

#[test]
fn test_only_first_commit_reaches_the_client() {
    let inner = handler_fn(|w, _| {
        assert!(w.write_head(StatusCode::ACCEPTED).is_sent());
        assert_eq!(w.write_head(StatusCode::CONFLICT), Commit::Ignored);
        w.write_all(b"queued").unwrap();
    });
    let app = MiddlewareBuilder::new()
        .with_access_log_output(AccessLogOutput::writer(io::sink()))
        .with_default_error_pages()
        .build(inner)
        .unwrap();

    let mut rec = Recorder::new();
    app.serve(&mut rec, &get("/jobs"));
    assert_eq!(rec.code(), StatusCode::ACCEPTED);
    assert_eq!(rec.head_calls(), 1);
    assert_eq!(rec.body_str(), "queued");
}

#[test]
fn test_diversion_hides_stale_headers() {
    init_tracing();

    let stale = handler_fn(|w, _| {
        for (name, value) in [
            ("cache-control", "public, max-age=86400"),
            ("etag", "\"stale\""),
            ("last-modified", "Sun, 06 Nov 1994 08:49:37 GMT"),
            ("content-encoding", "gzip"),
            ("content-length", "9000"),
        ] {
            w.set_header(
                shunt_core::HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
            .unwrap();
        }
        assert_eq!(w.write_head(StatusCode::NOT_FOUND), Commit::Diverted);
        assert!(matches!(w.write(b"original"), Err(Error::Diverted)));
    });

    let substitute = MockHandler::new(StatusCode::NOT_FOUND).body("substitute");
    let mut handlers: StatusHandlers = HashMap::new();
    handlers.insert(StatusCode::NOT_FOUND, Arc::new(substitute.clone()));
    let app = StatusCodeSwitch::new(stale, handlers);

    let mut rec = Recorder::new();
    app.serve(&mut rec, &get("/gone"));

    assert_eq!(substitute.calls(), 1);
    assert_eq!(rec.code(), StatusCode::NOT_FOUND);
    assert_eq!(rec.body_str(), "substitute");
    let sent = rec.sent_headers();
    for name in [
        "cache-control",
        "etag",
        "last-modified",
        "content-encoding",
        "content-length",
    ] {
        assert!(!sent.contains_key(name), "{name} leaked");
    }
}

#[test]
fn test_body_before_commit_keeps_implicit_ok() {
    let inner = handler_fn(|w, _| {
        w.write_all(b"x").unwrap();
        assert_eq!(w.write_head(StatusCode::NOT_FOUND), Commit::Ignored);
        w.write_all(b"yz").unwrap();
    });

    let substitute = MockHandler::new(StatusCode::NOT_FOUND).body("substitute");
    let mut handlers: StatusHandlers = HashMap::new();
    handlers.insert(StatusCode::NOT_FOUND, Arc::new(substitute.clone()));

    let mut pages = HashMap::new();
    pages.insert(StatusCode::NOT_FOUND, StaticError::new("page"));
    let app = StaticErrors::new(StatusCodeSwitch::new(inner, handlers), pages);

    let mut rec = Recorder::new();
    app.serve(&mut rec, &get("/partial"));

    // the first body byte committed 200; the later 404 never reached the client
    assert_eq!(substitute.calls(), 0);
    assert_eq!(rec.code(), StatusCode::OK);
    assert_eq!(rec.body_str(), "xyz");
    assert_eq!(rec.head_calls(), 1);
}

#[test]
fn test_never_modified_skips_the_handler() {
    let inner = MockHandler::new(StatusCode::OK).body("content");
    let app = NeverModified::new(inner.clone());

    let revalidate = Request::builder()
        .uri("/app.css")
        .header("if-modified-since", "Wed, 21 Oct 2015 07:28:00 GMT")
        .build()
        .unwrap();
    let mut rec = Recorder::new();
    app.serve(&mut rec, &revalidate);
    assert_eq!(rec.code(), StatusCode::NOT_MODIFIED);
    assert_eq!(inner.calls(), 0);

    let unsafe_method = Request::builder()
        .method("POST")
        .uri("/app.css")
        .header("if-modified-since", "Wed, 21 Oct 2015 07:28:00 GMT")
        .build()
        .unwrap();
    let mut rec = Recorder::new();
    app.serve(&mut rec, &unsafe_method);
    assert_eq!(rec.code(), StatusCode::OK);
    assert_eq!(inner.calls(), 1);
}

#[test]
fn test_access_log_counts_all_accepted_bytes() {
    let log = LogBuffer::default();
    let inner = handler_fn(|w, _| {
        for chunk in [&b"one"[..], b"two", b"three"] {
            w.write_all(chunk).unwrap();
        }
    });
    let app = AccessLog::new(inner, AccessLogOutput::writer(log.clone())).unwrap();

    app.serve(&mut Recorder::new(), &get("/a?b=c"));
    app.serve(&mut Recorder::new(), &get("/d"));

    let lines = log.lines();
    assert_eq!(lines.len(), 2);
    let fields: Vec<_> = lines[0].split(' ').collect();
    assert_eq!(fields[fields.len() - 4], "http://example.test/a?b=c");
    assert_eq!(fields[fields.len() - 3], "200");
    assert_eq!(fields[fields.len() - 2], "11");
}

#[test]
fn test_access_log_survives_a_panicking_handler() {
    let log = LogBuffer::default();
    let inner = handler_fn(|w, _| {
        w.write_head(StatusCode::ACCEPTED);
        w.write_all(b"12345").unwrap();
        panic!("handler bug");
    });
    let app = MiddlewareBuilder::new()
        .with_access_log_output(AccessLogOutput::writer(log.clone()))
        .with_default_error_pages()
        .build(inner)
        .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        app.serve(&mut Recorder::new(), &get("/boom"));
    }));
    assert!(result.is_err());

    let lines = log.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" 202 5 "), "{}", lines[0]);
}

#[test]
fn test_headers_set_before_commit_are_kept() {
    let inner = handler_fn(|w, _| {
        w.set_header(
            shunt_core::HeaderName::from_static("x-trace"),
            HeaderValue::from_static("abc"),
        )
        .unwrap();
        w.write_head(StatusCode::OK);
    });
    let app = MiddlewareBuilder::new()
        .with_header("Content-Language", "en")
        .with_access_log_output(AccessLogOutput::writer(io::sink()))
        .build(inner)
        .unwrap();

    let mut rec = Recorder::new();
    app.serve(&mut rec, &get("/"));
    let sent = rec.sent_headers();
    assert_eq!(sent["x-trace"], "abc");
    assert_eq!(sent["content-language"], "en");
}
