//! Integration tests for the filter stages working together.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;

use assert2::{check, let_assert};
use flate2::Compression;
use flate2::write::GzEncoder;
use wirekit::config::PipelineConfig;
use wirekit::middleware::CookieJar;
use wirekit::{Client, Error, Headers, Pipeline, Request, Response, Stage, handler_fn};

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write");
    encoder.finish().expect("finish")
}

/// App handing out a session cookie and echoing the `Cookie` header it saw.
fn session_app(request: Request) -> wirekit::Result<Response> {
    let seen = request.header("cookie").unwrap_or_default().to_owned();
    let mut headers = Headers::from([("Content-Type", "text/plain")]);
    match request.path() {
        "/login" => headers.append("Set-Cookie", "session=abc123; Path=/; HttpOnly"),
        "/logout" => headers.append("Set-Cookie", "session=; Max-Age=0; Path=/"),
        _ => {}
    }
    Ok(Response::new(200, headers, seen))
}

#[test]
fn cookie_set_by_first_call_is_sent_by_second() {
    let client = Client::builder().app(handler_fn(session_app)).build();

    let first = client.get("/login").send().expect("login");
    check!(first.text().expect("text") == "");

    let second = client.get("/account").send().expect("account");
    check!(second.text().expect("text") == "session=abc123");
}

#[test]
fn expired_cookie_is_no_longer_sent() {
    let client = Client::builder().app(handler_fn(session_app)).build();

    client.get("/login").send().expect("login");
    client.get("/logout").send().expect("logout");

    let response = client.get("/account").send().expect("account");
    check!(response.text().expect("text") == "");
    let_assert!(Some(jar) = client.pipeline().cookie_jar());
    check!(jar.is_empty());
}

#[test]
fn caller_cookie_header_is_merged() {
    let client = Client::builder().app(handler_fn(session_app)).build();
    client.get("/login").send().expect("login");

    let response = client
        .get("/account")
        .header("Cookie", "theme=dark")
        .send()
        .expect("account");
    check!(response.text().expect("text") == "theme=dark; session=abc123");
}

#[test]
fn cookies_stay_off_when_disabled() {
    let client = Client::builder()
        .config(PipelineConfig::builder().cookie_support(false).build())
        .app(handler_fn(session_app))
        .build();

    client.get("/login").send().expect("login");
    let response = client.get("/account").send().expect("account");

    check!(response.text().expect("text") == "");
    check!(client.pipeline().cookie_jar().is_none());
}

#[test]
fn cookie_jar_is_scoped_to_the_pipeline() {
    let pipeline = Pipeline::builder().app(handler_fn(session_app)).build();
    let alice = Client::with_pipeline(pipeline.clone());
    let bob = Client::with_pipeline(pipeline);
    let stranger = Client::builder().app(handler_fn(session_app)).build();

    alice.get("/login").send().expect("login");

    let shared = bob.get("/account").send().expect("bob");
    check!(shared.text().expect("text") == "session=abc123");

    let isolated = stranger.get("/account").send().expect("stranger");
    check!(isolated.text().expect("text") == "");
}

#[test]
fn cookies_respect_path_and_domain() {
    let jar = CookieJar::new();
    let pipeline = Pipeline::builder()
        .cookie_jar(jar.clone())
        .app(handler_fn(session_app))
        .build();
    let client = Client::with_pipeline(pipeline);
    let api = url::Url::parse("http://localhost/api/login").expect("url");
    jar.store(&api, "scoped=1");

    let inside = client.get("/api/items").send().expect("inside");
    check!(inside.text().expect("text") == "scoped=1");

    let outside = client.get("/other").send().expect("outside");
    check!(outside.text().expect("text") == "");

    let elsewhere = client.get("http://example.com/api/items").send().expect("elsewhere");
    check!(elsewhere.text().expect("text") == "");
}

#[test]
fn concurrent_calls_share_the_jar_safely() {
    let client = Client::builder().app(handler_fn(session_app)).build();
    client.get("/login").send().expect("login");

    thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let response = client.get("/account").send().expect("account");
                    response.text().expect("text")
                })
            })
            .collect();

        for worker in workers {
            check!(worker.join().expect("worker") == "session=abc123");
        }
    });
}

#[test]
fn app_can_call_another_client() {
    let downstream = Client::builder()
        .app(handler_fn(|_request: Request| {
            Ok(Response::new(200, [("Content-Type", "text/plain")], "inner"))
        }))
        .build();

    let client = Client::builder()
        .app(handler_fn(move |_request: Request| {
            let inner = downstream.get("/inner").send()?;
            let body = format!("outer+{}", inner.text().unwrap_or_default());
            Ok(Response::new(200, [("Content-Type", "text/plain")], body))
        }))
        .build();

    let response = client.get("/outer").send().expect("response");
    check!(response.text().expect("text") == "outer+inner");
}

#[tokio::test]
async fn blocking_client_inside_async_code() {
    let client = Client::builder().app(handler_fn(session_app)).build();

    client.get("/login").send().expect("login");
    let response = client.get("/account").send().expect("account");

    check!(response.text().expect("text") == "session=abc123");
}

#[test]
fn assertion_observes_decoded_body() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);

    let client = Client::builder()
        .app(handler_fn(|_request: Request| {
            Ok(Response::new(
                200,
                [("Content-Type", "application/json"), ("Content-Encoding", "gzip")],
                gzip(br#"{"name":"widget"}"#),
            ))
        }))
        .assert_with(move |_request, response| {
            sink.lock().expect("lock").extend_from_slice(response.body());
        })
        .build();

    let response = client.get("/items/1").send().expect("response");

    check!(response.body().as_ref() == br#"{"name":"widget"}"#);
    check!(response.header("content-encoding") == None);
    check!(observed.lock().expect("lock").as_slice() == br#"{"name":"widget"}"#);
}

#[test]
fn compressed_body_is_left_alone_without_decoding() {
    let compressed = gzip(b"hello");
    let body = compressed.clone();
    let client = Client::builder()
        .config(PipelineConfig::builder().content_decoding(false).build())
        .app(handler_fn(move |_request: Request| {
            Ok(Response::new(200, [("Content-Encoding", "gzip")], body.clone()))
        }))
        .build();

    let response = client.get("/").send().expect("response");
    check!(response.body().as_ref() == compressed.as_slice());
    check!(response.header("content-encoding") == Some("gzip"));
}

#[test]
fn charset_sees_decoded_latin1_body() {
    let client = Client::builder()
        .app(handler_fn(|_request: Request| {
            Ok(Response::new(
                200,
                [
                    ("Content-Type", "text/plain; charset=ISO-8859-1"),
                    ("Content-Encoding", "gzip"),
                ],
                gzip(b"na\xefve caf\xe9"),
            ))
        }))
        .build();

    let response = client.get("/menu").send().expect("response");

    check!(response.text().expect("utf-8") == "naïve café");
    check!(response.charset() == Some("utf-8"));
}

#[test]
fn corrupt_body_surfaces_decode_error() {
    let client = Client::builder()
        .app(handler_fn(|_request: Request| {
            Ok(Response::new(200, [("Content-Encoding", "gzip")], "definitely not gzip"))
        }))
        .build();

    let result = client.get("/").send();
    let_assert!(Err(Error::Decode { encoding, .. }) = result);
    check!(encoding == "gzip");
}

#[test]
fn decode_advertises_accepted_encodings() {
    let client = Client::builder()
        .app(handler_fn(|request: Request| {
            let accepted = request.header("accept-encoding").unwrap_or_default().to_owned();
            Ok(Response::new(200, Headers::new(), accepted))
        }))
        .build();

    let response = client.get("/").send().expect("response");
    check!(response.text().expect("text") == "gzip, deflate, br, zstd");
}

#[test]
fn stages_follow_configuration() {
    let pipeline = Pipeline::builder()
        .config(PipelineConfig::builder().logging(true).build())
        .app(handler_fn(session_app))
        .build();

    check!(pipeline.stages() == [Stage::Charset, Stage::Cookies, Stage::Logging, Stage::Decode]);
}
