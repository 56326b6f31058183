//! End-to-end behaviour of the gateway against a mock upstream.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

mod common;
use common::MockResponse;

const CORS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET,POST,PUT,PATCH,DELETE,OPTIONS"),
    ("access-control-allow-headers", "content-type,authorization,x-requested-with"),
];

#[tokio::test]
async fn test_relays_upstream_response_with_cors() {
    let (backend, mut requests) = common::start_fixed_backend(
        MockResponse::new(201, r#"{"id":1}"#)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "https://upstream.example")
            .header("X-Upstream", "yes"),
    )
    .await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .post(format!("http://{}/api/items?x=1", gateway))
        .header("content-type", "application/json")
        .body(r#"{"name":"a"}"#)
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), StatusCode::CREATED);
    for (name, value) in CORS {
        assert_eq!(res.headers().get(name).unwrap(), value, "header {name}");
    }
    assert_eq!(res.headers().get("x-upstream").unwrap(), "yes");
    assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
    // Pass-through responses do not get the security bundle.
    assert!(res.headers().get("x-content-type-options").is_none());
    assert_eq!(res.text().await.unwrap(), r#"{"id":1}"#);

    let raw = requests.recv().await.unwrap();
    assert!(raw.starts_with("POST /items?x=1 HTTP/1.1\r\n"), "got: {raw}");
    assert!(raw.ends_with(r#"{"name":"a"}"#));

    shutdown.trigger();
}

#[tokio::test]
async fn test_forwards_path_query_and_filtered_headers() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "ok")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}/", backend))).await;

    let res = common::client()
        .get(format!("http://{}/api/foo/bar?x=1", gateway))
        .header("host", "foo")
        .header("connection", "keep-alive")
        .header("origin", "https://site")
        .header("x-custom", "v")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    let raw = requests.recv().await.unwrap().to_lowercase();
    assert!(raw.starts_with("get /foo/bar?x=1 http/1.1\r\n"), "got: {raw}");
    assert!(raw.contains("x-custom: v\r\n"));
    assert!(raw.contains("x-request-id: "));
    assert!(!raw.contains("origin:"));
    assert!(!raw.contains("host: foo"));
    assert!(raw.contains(&format!("host: {}", backend)));

    shutdown.trigger();
}

#[tokio::test]
async fn test_prefix_with_trailing_slash_forwards_to_root() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "root")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .get(format!("http://{}/api/", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "root");

    let raw = requests.recv().await.unwrap();
    assert!(raw.starts_with("GET / HTTP/1.1\r\n"), "got: {raw}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_get_body_is_not_forwarded() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .get(format!("http://{}/api/search", gateway))
        .body("ignored")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let raw = requests.recv().await.unwrap();
    assert!(raw.ends_with("\r\n\r\n"), "got: {raw}");
    assert!(!raw.contains("ignored"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_options_never_contacts_upstream() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .request(Method::OPTIONS, format!("http://{}/api/anything", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    for (name, value) in CORS {
        assert_eq!(res.headers().get(name).unwrap(), value);
    }
    assert_eq!(res.headers().get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(res.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(res.headers().get("referrer-policy").unwrap(), "no-referrer");
    assert!(res.bytes().await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(requests.try_recv().is_err());

    shutdown.trigger();
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .request(
            Method::from_bytes(b"PROPFIND").unwrap(),
            format!("http://{}/api/files", gateway),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "error": "Unsupported method" }));
    assert!(requests.try_recv().is_err());

    shutdown.trigger();
}

#[tokio::test]
async fn test_unconfigured_upstream_is_500() {
    for worker_url in [None, Some("example.workers.dev".to_string())] {
        let (gateway, shutdown) = common::start_gateway(|c| c.upstream.worker_url = worker_url).await;

        let res = common::client()
            .get(format!("http://{}/api/foo", gateway))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.json::<Value>().await.unwrap(),
            json!({ "error": "WORKER_URL not configured" })
        );

        shutdown.trigger();
    }
}

#[tokio::test]
async fn test_upstream_errors_and_redirects_are_relayed_once() {
    let (backend, mut requests) = common::start_backend(|raw| {
        if raw.starts_with("GET /moved ") {
            MockResponse::new(302, "").header("Location", "/elsewhere")
        } else {
            MockResponse::new(503, "down")
        }
    })
    .await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;
    let client = common::client();

    let res = client.get(format!("http://{}/api/flaky", gateway)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.headers().get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(res.text().await.unwrap(), "down");

    let res = client.get(format!("http://{}/api/moved", gateway)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get("location").unwrap(), "/elsewhere");

    // Exactly one upstream attempt per inbound request.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut seen = 0;
    while requests.try_recv().is_ok() {
        seen += 1;
    }
    assert_eq!(seen, 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_outside_prefix_is_not_proxied() {
    let (backend, mut requests) = common::start_fixed_backend(MockResponse::new(200, "")).await;
    let (gateway, shutdown) =
        common::start_gateway(|c| c.upstream.worker_url = Some(format!("http://{}", backend))).await;

    let res = common::client()
        .get(format!("http://{}/assets/app.js", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(requests.try_recv().is_err());

    shutdown.trigger();
}
