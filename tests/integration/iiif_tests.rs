//! Integration tests for IIIF image resolution

use imgscrape::config::HttpConfig;
use imgscrape::context::{Context, ContextError};
use imgscrape::crawler::build_http_client;
use imgscrape::iiif::{Format, IiifClient, Quality, Region, ResolveError, Rotation, Size};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];

fn create_test_client(base_url: &str) -> IiifClient {
    let http = build_http_client(&HttpConfig::default()).expect("Failed to build HTTP client");
    IiifClient::new(http, base_url).expect("Failed to create IIIF client")
}

fn image(bytes: &[u8], mime: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), mime)
}

#[tokio::test]
async fn test_reference_request_hits_exact_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/iiif/abc123/square/full/0.000000/default.jpg"))
        .respond_with(image(JPEG_BYTES, "image/jpeg"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&format!("{}/iiif", mock_server.uri()));
    let response = client
        .image("abc123")
        .square()
        .size_full()
        .rotate(0.0)
        .jpg()
        .resolve(&Context::background())
        .await
        .expect("Resolve failed");

    assert_eq!(response.status(), 200);
    assert_eq!(response.content_type(), Some("image/jpeg"));
    assert_eq!(response.content_length(), Some(JPEG_BYTES.len() as u64));

    let bytes = response.bytes().await.expect("Failed to read body");
    assert_eq!(&bytes[..], JPEG_BYTES);
}

#[tokio::test]
async fn test_copy_to_streams_body() {
    let mock_server = MockServer::start().await;
    let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/big/full/max/!90.000000/gray.png"))
        .respond_with(image(&body, "image/png"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let response = client
        .image("big")
        .size_max()
        .mirror_rotate(450.0)
        .gray()
        .png()
        .resolve(&Context::background())
        .await
        .expect("Resolve failed");

    let mut sink = Vec::new();
    let written = response.copy_to(&mut sink).await.expect("Copy failed");

    assert_eq!(written, body.len() as u64);
    assert_eq!(sink, body);
}

#[tokio::test]
async fn test_copy_to_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(image(JPEG_BYTES, "image/jpeg"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let target = dir.path().join(format!("abc123.{}", Format::Jpg.extension()));

    let response = create_test_client(&mock_server.uri())
        .image("abc123")
        .resolve(&Context::background())
        .await
        .expect("Resolve failed");

    let mut file = tokio::fs::File::create(&target).await.expect("Failed to create file");
    response.copy_to(&mut file).await.expect("Copy failed");
    drop(file);

    let saved = std::fs::read(&target).expect("Failed to read saved image");
    assert_eq!(saved, JPEG_BYTES);
}

#[tokio::test]
async fn test_parsed_parameters_build_same_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/id/10,20,300,400/pct:50/-90.000000/bitonal.tif"))
        .respond_with(image(b"II*\0", "image/tiff"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = create_test_client(&mock_server.uri())
        .image("id")
        .region("10,20,300,400".parse::<Region>().unwrap())
        .size("pct:50".parse::<Size>().unwrap())
        .rotation("-90".parse::<Rotation>().unwrap())
        .quality("BITONAL".parse::<Quality>().unwrap())
        .format("tif".parse::<Format>().unwrap())
        .resolve(&Context::background())
        .await
        .expect("Resolve failed");

    assert_eq!(response.bytes().await.unwrap().as_ref(), b"II*\0");
}

#[tokio::test]
async fn test_identifier_with_slash_is_one_segment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/iiif/folder%2Fimage/full/full/0.000000/default.jpg"))
        .respond_with(image(JPEG_BYTES, "image/jpeg"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&format!("{}/iiif/", mock_server.uri()));
    let response = client
        .image("folder/image")
        .resolve(&Context::background())
        .await;

    assert!(response.is_ok());
}

#[tokio::test]
async fn test_protocol_error_carries_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("image abc123 not found", "text/plain"),
        )
        .mount(&mock_server)
        .await;

    let err = create_test_client(&mock_server.uri())
        .image("abc123")
        .resolve(&Context::background())
        .await
        .unwrap_err();

    match err {
        ResolveError::Protocol { status, ref body, ref url } => {
            assert_eq!(status, 404);
            assert_eq!(body, "image abc123 not found");
            assert!(url.ends_with("/abc123/full/full/0.000000/default.jpg"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_every_protocol_status_is_classified() {
    let mock_server = MockServer::start().await;

    for status in [400u16, 401, 403, 404, 500, 501, 503] {
        Mock::given(method("GET"))
            .and(path(format!("/s{}/full/full/0.000000/default.jpg", status)))
            .respond_with(ResponseTemplate::new(status).set_body_raw("nope", "text/plain"))
            .mount(&mock_server)
            .await;
    }

    let client = create_test_client(&mock_server.uri());
    for status in [400u16, 401, 403, 404, 500, 501, 503] {
        let err = client
            .image(format!("s{}", status))
            .resolve(&Context::background())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Protocol { .. }), "{}: {:?}", status, err);
        assert_eq!(err.status(), Some(status));
    }
}

#[tokio::test]
async fn test_other_statuses_are_unexpected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/teapot/full/full/0.000000/default.jpg"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway/full/full/0.000000/default.jpg"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    for (id, expected) in [("teapot", 418u16), ("gateway", 502)] {
        let err = client
            .image(id)
            .resolve(&Context::background())
            .await
            .unwrap_err();

        assert!(
            matches!(err, ResolveError::UnexpectedStatus { status, .. } if status == expected),
            "{}: {:?}",
            id,
            err
        );
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let client = create_test_client("http://127.0.0.1:9/iiif");
    let err = client
        .image("abc123")
        .resolve(&Context::background())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Transport { .. }), "{:?}", err);
    assert!(!err.is_input_error());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_empty_identifier_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = create_test_client(&mock_server.uri())
        .image("")
        .resolve(&Context::background())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::EmptyIdentifier));
    assert!(err.is_input_error());
}

#[tokio::test]
async fn test_deadline_abandons_slow_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(image(JPEG_BYTES, "image/jpeg").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let ctx = Context::background().with_timeout(Duration::from_millis(100));
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        create_test_client(&mock_server.uri()).image("slow").resolve(&ctx),
    )
    .await
    .expect("resolve ignored its deadline");

    let err = outcome.unwrap_err();
    assert!(err.is_cancelled());
    assert!(matches!(err, ResolveError::Cancelled(ContextError::DeadlineExceeded)));
}

#[tokio::test]
async fn test_concurrent_requests_share_client() {
    let mock_server = MockServer::start().await;

    for id in ["one", "two", "three"] {
        Mock::given(method("GET"))
            .and(path(format!("/{}/full/full/0.000000/default.png", id)))
            .respond_with(image(id.as_bytes(), "image/png"))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let client = create_test_client(&mock_server.uri());
    let ctx = Context::background();

    let requests = ["one", "two", "three"].map(|id| {
        let request = client.image(id).png();
        let ctx = ctx.clone();
        async move { request.resolve(&ctx).await?.bytes().await }
    });

    let bodies = futures::future::try_join_all(requests)
        .await
        .expect("Concurrent resolves failed");

    assert_eq!(bodies[0].as_ref(), b"one");
    assert_eq!(bodies[1].as_ref(), b"two");
    assert_eq!(bodies[2].as_ref(), b"three");
}

#[tokio::test]
async fn test_body_reads_follow_resolve_context() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(image(JPEG_BYTES, Format::Png.mime_type()))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());

    let ctx = Context::background();
    let response = client
        .image("a")
        .png()
        .resolve(&ctx)
        .await
        .expect("Resolve failed");
    assert_eq!(response.content_type(), Some(Format::Png.mime_type()));

    ctx.cancel();
    let err = response.bytes().await.unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled(ContextError::Cancelled)));

    let ctx = Context::background();
    let mut response = client
        .image("b")
        .resolve(&ctx)
        .await
        .expect("Resolve failed");
    ctx.cancel();

    assert!(matches!(
        response.chunk().await,
        Err(ResolveError::Cancelled(ContextError::Cancelled))
    ));

    let mut sink = Vec::new();
    let err = response.copy_to(&mut sink).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(sink.is_empty());
}
