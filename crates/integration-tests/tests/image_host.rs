//! The image host client against a mock host.

#![allow(clippy::unwrap_used)]

use droidshop_storefront::services::{ImageHostClient, UploadError};
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ImageHostClient {
    ImageHostClient::new(
        Url::parse(&server.uri()).unwrap(),
        Some(SecretString::from("upload-key")),
    )
    .unwrap()
}

#[tokio::test]
async fn test_upload_returns_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/upload"))
        .and(query_param("key", "upload-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": 200,
            "data": { "url": "https://i.ibb.co/abc/droid.png" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server)
        .upload("droid.png", b"not really a png".to_vec())
        .await
        .unwrap();
    assert_eq!(url.as_str(), "https://i.ibb.co/abc/droid.png");

    let requests = server.received_requests().await.unwrap();
    let request = requests.first().unwrap();
    let content_type = request.headers["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("filename=\"droid.png\""));
}

#[tokio::test]
async fn test_host_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status_code": 400,
            "error": { "message": "Invalid API v1 key." }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .upload("droid.png", vec![1, 2, 3])
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_unsuccessful_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "status": 400
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .upload("droid.png", vec![1, 2, 3])
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn test_empty_file_is_left_to_the_host() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status_code": 400,
            "error": { "message": "Empty upload source." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .upload("empty.png", Vec::new())
        .await
        .unwrap_err();
    let UploadError::Rejected { status, message } = err else {
        panic!("expected the host to reject the file, got {err:?}");
    };
    assert_eq!(status, 400);
    assert!(message.contains("Empty upload source"));
}
