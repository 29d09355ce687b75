//! Upload route integration tests
//!
//! Drive a running server with real multipart requests and check both the
//! JSON report and the destination directory.

mod common;

use common::{decode, file_part, TestEnv};
use reqwest::multipart::Form;
use reqwest::StatusCode;

/// Test: a named file on /uploadFile is stored under its original name
#[tokio::test]
async fn test_upload_file_stores_original_name() {
    let env = TestEnv::start().await;

    let form = Form::new().part(
        "file_to_upload",
        file_part("report.txt", "text/plain", b"quarterly numbers"),
    );
    let (status, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    let message = body["message"].as_str().unwrap();
    assert!(message.ends_with("report.txt"), "message: {}", message);
    assert_eq!(env.stored_names(), vec!["report.txt".to_string()]);
}

/// Test: /uploadFile does not restrict media types
#[tokio::test]
async fn test_upload_file_accepts_any_media_type() {
    let env = TestEnv::start().await;

    let form = Form::new().part(
        "file_to_upload",
        file_part("archive.zip", "application/zip", b"PK\x03\x04"),
    );
    let (_, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(body["error"], false);
    assert_eq!(env.stored_names(), vec!["archive.zip".to_string()]);
}

/// Test: stored bytes match the uploaded payload exactly
#[tokio::test]
async fn test_stored_content_round_trip() {
    let env = TestEnv::start().await;
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();

    let form = Form::new().part(
        "file_to_upload",
        file_part("blob.bin", "application/octet-stream", &payload),
    );
    let (_, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(body["error"], false);
    let stored = std::fs::read(env.dest().join("blob.bin")).unwrap();
    assert_eq!(stored, payload);
}

/// Test: missing expected field yields a FieldMissing failure, not an empty response
#[tokio::test]
async fn test_upload_file_missing_field() {
    let env = TestEnv::start().await;

    let form = Form::new()
        .text("comment", "no file here")
        .part("wrong_field", file_part("a.txt", "text/plain", b"a"));
    let (status, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], true);
    let outcomes = &body["error_object"]["outcomes"];
    assert_eq!(outcomes[0]["kind"], "field_missing");
    assert_eq!(outcomes[0]["field"], "file_to_upload");
    assert_eq!(outcomes[1]["kind"], "unexpected_field");
    assert_eq!(outcomes[1]["field"], "wrong_field");
    assert!(env.stored_names().is_empty());
}

/// Test: extra parts on /uploadFile each get a failure and flip the error flag
#[tokio::test]
async fn test_upload_file_extra_parts_reported() {
    let env = TestEnv::start().await;

    let form = Form::new()
        .part("file_to_upload", file_part("a.txt", "text/plain", b"a"))
        .part("file_to_upload", file_part("b.txt", "text/plain", b"b"))
        .part("other", file_part("c.txt", "text/plain", b"c"));
    let (status, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().ends_with("a.txt"));
    assert_eq!(body["error_object"]["total"], 3);
    assert_eq!(body["error_object"]["failed"], 2);
    let outcomes = body["error_object"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["status"], "stored");
    assert_eq!(outcomes[1]["kind"], "unexpected_field");
    assert_eq!(outcomes[1]["field"], "file_to_upload");
    assert_eq!(outcomes[2]["kind"], "unexpected_field");
    assert_eq!(outcomes[2]["field"], "other");
    assert_eq!(env.stored_names(), vec!["a.txt".to_string()]);
}

/// Test: empty filename is reported as an empty/corrupt/invalid file
#[tokio::test]
async fn test_upload_file_empty_filename() {
    let env = TestEnv::start().await;

    let form = Form::new().part("file_to_upload", file_part("", "text/plain", b""));
    let (_, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(body["error"], true);
    assert_eq!(body["error_object"]["kind"], "missing_metadata");
    assert_eq!(body["error_object"]["reason"], "empty/corrupt/invalid file");
    assert!(env.stored_names().is_empty());
}

/// Test: a PNG on /uploadImage is accepted and written
#[tokio::test]
async fn test_upload_image_png_accepted() {
    let env = TestEnv::start().await;

    let form = Form::new().part(
        "image_to_upload",
        file_part("cat.png", "image/png", b"\x89PNG\r\n\x1a\n"),
    );
    let (status, body) = env.post_form("/uploadImage", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    assert!(body["message"].as_str().unwrap().ends_with("cat.png"));
    assert!(env.dest().join("cat.png").exists());
}

/// Test: a zip on /uploadImage is rejected and nothing is written
#[tokio::test]
async fn test_upload_image_zip_rejected() {
    let env = TestEnv::start().await;

    let form = Form::new().part(
        "image_to_upload",
        file_part("cat.png", "application/zip", b"PK\x03\x04"),
    );
    let (status, body) = env.post_form("/uploadImage", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], true);
    assert_eq!(body["error_object"]["kind"], "invalid_mime_type");
    assert_eq!(body["error_object"]["reason"], "invalid mime type");
    assert!(env.stored_names().is_empty());
}

/// Test: all parts of a clean batch are stored and listed in order
#[tokio::test]
async fn test_upload_several_files() {
    let env = TestEnv::start().await;

    let form = Form::new()
        .part("first", file_part("one.txt", "text/plain", b"1"))
        .part("second", file_part("two.pdf", "application/pdf", b"2"))
        .part("first", file_part("three.bin", "application/octet-stream", b"3"));
    let (status, body) = env.post_form("/uploadSeveralFiles", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    let files: Vec<&str> = body["filesUploaded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(files.len(), 3);
    assert!(files[0].ends_with("one.txt"));
    assert!(files[1].ends_with("two.pdf"));
    assert!(files[2].ends_with("three.bin"));
    assert_eq!(env.stored_names(), vec!["one.txt", "three.bin", "two.pdf"]);
}

/// Test: one rejected image does not stop the rest of the batch
#[tokio::test]
async fn test_upload_several_images_partial_failure() {
    let env = TestEnv::start().await;

    let form = Form::new()
        .part("a", file_part("a.png", "image/png", b"a"))
        .part("b", file_part("b.zip", "application/zip", b"b"))
        .part("c", file_part("c.gif", "image/gif", b"c"));
    let (status, body) = env.post_form("/uploadSeveralImages", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], true);
    assert_eq!(body["filesUploaded"].as_array().unwrap().len(), 2);

    let error_object = &body["error_object"];
    assert_eq!(error_object["total"], 3);
    assert_eq!(error_object["failed"], 1);
    let outcomes = error_object["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["status"], "stored");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[1]["kind"], "invalid_mime_type");
    assert_eq!(outcomes[1]["field"], "b");
    assert_eq!(outcomes[2]["status"], "stored");

    assert_eq!(env.stored_names(), vec!["a.png", "c.gif"]);
}

/// Test: a batch with no file parts succeeds with an empty list
#[tokio::test]
async fn test_upload_several_files_empty() {
    let env = TestEnv::start().await;

    let form = Form::new().text("note", "nothing attached");
    let (status, body) = env.post_form("/uploadSeveralFiles", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    assert_eq!(body["filesUploaded"], serde_json::json!([]));
}

/// Test: a non-multipart body is rejected at the transport boundary, as JSON
#[tokio::test]
async fn test_malformed_request_rejected() {
    let env = TestEnv::start().await;

    let response = env
        .client
        .post(env.url("/uploadFile"))
        .header("content-type", "text/plain")
        .body("just text")
        .send()
        .await
        .unwrap();
    let (status, body) = decode(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["error_object"]["kind"], "malformed_request");
}

/// Test: parts above the configured size limit are rejected with 413
#[tokio::test]
async fn test_file_size_limit() {
    let env = TestEnv::start_with(|config| {
        config.upload.max_file_bytes = 1024;
    })
    .await;

    let form = Form::new().part(
        "file_to_upload",
        file_part("big.bin", "application/octet-stream", &vec![7u8; 4096]),
    );
    let (status, body) = env.post_form("/uploadFile", form).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], true);
    assert!(env.stored_names().is_empty());
}

/// Test: wrong method on an upload path answers 405 with JSON
#[tokio::test]
async fn test_wrong_method_on_upload_route() {
    let env = TestEnv::start().await;

    let response = env.client.get(env.url("/uploadImage")).send().await.unwrap();
    assert_eq!(response.headers().get("allow").unwrap(), "POST");
    let (status, body) = decode(response).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], true);
    assert_eq!(body["error_object"]["kind"], "method_not_allowed");
}

/// Test: health check and unknown routes
#[tokio::test]
async fn test_health_and_not_found() {
    let env = TestEnv::start().await;

    let health = env.client.get(env.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    let missing = env.client.post(env.url("/nope")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
