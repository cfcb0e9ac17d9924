//! HTTP API integration tests
//!
//! Exercises the router end to end with an unroutable transcription
//! endpoint, so uploads are accepted normally and background
//! transcription fails fast without a network dependency.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use qari_common::events::EventBus;
use qari_ts::services::storage::ArtifactStore;
use qari_ts::services::transcriber::TranscriberClient;
use qari_ts::{build_router, AppState};

/// Create test app state backed by a temp root folder
async fn test_app_state(root: &TempDir) -> AppState {
    let db_pool = qari_common::db::init_database(&root.path().join("qari.db"))
        .await
        .unwrap();

    let event_bus = EventBus::new(100);
    let artifacts = ArtifactStore::new(root.path().to_path_buf());
    // Discard port: transcription attempts fail fast
    let transcriber = TranscriberClient::new(
        "http://127.0.0.1:9/transcribe".to_string(),
        Duration::from_millis(200),
    )
    .unwrap();

    AppState::new(db_pool, event_bus, artifacts, transcriber)
}

/// Small valid mono 16 kHz WAV
fn wav_fixture(samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..samples {
            writer.write_sample(((i % 128) as i16) * 4).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

const BOUNDARY: &str = "qariapitestboundary";

/// Build a multipart/form-data body for the upload endpoint
fn multipart_body(
    assignment_id: Option<&str>,
    student_id: Option<&str>,
    file: Option<(&[u8], &str)>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    if let Some(value) = assignment_id {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"assignment_id\"\r\n\r\n{}\r\n",
                BOUNDARY, value
            )
            .as_bytes(),
        );
    }
    if let Some(value) = student_id {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"student_id\"\r\n\r\n{}\r\n",
                BOUNDARY, value
            )
            .as_bytes(),
        );
    }
    if let Some((bytes, content_type)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"recitation\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

async fn post_upload(
    state: &AppState,
    assignment_id: Option<&str>,
    student_id: Option<&str>,
    file: Option<(&[u8], &str)>,
) -> (StatusCode, Value) {
    let (content_type, body) = multipart_body(assignment_id, student_id, file);
    let app = build_router(state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/recitations")
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let app = build_router(state.clone());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn put_assignment(state: &AppState, id: Uuid, body: Value) -> StatusCode {
    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/assignments/{}", id))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

#[tokio::test]
async fn test_health_endpoint_returns_json() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    let (status, json) = get_json(&state, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "qari-ts");
    assert!(json["version"].is_string());
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_submit_recitation_accepted() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let assignment_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    let wav = wav_fixture(16000);

    let (status, json) = post_upload(
        &state,
        Some(&assignment_id.to_string()),
        Some(&student_id.to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let submission_id: Uuid = json["submission_id"].as_str().unwrap().parse().unwrap();
    let audio_url = json["audio_url"].as_str().unwrap();
    assert!(audio_url.starts_with(&format!(
        "/media/recitations/{}/{}/",
        student_id, assignment_id
    )));
    assert!(audio_url.ends_with(".wav"));

    // Artifact is on disk under the root folder
    let relative = audio_url.trim_start_matches("/media/");
    assert!(root.path().join(relative).exists());

    // Row is readable through the API
    let (status, json) = get_json(&state, &format!("/api/recitations/{}", submission_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["assignment_id"], assignment_id.to_string());
    assert_eq!(json["student_id"], student_id.to_string());
    assert_eq!(json["is_latest"], true);
    assert_eq!(json["is_late"], false);
    // Background transcription may or may not have failed yet
    let status_str = json["transcription_status"].as_str().unwrap();
    assert!(status_str == "pending" || status_str == "error");
}

#[tokio::test]
async fn test_submit_rejects_missing_fields() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let wav = wav_fixture(8000);

    let (status, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        None,
        Some((&wav, "audio/wav")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, _) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_rejects_invalid_uuid() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let wav = wav_fixture(8000);

    let (status, json) = post_upload(
        &state,
        Some("not-a-uuid"),
        Some(&Uuid::new_v4().to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("assignment_id"));
}

#[tokio::test]
async fn test_submit_rejects_empty_file() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    let (status, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((b"", "audio/wav")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("empty"));
}

#[tokio::test]
async fn test_submit_rejects_oversize_file() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let oversize = vec![0u8; qari_common::media::MAX_UPLOAD_BYTES + 1];

    let (status, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((&oversize, "audio/wav")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("limit"));
}

#[tokio::test]
async fn test_submit_rejects_unsupported_type() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    let (status, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((b"hello world, plainly not audio", "text/plain")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("Unsupported audio type"));
}

#[tokio::test]
async fn test_submit_sniffs_type_when_declaration_unusable() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let wav = wav_fixture(8000);

    // Generic declared type, but the bytes are a recognizable WAV
    let (status, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((&wav, "application/octet-stream")),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(json["audio_url"].as_str().unwrap().ends_with(".wav"));
}

#[tokio::test]
async fn test_late_flag_follows_assignment_due_date() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let assignment_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();

    let status = put_assignment(
        &state,
        assignment_id,
        json!({
            "title": "Surah Al-Fatiha",
            "target_text": "بسم الله الرحمن الرحيم",
            "due_date": "2020-01-01T00:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let wav = wav_fixture(8000);
    let (status, json) = post_upload(
        &state,
        Some(&assignment_id.to_string()),
        Some(&student_id.to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let submission_id = json["submission_id"].as_str().unwrap();
    let (_, json) = get_json(&state, &format!("/api/recitations/{}", submission_id)).await;
    assert_eq!(json["is_late"], true);
}

#[tokio::test]
async fn test_resubmission_flips_latest_flag() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let assignment_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    let wav = wav_fixture(8000);

    let (_, first) = post_upload(
        &state,
        Some(&assignment_id.to_string()),
        Some(&student_id.to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;
    let first_id = first["submission_id"].as_str().unwrap().to_string();

    // Distinct storage key and submitted_at for the second upload
    tokio::time::sleep(Duration::from_millis(5)).await;

    let (_, second) = post_upload(
        &state,
        Some(&assignment_id.to_string()),
        Some(&student_id.to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;
    let second_id = second["submission_id"].as_str().unwrap().to_string();

    let (status, listing) = get_json(
        &state,
        &format!(
            "/api/assignments/{}/recitations?student_id={}",
            assignment_id, student_id
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let items = listing.as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Newest first
    assert_eq!(items[0]["id"], second_id.as_str());
    assert_eq!(items[0]["is_latest"], true);
    assert_eq!(items[1]["id"], first_id.as_str());
    assert_eq!(items[1]["is_latest"], false);
}

#[tokio::test]
async fn test_get_missing_submission_returns_404() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    let (status, json) = get_json(&state, &format!("/api/recitations/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_assignment_put_and_get_roundtrip() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let assignment_id = Uuid::new_v4();

    let status = put_assignment(
        &state,
        assignment_id,
        json!({"title": "Surah Al-Ikhlas", "target_text": "قل هو الله أحد"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get_json(&state, &format!("/api/assignments/{}", assignment_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Surah Al-Ikhlas");
    assert_eq!(json["target_text"], "قل هو الله أحد");
    assert!(json["due_date"].is_null());

    let (status, _) = get_json(&state, &format!("/api/assignments/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assignment_rejects_blank_title() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    let status = put_assignment(&state, Uuid::new_v4(), json!({"title": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rescore_requires_completed_submission() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let wav = wav_fixture(8000);

    let (_, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;
    let submission_id = json["submission_id"].as_str().unwrap();

    // Still pending, or already failed against the unroutable endpoint;
    // either way the submission is not completed
    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/recitations/{}/rescore", submission_id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"accuracy": 0.9}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rescore_replaces_feedback() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;

    // Manufacture a completed submission directly
    let submission = qari_common::models::Submission::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "recitations/s/a/1.wav".to_string(),
        "audio/wav".to_string(),
        false,
    );
    qari_ts::db::submissions::insert_submission(&state.db, &submission)
        .await
        .unwrap();
    qari_ts::db::submissions::complete_transcription(&state.db, submission.id, "بسم الله")
        .await
        .unwrap();

    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/recitations/{}/rescore", submission.id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"accuracy": 0.85}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let feedback: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(feedback["accuracy"], 0.85);
    assert_eq!(feedback["notes"], "Very good");

    // The stored feedback now reflects the override
    let (_, json) = get_json(&state, &format!("/api/recitations/{}", submission.id)).await;
    assert_eq!(json["feedback"]["accuracy"], 0.85);

    // Out-of-range accuracy is rejected
    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/recitations/{}/rescore", submission.id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"accuracy": 1.5}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_events_route_streams_sse() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/event-stream"));
}

#[tokio::test]
async fn test_media_serves_stored_audio() {
    let root = TempDir::new().unwrap();
    let state = test_app_state(&root).await;
    let wav = wav_fixture(8000);

    let (_, json) = post_upload(
        &state,
        Some(&Uuid::new_v4().to_string()),
        Some(&Uuid::new_v4().to_string()),
        Some((&wav, "audio/wav")),
    )
    .await;
    let audio_url = json["audio_url"].as_str().unwrap();

    let app = build_router(state.clone());
    let response = app
        .oneshot(Request::builder().uri(audio_url).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), wav.as_slice());
}
