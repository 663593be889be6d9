use std::time::Duration;

use bytes::Bytes;
use ingest_engine::{
    ClientSettings, FailureKind, IngestClient, ProgressReport, ReqwestIngestClient, SubmitSource,
    GENERIC_SUBMIT_FAILURE,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestIngestClient {
    ReqwestIngestClient::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("client")
}

#[tokio::test]
async fn uploads_local_file_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("filename=\"clip.mp4\""))
        .and(body_string_contains("fake-mp4-bytes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"filename": "1700000000_clip.mp4"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = SubmitSource::LocalFile {
        name: "clip.mp4".to_string(),
        bytes: Bytes::from_static(b"fake-mp4-bytes"),
    };
    let identifier = client_for(&server).submit(&source).await.expect("submit ok");
    assert_eq!(identifier, "1700000000_clip.mp4");
}

#[tokio::test]
async fn submits_remote_url_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process_url"))
        .and(body_json(json!({"url": "https://youtu.be/xyz"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filename": "xyz.mp4"})))
        .expect(1)
        .mount(&server)
        .await;

    let source = SubmitSource::RemoteUrl("  https://youtu.be/xyz ".to_string());
    let identifier = client_for(&server).submit(&source).await.expect("submit ok");
    assert_eq!(identifier, "xyz.mp4");
}

#[tokio::test]
async fn rejected_submission_carries_service_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process_url"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Download failed: No filename returned."})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&SubmitSource::RemoteUrl("https://youtu.be/bad".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected { status: 400 });
    assert_eq!(err.user_message(), "Download failed: No filename returned.");
}

#[tokio::test]
async fn bare_server_error_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let source = SubmitSource::LocalFile {
        name: "clip.mp4".to_string(),
        bytes: Bytes::from_static(b"x"),
    };
    let err = client_for(&server).submit(&source).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert_eq!(err.user_message(), GENERIC_SUBMIT_FAILURE);
}

#[tokio::test]
async fn submission_without_identifier_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filename": " "})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&SubmitSource::RemoteUrl("https://youtu.be/xyz".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
    assert_eq!(err.user_message(), GENERIC_SUBMIT_FAILURE);
}

#[tokio::test]
async fn polls_progress_for_escaped_identifier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress/my%20clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"percent": 40, "status": "Transcribing Audio (Whisper)..."}),
        ))
        .mount(&server)
        .await;

    let report = client_for(&server)
        .poll_status("my clip.mp4")
        .await
        .expect("poll ok");
    assert_eq!(
        report,
        ProgressReport {
            percent: 40,
            status: "Transcribing Audio (Whisper)...".to_string(),
        }
    );
}

#[tokio::test]
async fn poll_tolerates_missing_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/a.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"percent": -1})))
        .mount(&server)
        .await;

    let client = ReqwestIngestClient::new(ClientSettings {
        base_url: format!("{}/api/", server.uri()),
        ..ClientSettings::default()
    })
    .expect("client");
    let report = client.poll_status("a.mp4").await.expect("poll ok");
    assert_eq!(report.percent, -1);
    assert_eq!(report.status, "");
}

#[tokio::test]
async fn poll_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress/a.mp4"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).poll_status("a.mp4").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn poll_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress/slow.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"percent": 50, "status": "slow"})),
        )
        .mount(&server)
        .await;

    let client = ReqwestIngestClient::new(ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .expect("client");
    let err = client.poll_status("slow.mp4").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn poll_rejects_garbage_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress/a.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).poll_status("a.mp4").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn cancel_posts_to_cleanup_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cancel/a.mp4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "cancelled", "id": "a.mp4"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).cancel("a.mp4").await.expect("cancel ok");
}

#[tokio::test]
async fn cancel_reports_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cancel/a.mp4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server).cancel("a.mp4").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}
