//! HttpMailer against a mock provider.

use pulse_core::EmailAddress;
use pulse_mail::{HttpMailer, MailConfig, MailError, MailMessage, Mailer};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message() -> MailMessage {
    MailMessage {
        to: EmailAddress::parse("guest@example.com").unwrap(),
        subject: "You have been invited to take a survey".into(),
        html: "<p>hello</p>".into(),
    }
}

fn mailer(server: &MockServer) -> HttpMailer {
    let config = MailConfig::local_mock(&server.uri(), "re_test_key").unwrap();
    HttpMailer::new(&config).unwrap()
}

#[tokio::test]
async fn send_posts_resend_payload_with_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(serde_json::json!({
            "from": "onboarding@resend.dev",
            "to": ["guest@example.com"],
            "subject": "You have been invited to take a survey",
            "html": "<p>hello</p>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "email-123"})))
        .expect(1)
        .mount(&server)
        .await;

    mailer(&server).send(&message()).await.unwrap();
}

#[tokio::test]
async fn base_url_path_without_trailing_slash_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "email-456"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = MailConfig::local_mock(&format!("{}/v1", server.uri()), "re_test_key").unwrap();
    HttpMailer::new(&config).unwrap().send(&message()).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_rejected_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string(r#"{"message":"invalid from"}"#))
        .mount(&server)
        .await;

    let err = mailer(&server).send(&message()).await.unwrap_err();
    match err {
        MailError::Rejected { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("invalid from"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn success_without_json_body_is_still_ok() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    assert!(mailer(&server).send(&message()).await.is_ok());
}

#[tokio::test]
async fn unreachable_provider_is_http_error() {
    let config = MailConfig::local_mock("http://127.0.0.1:9", "k").unwrap();
    let mailer = HttpMailer::new(&config).unwrap();
    let err = mailer.send(&message()).await.unwrap_err();
    assert!(matches!(err, MailError::Http { .. }));
    assert_eq!(mailer.kind(), "http");
}
