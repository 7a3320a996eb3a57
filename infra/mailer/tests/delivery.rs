use feq_mailer::{Delivery, Email, Mailer, MailerError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn email() -> Email {
    Email::new("operator@example.com", "Your forklift certificate").html("<p>Congratulations</p>")
}

#[tokio::test]
async fn posts_json_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test"))
        .and(body_json(json!({
            "from": "Training <training@example.com>",
            "to": ["operator@example.com"],
            "subject": "Your forklift certificate",
            "html": "<p>Congratulations</p>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = Mailer::builder()
        .api_url(format!("{}/emails", server.uri()))
        .api_key(Some("re_test"))
        .from("Training <training@example.com>")
        .init()
        .unwrap();

    assert_eq!(mailer.send(&email()).await.unwrap(), Delivery::Sent(Some("msg_1".to_owned())));
}

#[tokio::test]
async fn disabled_mailer_skips_without_network() {
    let mailer = Mailer::builder().from("training@example.com").init().unwrap();
    assert_eq!(mailer.send(&email()).await.unwrap(), Delivery::Skipped);
}

#[tokio::test]
async fn api_rejections_are_errors_but_send_or_log_swallows_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
        .mount(&server)
        .await;

    let mailer = Mailer::builder()
        .api_url(server.uri())
        .api_key(Some("re_test"))
        .from("training@example.com")
        .init()
        .unwrap();

    let err = mailer.send(&email()).await.unwrap_err();
    assert!(matches!(err, MailerError::Rejected { status: 422, .. }));
    assert!(mailer.send_or_log(&email()).await.is_none());
}

#[tokio::test]
async fn emails_without_recipients_are_invalid() {
    let mailer = Mailer::builder().from("training@example.com").init().unwrap();
    let err = mailer.send(&Email::new("not-an-address", "Hi")).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
}
