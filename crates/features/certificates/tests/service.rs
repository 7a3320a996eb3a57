use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use feq_certificates::{CertificatePayload, CertificateSigner, Certificates, CertificatesInner};
use feq_database::Database;
use feq_kernel::domain::config::{ApiConfig, Secret};
use feq_kernel::server::ApiState;
use feq_mailer::Mailer;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "certificate-secret";

fn database(server: &MockServer) -> Database {
    Database::builder()
        .url(server.uri())
        .anon_key("anon")
        .service_role_key("service")
        .init()
        .unwrap()
}

fn mailer() -> Mailer {
    Mailer::builder().from("training@example.com").init().unwrap()
}

fn slice() -> Certificates {
    Certificates::new(CertificatesInner {
        signer: CertificateSigner::new(SECRET).unwrap(),
        validity_days: 1095,
        site_url: "https://flatearthequipment.com/".to_owned(),
    })
}

fn enrollment(id: Uuid, cert: Option<(&str, &str, &str)>) -> Value {
    json!({
        "id": id,
        "user_id": Uuid::new_v4(),
        "course_id": Uuid::new_v4(),
        "passed": true,
        "cert_code": cert.map(|c| c.0),
        "cert_payload": cert.map(|c| c.1),
        "cert_signature": cert.map(|c| c.2),
    })
}

#[tokio::test]
async fn passed_enrollments_get_a_signed_certificate() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(enrollment(id, None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "full_name": "Ana Ruiz", "email": "ana@example.com" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "Forklift Operator" })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/enrollments"))
        .and(query_param("cert_code", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([enrollment(id, None)])))
        .expect(1)
        .mount(&server)
        .await;

    let slice = slice();
    let issued = slice.issue(&database(&server), &mailer(), id, 0.92).await.unwrap();

    assert!(issued.fresh);
    let cert = &issued.certificate;
    assert_eq!(cert.payload.learner, "Ana Ruiz");
    assert_eq!(cert.payload.code.len(), 10);
    assert_eq!((cert.payload.expires_at - cert.payload.issued_at).num_days(), 1095);
    assert!(slice.signer.verify_payload(&cert.json, &cert.signature));
}

#[tokio::test]
async fn issuing_twice_returns_the_stored_certificate() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let signer = CertificateSigner::new(SECRET).unwrap();
    let payload = CertificatePayload {
        enrollment_id: id,
        learner: "Ana Ruiz".to_owned(),
        course: "Forklift Operator".to_owned(),
        score: 0.9,
        issued_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::days(1095),
        code: "K7M2Q9XW4T".to_owned(),
    };
    let signed = signer.sign_payload(&payload).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(enrollment(
            id,
            Some(("K7M2Q9XW4T", &signed.json, &signed.signature)),
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;

    let issued = slice().issue(&database(&server), &mailer(), id, 0.95).await.unwrap();
    assert!(!issued.fresh);
    assert_eq!(issued.certificate.payload, payload);
}

#[tokio::test]
async fn enrollments_without_a_pass_are_not_eligible() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let mut row = enrollment(id, None);
    row["passed"] = json!(false);
    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(row))
        .mount(&server)
        .await;

    let err = slice().issue(&database(&server), &mailer(), id, 0.5).await.unwrap_err();
    assert_eq!(err.status_code(), 409);
}

async fn lookup(server: &MockServer, code: &str) -> (StatusCode, Value) {
    let mut config = ApiConfig::default();
    config.certificates.secret = Secret::new(SECRET);

    let state = ApiState::builder()
        .register_slice(feq_certificates::init(&config).unwrap())
        .config(config)
        .db(database(server))
        .mailer(mailer())
        .build()
        .unwrap();
    let (router, _) = feq_certificates::router().with_state(state).split_for_parts();

    let response = router
        .oneshot(Request::get(format!("/api/certificates/{code}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn public_lookup_reports_validity() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let signer = CertificateSigner::new(SECRET).unwrap();
    let signed = signer
        .sign_payload(&CertificatePayload {
            enrollment_id: id,
            learner: "Ana Ruiz".to_owned(),
            course: "Forklift Operator".to_owned(),
            score: 0.9,
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(1095),
            code: "K7M2Q9XW4T".to_owned(),
        })
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .and(query_param("cert_code", "eq.K7M2Q9XW4T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([enrollment(
            id,
            Some(("K7M2Q9XW4T", &signed.json, &signed.signature)),
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (status, body) = lookup(&server, "k7m2q9xw4t").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["certificate"]["learner"], "Ana Ruiz");

    let (status, body) = lookup(&server, "ZZZZZZZZZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
