use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use feq_domain::config::{ApiConfig, Secret};
use feq_server::Server;
use tower::ServiceExt;

fn config() -> ApiConfig {
    let mut cfg = ApiConfig::default();
    cfg.database.url = "http://127.0.0.1:54321".to_owned();
    cfg.database.anon_key = Secret::new("anon");
    cfg.database.service_role_key = Secret::new("service");
    cfg.certificates.secret = Secret::new("certificate-secret");
    cfg
}

#[tokio::test]
async fn every_slice_is_routed() {
    let server = Server::builder().config(config()).build().unwrap();
    let app = server.router();

    let response =
        app.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(Request::get("/api").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8_lossy(&html);
    for path in ["/api/courses", "/api/exam/submit", "/api/stripe/webhook", "/api/invites/claim"] {
        assert!(html.contains(path), "{path} missing from the API docs");
    }
}

#[test]
fn blank_certificate_secret_stops_bootstrap() {
    let mut cfg = config();
    cfg.certificates.secret = Secret::default();
    assert!(Server::builder().config(cfg).build().is_err());
}

#[test]
fn missing_supabase_keys_stop_bootstrap() {
    let mut cfg = config();
    cfg.database.service_role_key = Secret::default();
    assert!(Server::builder().config(cfg).build().is_err());
}
