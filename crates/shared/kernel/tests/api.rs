use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::routing::{get, post};
use feq_database::DatabaseError;
use feq_kernel::server::router::system_router;
use feq_kernel::server::{ApiError, Validate, ValidJson};
use serde::Deserialize;
use serde_json::{Value, json};
use std::borrow::Cow;
use tower::ServiceExt;

#[derive(Deserialize)]
struct Signup {
    email: String,
}

impl Validate for Signup {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        feq_kernel::server::validate::email("email", &self.email)
    }
}

async fn signup(ValidJson(body): ValidJson<Signup>) -> String {
    body.email
}

fn app() -> Router {
    Router::new()
        .route("/missing", get(|| async { Err::<(), _>(ApiError::not_found("Part not found")) }))
        .route(
            "/broken",
            get(|| async {
                Err::<(), ApiError>(
                    DatabaseError::Internal { message: "pool secret leaked".into(), context: None }
                        .into(),
                )
            }),
        )
        .route("/signup", post(signup))
}

async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn client_errors_render_their_message() {
    let (status, body) = call(app(), Request::get("/missing").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Part not found" }));
}

#[tokio::test]
async fn server_errors_are_masked() {
    let (status, body) = call(app(), Request::get("/broken").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn database_statuses_are_forwarded() {
    let err: ApiError = DatabaseError::Conflict { message: "duplicate".into(), context: None }.into();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_bodies_are_bad_requests() {
    let (status, body) = call(app(), json_post("/signup", &json!({ "email": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email must be a valid email address" }));

    let (status, _) = call(app(), json_post("/signup", &json!({ "mail": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let router = app();
    let response = router
        .oneshot(json_post("/signup", &json!({ "email": "op@example.com" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_disables_caching() {
    let (router, _) = system_router::<()>().split_for_parts();
    let response =
        router.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "up");
}

#[tokio::test]
async fn ab_variant_is_assigned_once() {
    let (router, _) = system_router::<()>().split_for_parts();

    let response =
        router.clone().oneshot(Request::get("/api/ab").body(Body::empty()).unwrap()).await.unwrap();
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_owned();
    assert!(set_cookie.starts_with("ab_variant="));
    assert!(set_cookie.contains("Max-Age=7776000"));

    let response = router
        .oneshot(
            Request::get("/api/ab").header(header::COOKIE, "ab_variant=c").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "variant": "c" }));
}
