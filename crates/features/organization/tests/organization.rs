use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use feq_database::Database;
use feq_kernel::domain::config::ApiConfig;
use feq_kernel::server::ApiState;
use feq_mailer::Mailer;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as has_header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG_ID: &str = "5d1b4b8e-2c8f-4d55-a1f4-0f1e2d3c4b5a";
const COURSE_ID: &str = "9e0c7a61-0d4e-4d43-8f37-5b8b7d5e6f70";
const ADMIN_ID: &str = "11111111-2222-4333-8444-555555555555";
const TRAINER_ID: &str = "66666666-7777-4888-8999-aaaaaaaaaaaa";
const STRANGER_ID: &str = "bbbbbbbb-cccc-4ddd-8eee-ffffffffffff";
const OWNER_ID: &str = "12121212-3434-4565-8787-909090909090";
const ENROLLMENT_ID: &str = "0f0e0d0c-0b0a-4909-8807-060504030201";

fn app(server: &MockServer) -> Router {
    let config = ApiConfig::default();
    let database = Database::builder()
        .url(server.uri())
        .anon_key("anon")
        .service_role_key("service")
        .init()
        .unwrap();
    let state = ApiState::builder()
        .register_slice(feq_identity::init(&config))
        .register_slice(feq_organization::init(&config))
        .register_slice(feq_audit::init(&database))
        .config(config)
        .db(database)
        .mailer(Mailer::builder().from("training@example.com").init().unwrap())
        .build()
        .unwrap();
    feq_organization::router().with_state(state).split_for_parts().0
}

/// Tokens are named after the user they resolve to.
async fn mock_people(server: &MockServer) {
    for (token, id) in [("admin", ADMIN_ID), ("trainer", TRAINER_ID), ("stranger", STRANGER_ID)] {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(has_header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
            .mount(server)
            .await;
    }
    for (id, role) in [(ADMIN_ID, "admin"), (TRAINER_ID, "trainer")] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/org_members"))
            .and(query_param("user_id", format!("eq.{id}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": role }])))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/rest/v1/org_members"))
        .and(query_param("user_id", format!("eq.{STRANGER_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri).header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty()).unwrap()
}

fn post(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn seats_report_remaining_capacity() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/org_seats"))
        .and(query_param("org_id", format!("eq.{ORG_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "course_id": COURSE_ID, "total_seats": 10, "used_seats": 4 }
        ])))
        .mount(&server)
        .await;

    let response =
        app(&server).oneshot(get(&format!("/api/orgs/{ORG_ID}/seats"), "trainer")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body[0]["available"], 6);
}

#[tokio::test]
async fn outsiders_and_anonymous_callers_are_turned_away() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    let uri = format!("/api/orgs/{ORG_ID}/roster");

    let response = app(&server).oneshot(get(&uri, "stranger")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response =
        app(&server).oneshot(Request::get(&uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(&server).oneshot(get("/api/orgs/not-a-uuid/roster", "admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trainers_cannot_invite() {
    let server = MockServer::start().await;
    mock_people(&server).await;

    let body = json!({ "email": "new@example.com", "course_id": COURSE_ID });
    let response = app(&server)
        .oneshot(post(&format!("/api/orgs/{ORG_ID}/invites"), "trainer", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn exhausted_pools_reject_invitations() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/allocate_seat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/seat_invites"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let body = json!({ "email": "new@example.com", "course_id": COURSE_ID });
    let response = app(&server)
        .oneshot(post(&format!("/api/orgs/{ORG_ID}/invites"), "admin", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invitations_reserve_a_seat() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/allocate_seat"))
        .and(body_partial_json(json!({ "p_org_id": ORG_ID, "p_course_id": COURSE_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/seat_invites"))
        .and(body_partial_json(json!({ "email": "new@example.com", "status": "pending" })))
        .respond_with(|request: &wiremock::Request| {
            let row: Value = serde_json::from_slice(&request.body).unwrap_or_default();
            ResponseTemplate::new(201).set_body_json(json!({
                "id": "3a3a3a3a-4b4b-4c4c-8d8d-5e5e5e5e5e5e",
                "org_id": ORG_ID,
                "course_id": COURSE_ID,
                "email": "new@example.com",
                "code": row["code"],
                "status": "pending",
                "created_at": "2026-01-05T10:00:00Z"
            }))
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/release_seat"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let body = json!({ "email": "New@Example.com ", "course_id": COURSE_ID });
    let response = app(&server)
        .oneshot(post(&format!("/api/orgs/{ORG_ID}/invites"), "admin", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let invite = json_body(response).await;
    let code = invite["code"].as_str().unwrap();
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn failed_invitations_hand_the_seat_back() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/allocate_seat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/seat_invites"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/release_seat"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({ "email": "new@example.com", "course_id": COURSE_ID });
    let response = app(&server)
        .oneshot(post(&format!("/api/orgs/{ORG_ID}/invites"), "admin", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn admins_cannot_grant_ownership() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/org_members"))
        .and(query_param("on_conflict", "org_id,user_id"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let uri = format!("/api/orgs/{ORG_ID}/members");

    let owner = json!({ "user_id": STRANGER_ID, "role": "owner" });
    let response = app(&server).oneshot(post(&uri, "admin", &owner)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let trainer = json!({ "user_id": STRANGER_ID, "role": "trainer" });
    let response = app(&server).oneshot(post(&uri, "admin", &trainer)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let bogus = json!({ "user_id": STRANGER_ID, "role": "emperor" });
    let response = app(&server).oneshot(post(&uri, "admin", &bogus)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_cannot_demote_an_owner() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/org_members"))
        .and(query_param("user_id", format!("eq.{OWNER_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "owner" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/org_members"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let uri = format!("/api/orgs/{ORG_ID}/members");

    for role in ["member", "admin"] {
        let demotion = json!({ "user_id": OWNER_ID, "role": role });
        let response = app(&server).oneshot(post(&uri, "admin", &demotion)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role}");
    }
}

#[tokio::test]
async fn claiming_creates_an_enrollment() {
    let server = MockServer::start().await;
    mock_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_seat_invite"))
        .and(body_partial_json(json!({ "p_code": "ABCD2345", "p_user_id": STRANGER_ID })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(ENROLLMENT_ID)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_seat_invite"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "no invite" })))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post("/api/invites/claim", "stranger", &json!({ "code": "abcd2345" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["enrollment_id"], ENROLLMENT_ID);

    let response = app(&server)
        .oneshot(post("/api/invites/claim", "stranger", &json!({ "code": "ZZZZ9999" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
