use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use feq_commerce::WebhookVerifier;
use feq_database::Database;
use feq_kernel::domain::config::{ApiConfig, Secret};
use feq_kernel::server::ApiState;
use feq_mailer::Mailer;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, body_string_contains, header as has_header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_SECRET: &str = "whsec_test";
const BUYER_ID: &str = "a1a1a1a1-0000-4000-8000-000000000001";
const ORG_ID: &str = "d4d4d4d4-0000-4000-8000-000000000004";
const COURSE_ID: &str = "e5e5e5e5-0000-4000-8000-000000000005";

fn app(server: &MockServer) -> Router {
    let mut config = ApiConfig::default();
    config.site.base_url = "https://flatearthequipment.com".to_owned();
    config.payments.api_url = server.uri();
    config.payments.secret_key = Secret::new("sk_test_123");
    config.payments.webhook_secret = Secret::new(WEBHOOK_SECRET);

    let database = Database::builder()
        .url(server.uri())
        .anon_key("anon")
        .service_role_key("service")
        .init()
        .unwrap();
    let state = ApiState::builder()
        .register_slice(feq_identity::init(&config))
        .register_slice(feq_commerce::init(&config).unwrap())
        .config(config)
        .db(database)
        .mailer(Mailer::builder().from("sales@example.com").init().unwrap())
        .build()
        .unwrap();
    feq_commerce::router().with_state(state).split_for_parts().0
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn parts_search_pages_with_an_exact_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .and(query_param("category", "eq.hydraulics"))
        .and(query_param("or", "(name.ilike.*pump*,sku.ilike.*pump*,brand.ilike.*pump*)"))
        .and(query_param("limit", "24"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-range", "0-0/31").set_body_json(json!([{
                "id": "0c0c0c0c-0000-4000-8000-00000000000c",
                "slug": "hydraulic-pump",
                "sku": "HP-100",
                "name": "Hydraulic pump",
                "brand": "Toyota",
                "category": "hydraulics",
                "description": null,
                "price_cents": 48900,
                "stripe_price_id": "price_secret",
                "in_stock": true,
                "image_url": null
            }])),
        )
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::get("/api/parts?q=pump%2C%28%29&category=hydraulics").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = json_body(response).await;
    assert_eq!(page["total"], 31);
    assert_eq!(page["limit"], 24);
    assert_eq!(page["items"][0]["slug"], "hydraulic-pump");
    assert!(page["items"][0].get("stripe_price_id").is_none());
}

#[tokio::test]
async fn out_of_range_limits_are_rejected() {
    let server = MockServer::start().await;
    for uri in ["/api/parts?limit=0", "/api/parts?limit=101", "/api/parts?limit=ten"] {
        let response =
            app(&server).oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn unknown_parts_are_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(Request::get("/api/parts/mast-chain").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rental_requests_are_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rental_requests"))
        .and(body_partial_json(json!({ "email": "buyer@example.com", "start_date": "2026-11-02" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "0d0d0d0d-0000-4000-8000-00000000000d" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = json!({
        "equipment_type": "electric forklift",
        "start_date": "2026-11-02",
        "end_date": "2026-11-09",
        "name": "Dana Smith",
        "email": "Buyer@Example.com",
        "phone": null,
        "zip": "78701",
        "notes": "Need a 5,000 lb unit"
    });
    let response = app(&server).oneshot(post_json("/api/rentals", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut backwards = request.clone();
    backwards["end_date"] = json!("2026-10-01");
    let response = app(&server).oneshot(post_json("/api/rentals", &backwards)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn parts_checkout_creates_a_stripe_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .and(query_param("slug", "in.(seat-switch)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "0e0e0e0e-0000-4000-8000-00000000000e",
            "slug": "seat-switch",
            "sku": "SS-2",
            "name": "Seat switch",
            "brand": null,
            "category": "electrical",
            "description": null,
            "price_cents": 1999,
            "stripe_price_id": "price_123",
            "in_stock": true,
            "image_url": null
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(has_header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("line_items%5B0%5D%5Bprice%5D=price_123"))
        .and(body_string_contains("line_items%5B0%5D%5Bquantity%5D=2"))
        .and(body_string_contains("metadata%5Bkind%5D=parts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1",
            "object": "checkout.session"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = json!({
        "kind": "parts",
        "items": [{ "slug": "seat-switch", "quantity": 2 }],
        "email": "buyer@example.com"
    });
    let response = app(&server).oneshot(post_json("/api/checkout", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], "cs_test_1");
}

#[tokio::test]
async fn training_checkout_needs_a_signed_in_buyer() {
    let server = MockServer::start().await;
    let request = json!({ "kind": "training", "course_slug": "forklift-operator", "seats": 5 });
    let response = app(&server).oneshot(post_json("/api/checkout", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn completed_event(session_id: &str) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "object": "checkout.session",
            "amount_total": 29500,
            "currency": "usd",
            "customer_details": { "email": "owner@example.com" },
            "metadata": {
                "kind": "training",
                "course_id": COURSE_ID,
                "seats": "5",
                "org_id": ORG_ID,
                "user_id": BUYER_ID
            }
        }}
    })
    .to_string()
    .into_bytes()
}

fn webhook(payload: Vec<u8>, signature: &str) -> Request<Body> {
    Request::post("/api/stripe/webhook")
        .header("stripe-signature", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap()
}

fn sign(payload: &[u8]) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET, 300).sign(Utc::now().timestamp(), payload).unwrap()
}

#[tokio::test]
async fn webhooks_with_bad_signatures_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(201)).expect(0).mount(&server).await;

    let payload = completed_event("cs_test_1");
    let forged = WebhookVerifier::new("whsec_other", 300)
        .sign(Utc::now().timestamp(), &payload)
        .unwrap();
    let response = app(&server).oneshot(webhook(payload.clone(), &forged)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stale = WebhookVerifier::new(WEBHOOK_SECRET, 300)
        .sign(Utc::now().timestamp() - 301, &payload)
        .unwrap();
    let response = app(&server).oneshot(webhook(payload.clone(), &stale)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut tampered = payload.clone();
    let signature = sign(&payload);
    tampered.extend_from_slice(b" ");
    let response = app(&server).oneshot(webhook(tampered, &signature)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_checkouts_grant_seats_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .and(query_param("on_conflict", "stripe_session_id"))
        .and(body_partial_json(json!({ "stripe_session_id": "cs_new", "status": "paid" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/grant_seats"))
        .and(body_partial_json(json!({ "p_org_id": ORG_ID, "p_course_id": COURSE_ID, "p_quantity": 5 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .and(body_partial_json(json!({ "status": "fulfilled" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let payload = completed_event("cs_new");
    let response = app(&server).oneshot(webhook(payload.clone(), &sign(&payload))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["received"], true);

    let replay = completed_event("cs_seen");
    let response = app(&server).oneshot(webhook(replay.clone(), &sign(&replay))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn fulfilment_failures_are_still_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 2 }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/grant_seats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH")).respond_with(ResponseTemplate::new(204)).expect(0).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let payload = completed_event("cs_flaky");
    let response = app(&server).oneshot(webhook(payload.clone(), &sign(&payload))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn other_events_are_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(201)).expect(0).mount(&server).await;

    let payload = json!({ "id": "evt_2", "type": "payment_intent.created", "data": { "object": {} } })
        .to_string()
        .into_bytes();
    let response = app(&server).oneshot(webhook(payload.clone(), &sign(&payload))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
