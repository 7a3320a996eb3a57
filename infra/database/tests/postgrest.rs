use feq_database::{Database, DatabaseError, Returning};
use serde::Deserialize;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct Part {
    slug: String,
    price_cents: i64,
}

/// Matches the raw `Prefer` header, which carries comma separated directives.
fn prefer(expected: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        request.headers.get("prefer").and_then(|value| value.to_str().ok()) == Some(expected)
    }
}

fn database(server: &MockServer) -> Database {
    Database::builder()
        .url(server.uri())
        .anon_key("anon-key")
        .service_role_key("service-key")
        .init()
        .expect("database client")
}

#[test]
fn builder_requires_every_setting() {
    let err = Database::builder().url("https://x.supabase.co").anon_key("a").init().unwrap_err();
    assert!(matches!(err, DatabaseError::Config { .. }));

    let err = Database::builder()
        .url("ftp://x")
        .anon_key("a")
        .service_role_key("s")
        .init()
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Config { .. }));
}

#[tokio::test]
async fn anon_reads_send_filters_and_anon_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(query_param("in_stock", "eq.true"))
        .and(query_param("order", "name.asc,price_cents.desc"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "slug": "mast-chain", "price_cents": 4200 },
            { "slug": "seat-switch", "price_cents": 1999 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let parts: Vec<Part> = database(&server)
        .anon()
        .from("parts")
        .eq("in_stock", true)
        .order("name", true)
        .order("price_cents", false)
        .limit(2)
        .fetch()
        .await
        .unwrap();

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].slug, "mast-chain");
    assert_eq!(parts[1].price_cents, 1999);
}

#[tokio::test]
async fn user_clients_forward_the_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/enrollments"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let db = database(&server);
    let rows: Vec<Value> = db.as_user("user-token").from("enrollments").fetch().await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn single_row_miss_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .and(header("accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned",
            "details": "The result contains 0 rows"
        })))
        .mount(&server)
        .await;

    let err = database(&server)
        .anon()
        .from("parts")
        .eq("slug", "missing")
        .fetch_one::<Part>()
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn pages_carry_the_exact_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/parts"))
        .and(prefer("count=exact"))
        .and(query_param("offset", "24"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "24-24/25")
                .set_body_json(json!([{ "slug": "forks", "price_cents": 90000 }])),
        )
        .mount(&server)
        .await;

    let page = database(&server)
        .anon()
        .from("parts")
        .limit(24)
        .offset(24)
        .fetch_page::<Part>()
        .await
        .unwrap();

    assert_eq!(page.total, 25);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn inserts_use_service_role_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/audit_logs"))
        .and(header("authorization", "Bearer service-key"))
        .and(prefer("return=minimal"))
        .and(body_json(json!({ "action": "seat.invite" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let rows: Vec<Value> = database(&server)
        .service()
        .from("audit_logs")
        .insert(&json!({ "action": "seat.invite" }), Returning::Minimal)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn duplicate_inserts_are_reported_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .and(query_param("on_conflict", "stripe_session_id"))
        .and(prefer("resolution=ignore-duplicates,return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let inserted: Vec<Value> = database(&server)
        .service()
        .from("orders")
        .insert_new(&json!({ "stripe_session_id": "cs_1" }), "stripe_session_id")
        .await
        .unwrap();
    assert!(inserted.is_empty());
}

#[tokio::test]
async fn rpc_results_and_unique_violations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/allocate_seat"))
        .and(body_json(json!({ "p_org_id": "o", "p_course_id": "c" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/claim_seat_invite"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let db = database(&server);
    let allocated: bool = db
        .service()
        .rpc("allocate_seat", &json!({ "p_org_id": "o", "p_course_id": "c" }))
        .await
        .unwrap();
    assert!(!allocated);

    let err = db
        .service()
        .rpc::<_, Value>("claim_seat_invite", &json!({ "p_code": "X" }))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn void_rpc_accepts_empty_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/grant_seats"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    database(&server)
        .service()
        .rpc_void("grant_seats", &json!({ "p_quantity": 5 }))
        .await
        .unwrap();
}
