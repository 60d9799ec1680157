use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request};
use chrono::Utc;
use conteudos_core::Page;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::contents::ContentItem;
use super::*;

const ORIGIN: &str = "http://localhost:5173";

fn app_with_pool(pool: PgPool) -> Router {
    build_app(AppState { pool }, &[ORIGIN.to_string()])
}

/// Router backed by a pool that never connects. Only safe for requests that
/// are answered before any query runs.
fn offline_app() -> Router {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://conteudos@127.0.0.1:1/offline")
        .expect("lazy pool");
    app_with_pool(pool)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, headers, json)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_req(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn delete_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

// -------------------------------------------------------------------------
// Error envelope and serialization (no DB)
// -------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("validation_error", StatusCode::UNPROCESSABLE_ENTITY),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "msg").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[test]
fn validation_error_lists_fields() {
    let errors: ValidationErrors = Page::new(Some(0), None).expect_err("limit 0 is rejected");
    let value = serde_json::to_value(ApiError::validation("req-1", errors)).expect("serialize");
    assert_eq!(value["error"]["code"], "validation_error");
    assert_eq!(value["error"]["fields"][0]["field"], "limit");
    assert_eq!(value["meta"]["request_id"], "req-1");
}

#[test]
fn plain_errors_omit_fields() {
    let value = serde_json::to_value(ApiError::not_found("req-2")).expect("serialize");
    assert_eq!(value["error"]["message"], "content not found");
    assert!(value["error"].get("fields").is_none());
}

#[test]
fn content_item_serializes_type_key() {
    let item = ContentItem {
        id: "abc".to_string(),
        project_name: "Campaign A".to_string(),
        channel: "youtube".to_string(),
        content_type: "headline".to_string(),
        view_count: None,
        segment: None,
        publication_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1),
        client: None,
        link: "http://x".to_string(),
        description: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    let value = serde_json::to_value(&item).expect("serialize");
    assert_eq!(value["type"], "headline");
    assert!(value.get("content_type").is_none());
    assert_eq!(value["publication_date"], "2025-06-01");
    assert!(value["view_count"].is_null());
    assert!(value["updated_at"].is_null());
}

// -------------------------------------------------------------------------
// Router behaviour that never reaches the store
// -------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok_without_database() {
    let (status, headers, body) = send(offline_app(), get_req("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    assert!(headers.contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn client_request_id_is_echoed() {
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .body(Body::empty())
        .expect("request");
    let (_, headers, _) = send(offline_app(), request).await;
    assert_eq!(
        headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
}

#[tokio::test]
async fn create_with_missing_fields_is_422_with_field_detail() {
    let (status, _, body) = send(
        offline_app(),
        json_req(
            Method::POST,
            "/conteudos",
            &json!({ "project_name": "  ", "channel": "youtube" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    let fields: Vec<&str> = body["error"]["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["project_name", "type", "link"]);
}

#[tokio::test]
async fn create_with_wrong_type_is_422() {
    let (status, _, body) = send(
        offline_app(),
        json_req(
            Method::POST,
            "/conteudos",
            &json!({
                "project_name": "P",
                "channel": "site",
                "type": "manchete",
                "link": "http://x",
                "view_count": "lots",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["fields"][0]["field"], "view_count");
    assert!(body["error"]["fields"][0]["message"]
        .as_str()
        .is_some_and(|m| m.contains("invalid type")));
}

#[tokio::test]
async fn update_with_wrong_type_names_the_field() {
    let (status, _, body) = send(
        offline_app(),
        json_req(
            Method::PUT,
            "/conteudos/any-id",
            &json!({ "publication_date": "yesterday" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "publication_date");
}

#[tokio::test]
async fn create_with_non_object_body_is_422() {
    let (status, _, body) = send(
        offline_app(),
        json_req(Method::POST, "/conteudos", &json!("just a string")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "body");
}

#[tokio::test]
async fn create_with_malformed_json_is_400() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/conteudos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, _, body) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn list_rejects_out_of_range_paging() {
    for (uri, field) in [
        ("/conteudos?limit=0", "limit"),
        ("/conteudos?limit=201", "limit"),
        ("/conteudos?offset=-1", "offset"),
        ("/conteudos?limit=abc", "limit"),
        ("/conteudos?offset=1.5", "offset"),
    ] {
        let (status, _, body) = send(offline_app(), get_req(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "uri {uri}");
        assert_eq!(body["error"]["code"], "validation_error", "uri {uri}");
        assert_eq!(body["error"]["fields"][0]["field"], field, "uri {uri}");
    }
}

#[tokio::test]
async fn invalid_utf8_id_gets_error_envelope() {
    for request in [
        get_req("/conteudos/%FF"),
        delete_req("/conteudos/%FF"),
        json_req(Method::PUT, "/conteudos/%FF", &json!({ "view_count": 1 })),
    ] {
        let (status, headers, body) = send(offline_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(
            body["meta"]["request_id"].as_str(),
            headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
        );
    }
}

#[tokio::test]
async fn update_with_blank_required_field_is_422() {
    let (status, _, body) = send(
        offline_app(),
        json_req(
            Method::PUT,
            "/conteudos/any-id",
            &json!({ "channel": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"][0]["field"], "channel");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/conteudos")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .expect("request");
    let (status, headers, _) = send(offline_app(), request).await;

    assert!(status.is_success());
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(ORIGIN)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .expect("request");
    let (_, headers, _) = send(offline_app(), request).await;
    assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// -------------------------------------------------------------------------
// Content routes integration tests (with DB)
// -------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn readiness_reports_database_ok(pool: sqlx::PgPool) {
    let (status, _, body) = send(app_with_pool(pool), get_req("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": "ok" }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn content_lifecycle_create_list_update_delete(pool: sqlx::PgPool) {
    let app = app_with_pool(pool);

    let (status, _, created) = send(
        app.clone(),
        json_req(
            Method::POST,
            "/conteudos",
            &json!({
                "project_name": "Campaign A",
                "channel": "youtube",
                "type": "headline",
                "link": "http://x",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().expect("id").to_string();
    assert!(!id.is_empty());
    assert!(created["created_at"].is_string());
    assert!(created["view_count"].is_null());
    assert!(created["updated_at"].is_null());

    let (status, _, listed) = send(app.clone(), get_req("/conteudos?canal=youtube")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed
        .as_array()
        .expect("array")
        .iter()
        .any(|item| item["id"] == id.as_str()));

    let (status, _, updated) = send(
        app.clone(),
        json_req(
            Method::PUT,
            &format!("/conteudos/{id}"),
            &json!({ "view_count": 100 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["view_count"], 100);
    assert!(updated["updated_at"].is_string());
    assert_eq!(updated["project_name"], "Campaign A");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, _, body) = send(app.clone(), delete_req(&format!("/conteudos/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _, body) = send(app, get_req(&format!("/conteudos/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_id_is_404_for_get_update_delete(pool: sqlx::PgPool) {
    let app = app_with_pool(pool);

    let (status, _, _) = send(app.clone(), get_req("/conteudos/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        app.clone(),
        json_req(Method::PUT, "/conteudos/nope", &json!({ "view_count": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(app, delete_req("/conteudos/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_applies_type_query_and_limit(pool: sqlx::PgPool) {
    let app = app_with_pool(pool);

    for (name, channel, kind, client) in [
        ("Talk One", "youtube", "talks", Some("Globex")),
        ("Talk Two", "youtube", "talks", None),
        ("Short", "youtube", "shorts", Some("globex brasil")),
        ("Story", "instagram", "stories", None),
    ] {
        let (status, _, _) = send(
            app.clone(),
            json_req(
                Method::POST,
                "/conteudos",
                &json!({
                    "project_name": name,
                    "channel": channel,
                    "type": kind,
                    "link": format!("https://example.com/{channel}"),
                    "client": client,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, _, talks) = send(app.clone(), get_req("/conteudos?canal=youtube&tipo=talks")).await;
    let names: Vec<&str> = talks
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|i| i["project_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Talk Two", "Talk One"]);

    let (_, _, globex) = send(app.clone(), get_req("/conteudos?q=GLOBEX")).await;
    let names: Vec<&str> = globex
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|i| i["project_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Short", "Talk One"]);

    let (_, _, limited) = send(app, get_req("/conteudos?limit=1&offset=1")).await;
    let items = limited.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["project_name"], "Short");
}
