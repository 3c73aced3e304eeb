//! Template surface: creation, validation failures with step indices,
//! and version-on-edit immutability.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;

use common::{body_json, build_test_app, request};

fn valid_template_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "steps": [
            {"provider": "ocr-base", "input": {"type": "original"}, "config": {"lang": "deu"}},
            {"provider": "ocr-clean", "input": {"type": "previous_step"}, "config": {}}
        ]
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_and_fetch_a_template(pool: PgPool) {
    let app = build_test_app(pool);

    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(valid_template_body("deed-chain")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["name"], "deed-chain");
    assert_eq!(body["data"]["version"], 1);

    let response = request(&app, Method::GET, &format!("/api/v1/templates/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_chain_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(json!({"name": "empty", "steps": []})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("at least one step"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn dangling_step_reference_is_rejected_with_its_index(pool: PgPool) {
    let app = build_test_app(pool);

    // Only steps 0-2 exist, but step 1 references step 5.
    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(json!({
            "name": "dangling",
            "steps": [
                {"provider": "a", "input": {"type": "original"}},
                {"provider": "b", "input": {"type": "specific_step", "step": 5}},
                {"provider": "c", "input": {"type": "previous_step"}}
            ]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Step 1"), "{message}");
    assert!(message.contains("step 5"), "{message}");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn first_step_must_read_the_original(pool: PgPool) {
    let app = build_test_app(pool);

    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(json!({
            "name": "bad-first",
            "steps": [{"provider": "a", "input": {"type": "previous_step"}}]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Step 0"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_template_name_conflicts(pool: PgPool) {
    let app = build_test_app(pool);

    let first = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(valid_template_body("letters")),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(valid_template_body("letters")),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn editing_an_unpinned_template_creates_a_new_version(pool: PgPool) {
    let app = build_test_app(pool);

    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(valid_template_body("letters")),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = request(
        &app,
        Method::PUT,
        &format!("/api/v1/templates/{id}"),
        Some(json!({
            "steps": [{"provider": "ocr-v2", "input": {"type": "original"}}]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["version"], 2);
    assert_ne!(body["data"]["id"].as_i64().unwrap(), id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn editing_a_template_with_active_jobs_is_rejected(pool: PgPool) {
    let app = build_test_app(pool.clone());

    let response = request(
        &app,
        Method::POST,
        "/api/v1/templates",
        Some(valid_template_body("letters")),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // A pending job pins the template.
    folio_db::repositories::JobRepo::submit(
        &pool,
        &folio_db::models::job::SubmitJob {
            template_id: id,
            input_root: Some("/data/in".to_string()),
            input_files: None,
            recursive: None,
        },
    )
    .await
    .unwrap();

    let response = request(
        &app,
        Method::PUT,
        &format!("/api/v1/templates/{id}"),
        Some(json!({
            "steps": [{"provider": "ocr-v2", "input": {"type": "original"}}]
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["code"], "CONFLICT");
}
