mod common;

use axum::http::{Method, StatusCode};
use sqlx::PgPool;

use common::{body_json, build_test_app, request};

#[sqlx::test(migrations = "../db/migrations")]
async fn healthz_reports_ok(pool: PgPool) {
    let app = build_test_app(pool);

    let response = request(&app, Method::GET, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}
