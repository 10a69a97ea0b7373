use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::scorecard::router::scorecard_router;
use crate::scorecard::session::SessionId;

fn bearer(id: SessionId) -> String {
    format!("Bearer {id}")
}

fn post_json(uri: &str, id: SessionId, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, bearer(id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

fn get(uri: &str, id: SessionId) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, bearer(id))
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn opening_a_session_sets_the_cookie() {
    let (service, _) = build_service();
    let router = scorecard_router(Arc::new(service));

    let response = router
        .oneshot(
            Request::post("/api/v1/sessions")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("cookie set");
    let payload = read_json_body(response).await;
    let id = payload["session_id"].as_str().expect("session id");
    assert!(cookie.starts_with(&format!("session={id};")));
    assert_eq!(payload["screen"], "login");
}

#[tokio::test]
async fn logout_swaps_the_session_cookie() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let id = evaluator_session(&service, BUYER);
    let router = scorecard_router(service.clone());

    let response = router
        .clone()
        .oneshot(post_json("/api/v1/sessions/logout", id, json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("cookie set");
    let payload = read_json_body(response).await;
    let fresh = payload["session_id"].as_str().expect("session id");
    assert_ne!(fresh, id.to_string());
    assert!(cookie.starts_with(&format!("session={fresh};")));

    let stale = router
        .oneshot(get("/api/v1/session", id))
        .await
        .expect("route executes");
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() {
    let (service, _) = build_service();

    let response = crate::scorecard::router::summary_handler::<crate::scorecard::InMemoryTables>(
        State(Arc::new(service)),
        HeaderMap::new(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "no session token supplied");
}

#[tokio::test]
async fn login_then_submit_over_http() {
    let (service, tables) = build_service();
    let service = Arc::new(service);
    let id = service.open_session().expect("session opens").session_id;
    let router = scorecard_router(service.clone());

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions/login",
            id,
            json!({ "email": BUYER }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["screen"], "evaluate");

    let response = router
        .clone()
        .oneshot(get(
            "/api/v1/evaluations/form?type=comercial&category=Embalagens&supplier=Acme",
            id,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let form = read_json_body(response).await;
    assert_eq!(form["status"], "open");
    assert_eq!(form["evaluation"], "Comercial");
    assert_eq!(form["questions"][0]["text"], "Preço");

    let submission = json!({
        "type": "Comercial",
        "category": "Embalagens",
        "supplier": "Acme",
        "answers": { "Preço": 2.0, "Prazo": 2.5 },
    });
    let response = router
        .clone()
        .oneshot(post_json("/api/v1/evaluations", id, submission.clone()))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(read_json_body(response).await["outcome"]["kind"], "created");

    let response = router
        .oneshot(post_json("/api/v1/evaluations", id, submission))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "already_submitted");

    assert_eq!(
        tables
            .table(RESPONSES_DOC, "Comercial")
            .map(|rows| rows.len()),
        Some(2)
    );
}

#[tokio::test]
async fn forbidden_categories_map_to_403() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let id = evaluator_session(&service, ENGINEER);

    let response = scorecard_router(service)
        .oneshot(get(
            "/api/v1/evaluations/suppliers?type=comercial&category=Embalagens",
            id,
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn write_failures_map_to_bad_gateway_with_detail() {
    let service = Arc::new(service_with(Arc::new(ReadOnlyTables {
        inner: seeded_tables(),
    })));
    let id = evaluator_session(&service, BUYER);

    let response = scorecard_router(service)
        .oneshot(post_json(
            "/api/v1/evaluations",
            id,
            json!({
                "type": "Comercial",
                "category": "Embalagens",
                "supplier": "Acme",
                "answers": { "Preço": 2.0 },
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "the spreadsheet service failed, please retry");
    assert_eq!(payload["detail"], "spreadsheet operation failed: quota exceeded");
}

#[tokio::test]
async fn admin_exports_stream_csv() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let admin = admin_session(&service);
    let router = scorecard_router(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/admin/exports/suppliers", admin))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION),
        Some(
            &"attachment; filename=\"avaliacoes_por_fornecedor.csv\""
                .parse::<axum::http::HeaderValue>()
                .expect("header value")
        )
    );
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    assert_eq!(&body[..], "Fornecedor,Qtd. Avaliações,Média Ponderada\n".as_bytes());

    let response = router
        .oneshot(get("/api/v1/admin/exports/everything", admin))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
