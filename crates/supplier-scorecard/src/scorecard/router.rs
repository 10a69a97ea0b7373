use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::EvaluationType;
use super::report::ReportKind;
use super::service::{
    EvaluationSubmission, ScorecardError, ScorecardService, SubmissionStatus,
};
use super::session::{Screen, SessionId, SessionView};
use super::store::TableGateway;

/// Router builder exposing the evaluation, summary, and admin endpoints.
pub fn scorecard_router<G>(service: Arc<ScorecardService<G>>) -> Router
where
    G: TableGateway + 'static,
{
    Router::new()
        .route("/api/v1/sessions", post(open_session_handler::<G>))
        .route("/api/v1/session", get(session_handler::<G>))
        .route("/api/v1/sessions/login", post(login_handler::<G>))
        .route("/api/v1/sessions/admin", post(admin_login_handler::<G>))
        .route("/api/v1/sessions/navigate", post(navigate_handler::<G>))
        .route("/api/v1/sessions/finish", post(finish_handler::<G>))
        .route("/api/v1/sessions/logout", post(logout_handler::<G>))
        .route("/api/v1/evaluations", post(submit_handler::<G>))
        .route("/api/v1/evaluations/types", get(types_handler::<G>))
        .route("/api/v1/evaluations/categories", get(categories_handler::<G>))
        .route("/api/v1/evaluations/suppliers", get(suppliers_handler::<G>))
        .route("/api/v1/evaluations/form", get(form_handler::<G>))
        .route("/api/v1/summary", get(summary_handler::<G>))
        .route("/api/v1/admin/panel", get(admin_panel_handler::<G>))
        .route("/api/v1/admin/exports/:report", get(export_handler::<G>))
        .with_state(service)
}

impl IntoResponse for ScorecardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, detail = ?self.detail(), "scorecard request failed");
        }
        let mut payload = json!({ "error": self.to_string() });
        if let Some(detail) = self.detail() {
            payload["detail"] = json!(detail);
        }
        (status, axum::Json(payload)).into_response()
    }
}

/// Sheets calls block, so every service call leaves the async workers.
async fn blocking<G, T, F>(service: Arc<ScorecardService<G>>, job: F) -> Result<T, ScorecardError>
where
    G: TableGateway + 'static,
    T: Send + 'static,
    F: FnOnce(&ScorecardService<G>) -> Result<T, ScorecardError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&service))
        .await
        .map_err(|err| ScorecardError::Worker(err.to_string()))?
}

fn session_id(headers: &HeaderMap) -> Result<SessionId, ScorecardError> {
    Ok(SessionId::from_headers(headers)?)
}

fn json_response<T: serde::Serialize>(result: Result<T, ScorecardError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminLoginRequest {
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigateRequest {
    screen: Screen,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TypeQuery {
    #[serde(rename = "type")]
    evaluation: EvaluationType,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryQuery {
    #[serde(rename = "type")]
    evaluation: EvaluationType,
    category: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FormQuery {
    #[serde(rename = "type")]
    evaluation: EvaluationType,
    category: String,
    supplier: String,
}

pub(crate) async fn open_session_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
) -> Response
where
    G: TableGateway + 'static,
{
    match blocking(service, |service| service.open_session()).await {
        Ok(view) => with_session_cookie(StatusCode::CREATED, view),
        Err(error) => error.into_response(),
    }
}

fn with_session_cookie(status: StatusCode, view: SessionView) -> Response {
    let cookie = format!("session={}; Path=/; HttpOnly; SameSite=Lax", view.session_id);
    let mut response = (status, axum::Json(view)).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

pub(crate) async fn session_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.session(id)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn login_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.login(id, &request.email)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn admin_login_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AdminLoginRequest>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => {
            blocking(service, move |service| {
                service.admin_login(id, &request.password)
            })
            .await
        }
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn navigate_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<NavigateRequest>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.navigate(id, request.screen)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn finish_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.finish(id)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn logout_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.logout(id)).await,
        Err(error) => Err(error),
    };
    match result {
        Ok(view) => with_session_cookie(StatusCode::OK, view),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn types_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.evaluation_types(id)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn categories_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    Query(query): Query<TypeQuery>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.categories(id, query.evaluation)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn suppliers_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    Query(query): Query<CategoryQuery>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => {
            blocking(service, move |service| {
                service.suppliers(id, query.evaluation, &query.category)
            })
            .await
        }
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn form_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    Query(query): Query<FormQuery>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => {
            blocking(service, move |service| {
                service.form(id, query.evaluation, &query.category, &query.supplier)
            })
            .await
        }
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn submit_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<EvaluationSubmission>,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.submit(id, submission)).await,
        Err(error) => Err(error),
    };
    match result {
        Ok(receipt) => {
            let status = match receipt.status {
                SubmissionStatus::Recorded => StatusCode::CREATED,
                SubmissionStatus::AlreadySubmitted => StatusCode::OK,
            };
            (status, axum::Json(receipt)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn summary_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.summary(id)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn admin_panel_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: TableGateway + 'static,
{
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.admin_panel(id)).await,
        Err(error) => Err(error),
    };
    json_response(result)
}

pub(crate) async fn export_handler<G>(
    State(service): State<Arc<ScorecardService<G>>>,
    headers: HeaderMap,
    Path(report): Path<String>,
) -> Response
where
    G: TableGateway + 'static,
{
    let Some(kind) = ReportKind::parse(&report) else {
        return ScorecardError::UnknownReport(report).into_response();
    };
    let result = match session_id(&headers) {
        Ok(id) => blocking(service, move |service| service.export(id, kind)).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(export) => {
            let disposition = format!("attachment; filename=\"{}\"", export.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.bytes,
            )
                .into_response()
        }
        Err(error) => error.into_response(),
    }
}
