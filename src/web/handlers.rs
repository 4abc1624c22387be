//! Route handlers for the four views, session end and health

use super::views::{self, DashboardView};
use super::{session_cookie, session_from_headers, AppError, AppState};
use crate::error::ControllerError;
use crate::feedback::{count_labels, FeedbackLabel};
use crate::session::SessionId;
use crate::utils::looks_like_pdf;
use axum::{
    extract::{Form, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
pub struct FeedbackForm {
    label: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    sessions: usize,
    feedback_records: Option<usize>,
    uptime_secs: u64,
}

/// HTML page plus the session cookie
fn page(id: SessionId, status: StatusCode, html: String) -> Response {
    (status, [(header::SET_COOKIE, session_cookie(id))], Html(html)).into_response()
}

/// Status for a failed controller call rendered inside a view
fn error_status(err: &ControllerError) -> StatusCode {
    match err {
        ControllerError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ControllerError::Processing(_) => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// Handlers
// ============================================================================

// GET /
pub async fn index_handler() -> Redirect {
    Redirect::to("/summary")
}

// GET /summary
pub async fn summary_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = session_from_headers(&state, &headers);
    let session = session.lock().await;
    page(id, StatusCode::OK, views::summary_page(&session, &[], None))
}

// POST /summary (multipart, field "pdf")
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (id, session) = session_from_headers(&state, &headers);

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("pdf") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();
        let is_pdf_upload = file_name.to_lowercase().ends_with(".pdf") || content_type == "application/pdf";
        if !is_pdf_upload {
            return Err(AppError(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("'{}' is not a PDF file", file_name),
            ));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError(StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) = upload
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| AppError(StatusCode::BAD_REQUEST, "Please choose a PDF file to upload".to_string()))?;

    // A .pdf name is not enough; the content has to be a PDF too
    if !looks_like_pdf(&bytes) {
        return Err(AppError(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("'{}' is not a PDF file", file_name),
        ));
    }

    let mut session = session.lock().await;
    let response = match state.controller.process_upload(&mut session, &bytes, &file_name).await {
        Ok(_) => page(
            id,
            StatusCode::OK,
            views::summary_page(
                &session,
                &[
                    "Text Extraction Completed!!!",
                    "Saved to the Vector Store!",
                    "Summary Generation is completed!",
                ],
                None,
            ),
        ),
        Err(e) => {
            warn!("Upload '{}' failed: {}", file_name, e);
            page(id, error_status(&e), views::summary_page(&session, &[], Some(&e.to_string())))
        }
    };
    Ok(response)
}

// GET /qa
pub async fn qa_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = session_from_headers(&state, &headers);
    let session = session.lock().await;
    page(id, StatusCode::OK, views::qa_page(&session, None, None, None))
}

// POST /qa (form field "query")
pub async fn ask_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<QuestionForm>,
) -> Response {
    let (id, session) = session_from_headers(&state, &headers);
    let session = session.lock().await;

    match state.controller.ask(&session, &form.query).await {
        Ok(answer) => page(id, StatusCode::OK, views::qa_page(&session, Some(&form.query), Some(&answer), None)),
        Err(e) => {
            debug!("Question not answered: {}", e);
            page(id, error_status(&e), views::qa_page(&session, Some(&form.query), None, Some(&e.to_string())))
        }
    }
}

// GET /feedback
pub async fn feedback_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = session_from_headers(&state, &headers);
    let session = session.lock().await;
    page(id, StatusCode::OK, views::feedback_page(&session, false, None))
}

// POST /feedback (form field "label" = Yes|No)
pub async fn submit_feedback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let label: FeedbackLabel = form.label.parse().map_err(|e| AppError(StatusCode::BAD_REQUEST, e))?;

    let (id, session) = session_from_headers(&state, &headers);
    let mut session = session.lock().await;

    let response = match state.controller.submit_feedback(&mut session, label) {
        Ok(thanks) => page(id, StatusCode::OK, views::feedback_page(&session, thanks, None)),
        Err(e) => page(id, StatusCode::UNPROCESSABLE_ENTITY, views::feedback_page(&session, false, Some(&e.to_string()))),
    };
    Ok(response)
}

// GET /dashboard
pub async fn dashboard_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, session) = session_from_headers(&state, &headers);
    let session = session.lock().await;
    let store = state.controller.feedback_store();

    if !store.exists() {
        return page(id, StatusCode::OK, views::dashboard_page(&session, DashboardView::NoFeedback));
    }

    match store.load_all() {
        Ok(records) => {
            let counts = count_labels(&records);
            page(id, StatusCode::OK, views::dashboard_page(&session, DashboardView::Records(&records, &counts)))
        }
        Err(e) => {
            warn!("Failed to read feedback log: {}", e);
            page(
                id,
                StatusCode::INTERNAL_SERVER_ERROR,
                views::dashboard_page(&session, DashboardView::Unreadable(&e.to_string())),
            )
        }
    }
}

// GET /dashboard/chart.svg
pub async fn chart_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let counts = state.controller.feedback_store().aggregate_by_label()
        .map_err(|e| AppError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        super::chart::count_chart_svg(&counts),
    ).into_response())
}

// POST /session/end
pub async fn end_session_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = super::cookie_session_id(&headers) {
        state.sessions.end(id);
    }
    (
        [(header::SET_COOKIE, super::expired_session_cookie())],
        Redirect::to("/summary"),
    ).into_response()
}

// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let feedback_records = state.controller.feedback_store().load_all().ok().map(|r| r.len());
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
        feedback_records,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
