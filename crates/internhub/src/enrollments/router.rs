use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::observer::ReconcileObserver;
use super::reconciler::{EnrollmentReconciler, ReconcileMode};
use super::repository::EnrollmentStore;

/// Shared collaborators for the admin reconciliation endpoint.
pub struct ReconcileContext<S, O> {
    pub store: Arc<S>,
    pub observer: Arc<O>,
}

impl<S, O> Clone for ReconcileContext<S, O> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            observer: Arc::clone(&self.observer),
        }
    }
}

/// Optional request body for a reconciliation trigger.
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// Router builder exposing the admin enrollment back-fill trigger.
pub fn enrollment_router<S, O>(store: Arc<S>, observer: Arc<O>) -> Router
where
    S: EnrollmentStore + 'static,
    O: ReconcileObserver + 'static,
{
    Router::new()
        .route(
            "/api/v1/admin/enrollments/reconcile",
            post(reconcile_handler::<S, O>),
        )
        .with_state(ReconcileContext { store, observer })
}

const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// An empty body means "apply"; anything else must be a well-formed JSON request.
async fn read_request(request: Request) -> Result<ReconcileRequest, Response> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REQUEST_BYTES)
        .await
        .map_err(|err| {
            let payload = json!({
                "error": format!("unable to read request body: {err}"),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReconcileRequest::default());
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    match axum::Json::<ReconcileRequest>::from_request(request, &()).await {
        Ok(axum::Json(body)) => Ok(body),
        Err(rejection) => Err(rejection.into_response()),
    }
}

pub(crate) async fn reconcile_handler<S, O>(
    State(context): State<ReconcileContext<S, O>>,
    request: Request,
) -> Response
where
    S: EnrollmentStore + 'static,
    O: ReconcileObserver + 'static,
{
    let request = match read_request(request).await {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mode = if request.dry_run {
        ReconcileMode::DryRun
    } else {
        ReconcileMode::Apply
    };

    let reconciler = EnrollmentReconciler::with_mode(context.store, context.observer, mode);
    let outcome = tokio::task::spawn_blocking(move || reconciler.run()).await;

    match outcome {
        Ok(Ok(summary)) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Ok(Err(err)) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            let payload = json!({
                "error": format!("reconciliation task aborted: {join_error}"),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
