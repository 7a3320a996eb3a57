use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use feq_database::Returning;
use feq_derive::{api_handler, api_model};
use feq_identity::CurrentUser;
use feq_kernel::domain::constants::{AUDIT_TAG, ERROR_LOGS};
use feq_kernel::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

pub(crate) const MAX_MESSAGE_CHARS: usize = 4000;
const MAX_STACK_CHARS: usize = 16_000;
const MAX_FIELD_CHARS: usize = 2048;

/// Error report sent by the browser.
#[api_model(deny_unknown_fields = false)]
pub struct ClientErrorReport {
    pub message: String,
    pub stack: Option<String>,
    /// Page where the error happened
    pub url: Option<String>,
    pub user_agent: Option<String>,
    /// Free-form details
    #[schema(value_type = Option<Object>)]
    pub context: Option<Value>,
}

#[api_model]
pub struct ReportAccepted {
    pub ok: bool,
}

#[derive(Serialize)]
struct ErrorLogRow {
    message: String,
    stack: Option<String>,
    url: Option<String>,
    user_agent: Option<String>,
    user_id: Option<Uuid>,
    context: Option<Value>,
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_owned(),
        None => text.to_owned(),
    }
}

#[api_handler(
    post,
    path = "/api/log-error",
    request_body = ClientErrorReport,
    responses((status = OK, description = "Always acknowledged", body = ReportAccepted)),
    tag = AUDIT_TAG,
)]
pub(crate) async fn log_error_handler(
    State(state): State<ApiState>,
    user: Result<CurrentUser, ApiError>,
    headers: HeaderMap,
    body: Result<Json<ClientErrorReport>, JsonRejection>,
) -> Json<ReportAccepted> {
    let ack = Json(ReportAccepted { ok: true });

    let report = match body {
        Ok(Json(report)) => report,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Unreadable client error report");
            return ack;
        },
    };

    let header_agent =
        headers.get(USER_AGENT).and_then(|value| value.to_str().ok()).map(str::to_owned);
    let row = ErrorLogRow {
        message: truncate(&report.message, MAX_MESSAGE_CHARS),
        stack: report.stack.as_deref().map(|s| truncate(s, MAX_STACK_CHARS)),
        url: report.url.as_deref().map(|s| truncate(s, MAX_FIELD_CHARS)),
        user_agent: report.user_agent.or(header_agent).map(|s| truncate(&s, MAX_FIELD_CHARS)),
        user_id: user.ok().map(|u| u.id()),
        context: report.context,
    };

    if let Err(err) =
        state.database.service().from(ERROR_LOGS).insert::<_, Value>(&row, Returning::Minimal).await
    {
        warn!(error = %err, "Client error report dropped");
    }

    ack
}
