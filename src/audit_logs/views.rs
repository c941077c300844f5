use super::models::{AuditLog, FILTERABLE, SORTABLE, get_all_audit_logs};
use crate::common::errors::BusinessError;
use crate::common::list::ListQuery;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_audit_logs))
        .with_state(state.clone())
}

/// Audit entries are read-only; there is no create, update or delete route.
/// Filterable on `sample_id` and `action`.
#[utoipa::path(
    get,
    path = "/",
    params(ListQuery),
    responses(
        (status = OK, description = "Audit entries, newest first", body = Vec<AuditLog>),
        (status = BAD_REQUEST, description = "Malformed filter, sort or range")
    ),
    tag = "audit_logs"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<(HeaderMap, Json<Vec<AuditLog>>), BusinessError> {
    let params = query.parse(&FILTERABLE, &SORTABLE)?;
    let page = get_all_audit_logs(&state.db, &params).await?;
    Ok(page.into_response("audit_logs"))
}
