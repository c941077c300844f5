use super::models::{
    GrowthMetric, NewGrowthMetric, create_growth_metric, delete_growth_metric,
    get_all_growth_metrics, get_one_growth_metric, update_growth_metric,
};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::common::validation::Payload;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_growth_metrics, create_growth_metric_handler))
        .routes(routes!(
            get_growth_metric,
            update_growth_metric_handler,
            patch_growth_metric_handler,
            delete_growth_metric_handler
        ))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = OK, description = "Measurements of active samples, newest first", body = Vec<GrowthMetric>)),
    tag = "growth_metrics"
)]
pub async fn list_growth_metrics(
    State(state): State<AppState>,
) -> Result<Json<Vec<GrowthMetric>>, BusinessError> {
    Ok(Json(get_all_growth_metrics(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = NewGrowthMetric,
    responses(
        (status = CREATED, description = "Measurement recorded and audited", body = GrowthMetric),
        (status = BAD_REQUEST, description = "Invalid measurement"),
        (status = NOT_FOUND, description = "No sample with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "growth_metrics"
)]
pub async fn create_growth_metric_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<GrowthMetric>), BusinessError> {
    let input = NewGrowthMetric::parse(&body, state.validation_mode())?;
    let metric = create_growth_metric(&state.db, input.sample_id, input.measurement).await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

#[utoipa::path(
    get,
    path = "/{growth_id}",
    params(("growth_id" = i32, Path, description = "Measurement id")),
    responses(
        (status = OK, description = "The measurement", body = GrowthMetric),
        (status = NOT_FOUND, description = "No measurement with this id")
    ),
    tag = "growth_metrics"
)]
pub async fn get_growth_metric(
    State(state): State<AppState>,
    Path(growth_id): Path<i32>,
) -> Result<Json<GrowthMetric>, BusinessError> {
    Ok(Json(get_one_growth_metric(&state.db, growth_id).await?))
}

#[utoipa::path(
    put,
    path = "/{growth_id}",
    params(("growth_id" = i32, Path, description = "Measurement id")),
    request_body = NewGrowthMetric,
    responses(
        (status = OK, description = "Measurement updated", body = GrowthMetric),
        (status = BAD_REQUEST, description = "Invalid measurement"),
        (status = NOT_FOUND, description = "No measurement with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "growth_metrics"
)]
pub async fn update_growth_metric_handler(
    State(state): State<AppState>,
    Path(growth_id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<GrowthMetric>, BusinessError> {
    let metric = update_growth_metric(&state.db, state.validation_mode(), growth_id, &body).await?;
    Ok(Json(metric))
}

/// Same merge semantics as `PUT`
#[utoipa::path(
    patch,
    path = "/{growth_id}",
    params(("growth_id" = i32, Path, description = "Measurement id")),
    request_body = NewGrowthMetric,
    responses(
        (status = OK, description = "Measurement updated", body = GrowthMetric),
        (status = BAD_REQUEST, description = "Invalid measurement"),
        (status = NOT_FOUND, description = "No measurement with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "growth_metrics"
)]
pub async fn patch_growth_metric_handler(
    State(state): State<AppState>,
    Path(growth_id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<GrowthMetric>, BusinessError> {
    let metric = update_growth_metric(&state.db, state.validation_mode(), growth_id, &body).await?;
    Ok(Json(metric))
}

#[utoipa::path(
    delete,
    path = "/{growth_id}",
    params(("growth_id" = i32, Path, description = "Measurement id")),
    responses(
        (status = NO_CONTENT, description = "Measurement deleted"),
        (status = NOT_FOUND, description = "No measurement with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "The sample is soft-deleted")
    ),
    tag = "growth_metrics"
)]
pub async fn delete_growth_metric_handler(
    State(state): State<AppState>,
    Path(growth_id): Path<i32>,
) -> Result<StatusCode, BusinessError> {
    delete_growth_metric(&state.db, growth_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
