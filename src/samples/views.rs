use super::models::{
    HardDeleteResponse, Sample, SampleFilter, SampleInput, SampleRead, SampleSummary,
    SoftDeleteResponse,
};
use super::services::{
    SampleChanges, SampleLifecycle, find_sample, list_active_samples, load_sample,
    project_sample,
};
use crate::audit_logs::models::{AuditLog, get_audit_logs_for_sample};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::common::validation::Payload;
use crate::growth_metrics::models::{
    GrowthMeasurement, GrowthMetric, create_growth_metric, get_growth_metrics_for_sample,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_samples, create_sample))
        .routes(routes!(
            get_sample,
            replace_sample,
            patch_sample,
            soft_delete_sample
        ))
        .routes(routes!(hard_delete_sample))
        .routes(routes!(list_sample_growth_metrics, add_sample_growth_metrics))
        .routes(routes!(list_sample_audit_logs))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    params(SampleFilter),
    responses((status = OK, description = "Active samples, newest first", body = Vec<SampleSummary>)),
    tag = "samples"
)]
pub async fn list_samples(
    State(state): State<AppState>,
    Query(filter): Query<SampleFilter>,
) -> Result<Json<Vec<SampleSummary>>, BusinessError> {
    Ok(Json(list_active_samples(&state.db, &filter).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = SampleInput,
    responses(
        (status = CREATED, description = "Sample created and audited", body = Sample),
        (status = BAD_REQUEST, description = "Invalid sample detail or missing reference"),
        (status = NOT_FOUND, description = "Referenced location or conditions do not exist")
    ),
    tag = "samples"
)]
pub async fn create_sample(
    State(state): State<AppState>,
    Json(input): Json<SampleInput>,
) -> Result<(StatusCode, Json<Sample>), BusinessError> {
    let sample = SampleLifecycle::new(&state.db, state.validation_mode())
        .create(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(project_sample(&state.db, sample).await?)))
}

#[utoipa::path(
    get,
    path = "/{sample_id}",
    params(("sample_id" = i32, Path, description = "Sample id")),
    responses(
        (status = OK, description = "The sample, or a deleted marker if it was soft deleted", body = SampleRead),
        (status = NOT_FOUND, description = "No sample with this id")
    ),
    tag = "samples"
)]
pub async fn get_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
) -> Result<Json<SampleRead>, BusinessError> {
    Ok(Json(load_sample(&state.db, sample_id).await?))
}

#[utoipa::path(
    put,
    path = "/{sample_id}",
    params(("sample_id" = i32, Path, description = "Sample id")),
    request_body = SampleInput,
    responses(
        (status = OK, description = "Sample detail replaced and audited", body = Sample),
        (status = BAD_REQUEST, description = "Invalid sample detail"),
        (status = NOT_FOUND, description = "No sample, location or conditions with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "samples"
)]
pub async fn replace_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
    Json(input): Json<SampleInput>,
) -> Result<Json<Sample>, BusinessError> {
    let sample = SampleLifecycle::new(&state.db, state.validation_mode())
        .update(sample_id, SampleChanges::replace(input))
        .await?;
    Ok(Json(project_sample(&state.db, sample).await?))
}

#[utoipa::path(
    patch,
    path = "/{sample_id}",
    params(("sample_id" = i32, Path, description = "Sample id")),
    request_body = SampleInput,
    responses(
        (status = OK, description = "Sample detail merged and audited", body = Sample),
        (status = BAD_REQUEST, description = "Invalid sample detail"),
        (status = NOT_FOUND, description = "No sample, location or conditions with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "samples"
)]
pub async fn patch_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
    Json(input): Json<SampleInput>,
) -> Result<Json<Sample>, BusinessError> {
    let sample = SampleLifecycle::new(&state.db, state.validation_mode())
        .update(sample_id, SampleChanges::merge(input))
        .await?;
    Ok(Json(project_sample(&state.db, sample).await?))
}

#[utoipa::path(
    delete,
    path = "/{sample_id}",
    params(("sample_id" = i32, Path, description = "Sample id")),
    responses(
        (status = OK, description = "Sample soft deleted, or already deleted", body = SoftDeleteResponse),
        (status = NOT_FOUND, description = "No sample with this id")
    ),
    tag = "samples"
)]
pub async fn soft_delete_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
) -> Result<Json<SoftDeleteResponse>, BusinessError> {
    let outcome = SampleLifecycle::new(&state.db, state.validation_mode())
        .soft_delete(sample_id)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/{sample_id}/hard-delete",
    params(("sample_id" = i32, Path, description = "Sample id")),
    responses(
        (status = OK, description = "Sample and its children permanently removed", body = HardDeleteResponse),
        (status = NOT_FOUND, description = "No sample with this id")
    ),
    tag = "samples"
)]
pub async fn hard_delete_sample(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
) -> Result<Json<HardDeleteResponse>, BusinessError> {
    let outcome = SampleLifecycle::new(&state.db, state.validation_mode())
        .hard_delete(sample_id)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/{sample_id}/growth-metrics",
    params(("sample_id" = i32, Path, description = "Sample id")),
    responses(
        (status = OK, description = "Growth measurements of the sample, newest first", body = Vec<GrowthMetric>),
        (status = NOT_FOUND, description = "No active sample with this id")
    ),
    tag = "samples"
)]
pub async fn list_sample_growth_metrics(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
) -> Result<Json<Vec<GrowthMetric>>, BusinessError> {
    let sample = find_sample(&state.db, sample_id).await?;
    if sample.is_deleted {
        return Err(crate::not_found!("Plant sample", sample_id));
    }
    Ok(Json(get_growth_metrics_for_sample(&state.db, sample_id).await?))
}

#[utoipa::path(
    post,
    path = "/{sample_id}/growth-metrics",
    params(("sample_id" = i32, Path, description = "Sample id")),
    request_body = GrowthMeasurement,
    responses(
        (status = CREATED, description = "Measurement recorded and audited", body = GrowthMetric),
        (status = BAD_REQUEST, description = "Invalid measurement"),
        (status = NOT_FOUND, description = "No sample with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "samples"
)]
pub async fn add_sample_growth_metrics(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<GrowthMetric>), BusinessError> {
    let measurement = GrowthMeasurement::parse(&body, state.validation_mode())?;
    let metric = create_growth_metric(&state.db, sample_id, measurement).await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

#[utoipa::path(
    get,
    path = "/{sample_id}/audit-logs",
    params(("sample_id" = i32, Path, description = "Sample id, including hard-deleted ones")),
    responses((status = OK, description = "Audit entries of the sample, newest first", body = Vec<AuditLog>)),
    tag = "samples"
)]
pub async fn list_sample_audit_logs(
    State(state): State<AppState>,
    Path(sample_id): Path<i32>,
) -> Result<Json<Vec<AuditLog>>, BusinessError> {
    Ok(Json(get_audit_logs_for_sample(&state.db, sample_id).await?))
}
