use super::models::{
    Condition, ConditionInput, create_condition, delete_condition, get_all_conditions,
    get_one_condition, update_condition,
};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_conditions, create_condition_handler))
        .routes(routes!(
            get_condition,
            update_condition_handler,
            delete_condition_handler
        ))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = OK, description = "All condition records, most recently recorded first", body = Vec<Condition>)
    ),
    tag = "conditions"
)]
pub async fn list_conditions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Condition>>, BusinessError> {
    Ok(Json(get_all_conditions(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = ConditionInput,
    responses(
        (status = CREATED, description = "Conditions recorded", body = Condition),
        (status = BAD_REQUEST, description = "Invalid condition data")
    ),
    tag = "conditions"
)]
pub async fn create_condition_handler(
    State(state): State<AppState>,
    Json(input): Json<ConditionInput>,
) -> Result<(StatusCode, Json<Condition>), BusinessError> {
    let condition = create_condition(&state.db, state.validation_mode(), &input).await?;
    Ok((StatusCode::CREATED, Json(condition)))
}

#[utoipa::path(
    get,
    path = "/{condition_id}",
    params(("condition_id" = i32, Path, description = "Condition record id")),
    responses(
        (status = OK, description = "The condition record", body = Condition),
        (status = NOT_FOUND, description = "No condition record with this id")
    ),
    tag = "conditions"
)]
pub async fn get_condition(
    State(state): State<AppState>,
    Path(condition_id): Path<i32>,
) -> Result<Json<Condition>, BusinessError> {
    Ok(Json(get_one_condition(&state.db, condition_id).await?))
}

#[utoipa::path(
    put,
    path = "/{condition_id}",
    params(("condition_id" = i32, Path, description = "Condition record id")),
    request_body = ConditionInput,
    responses(
        (status = OK, description = "Condition record replaced", body = Condition),
        (status = BAD_REQUEST, description = "Invalid condition data"),
        (status = NOT_FOUND, description = "No condition record with this id")
    ),
    tag = "conditions"
)]
pub async fn update_condition_handler(
    State(state): State<AppState>,
    Path(condition_id): Path<i32>,
    Json(input): Json<ConditionInput>,
) -> Result<Json<Condition>, BusinessError> {
    let condition =
        update_condition(&state.db, state.validation_mode(), condition_id, &input).await?;
    Ok(Json(condition))
}

#[utoipa::path(
    delete,
    path = "/{condition_id}",
    params(("condition_id" = i32, Path, description = "Condition record id")),
    responses(
        (status = NO_CONTENT, description = "Condition record deleted"),
        (status = NOT_FOUND, description = "No condition record with this id"),
        (status = CONFLICT, description = "Condition record is still referenced by samples")
    ),
    tag = "conditions"
)]
pub async fn delete_condition_handler(
    State(state): State<AppState>,
    Path(condition_id): Path<i32>,
) -> Result<StatusCode, BusinessError> {
    delete_condition(&state.db, condition_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
