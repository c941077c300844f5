use super::models::{
    LinkInput, SampleResearcherLink, create_link, delete_link, get_all_links, get_one_link,
    update_link,
};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_links, create_link_handler))
        .routes(routes!(
            get_link,
            update_link_handler,
            patch_link_handler,
            delete_link_handler
        ))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = OK, description = "Researcher assignments of active samples", body = Vec<SampleResearcherLink>)),
    tag = "sample_researchers"
)]
pub async fn list_links(
    State(state): State<AppState>,
) -> Result<Json<Vec<SampleResearcherLink>>, BusinessError> {
    Ok(Json(get_all_links(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = LinkInput,
    responses(
        (status = CREATED, description = "Researcher assigned", body = SampleResearcherLink),
        (status = BAD_REQUEST, description = "Missing id or unknown role"),
        (status = NOT_FOUND, description = "No such sample or researcher"),
        (status = CONFLICT, description = "Researcher already assigned to this sample"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "sample_researchers"
)]
pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SampleResearcherLink>), BusinessError> {
    let link = create_link(&state.db, state.validation_mode(), &body).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = i32, Path, description = "Link id")),
    responses(
        (status = OK, description = "The assignment", body = SampleResearcherLink),
        (status = NOT_FOUND, description = "No link with this id")
    ),
    tag = "sample_researchers"
)]
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SampleResearcherLink>, BusinessError> {
    Ok(Json(get_one_link(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = i32, Path, description = "Link id")),
    request_body = LinkInput,
    responses(
        (status = OK, description = "Assignment updated", body = SampleResearcherLink),
        (status = BAD_REQUEST, description = "Invalid id or unknown role"),
        (status = NOT_FOUND, description = "No such link, sample or researcher"),
        (status = CONFLICT, description = "Researcher already assigned to this sample"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "sample_researchers"
)]
pub async fn update_link_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<SampleResearcherLink>, BusinessError> {
    Ok(Json(update_link(&state.db, state.validation_mode(), id, &body).await?))
}

/// Same merge semantics as `PUT`
#[utoipa::path(
    patch,
    path = "/{id}",
    params(("id" = i32, Path, description = "Link id")),
    request_body = LinkInput,
    responses(
        (status = OK, description = "Assignment updated", body = SampleResearcherLink),
        (status = BAD_REQUEST, description = "Invalid id or unknown role"),
        (status = NOT_FOUND, description = "No such link, sample or researcher"),
        (status = CONFLICT, description = "Researcher already assigned to this sample"),
        (status = UNPROCESSABLE_ENTITY, description = "Sample is soft deleted")
    ),
    tag = "sample_researchers"
)]
pub async fn patch_link_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<SampleResearcherLink>, BusinessError> {
    Ok(Json(update_link(&state.db, state.validation_mode(), id, &body).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = i32, Path, description = "Link id")),
    responses(
        (status = NO_CONTENT, description = "Assignment removed"),
        (status = NOT_FOUND, description = "No link with this id"),
        (status = UNPROCESSABLE_ENTITY, description = "The sample is soft-deleted")
    ),
    tag = "sample_researchers"
)]
pub async fn delete_link_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, BusinessError> {
    delete_link(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
