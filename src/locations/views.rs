use super::models::{
    Location, LocationInput, create_location, delete_location, get_all_locations,
    get_one_location, update_location,
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
        .routes(routes!(list_locations, create_location_handler))
        .routes(routes!(
            get_location,
            update_location_handler,
            delete_location_handler
        ))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = OK, description = "All sampling locations, newest first", body = Vec<Location>),
        (status = INTERNAL_SERVER_ERROR, description = "Storage failure")
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Location>>, BusinessError> {
    Ok(Json(get_all_locations(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = LocationInput,
    responses(
        (status = CREATED, description = "Location created", body = Location),
        (status = BAD_REQUEST, description = "Invalid location data")
    ),
    tag = "locations"
)]
pub async fn create_location_handler(
    State(state): State<AppState>,
    Json(input): Json<LocationInput>,
) -> Result<(StatusCode, Json<Location>), BusinessError> {
    let location = create_location(&state.db, state.validation_mode(), &input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[utoipa::path(
    get,
    path = "/{location_id}",
    params(("location_id" = i32, Path, description = "Location id")),
    responses(
        (status = OK, description = "The location", body = Location),
        (status = NOT_FOUND, description = "No location with this id")
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(location_id): Path<i32>,
) -> Result<Json<Location>, BusinessError> {
    Ok(Json(get_one_location(&state.db, location_id).await?))
}

#[utoipa::path(
    put,
    path = "/{location_id}",
    params(("location_id" = i32, Path, description = "Location id")),
    request_body = LocationInput,
    responses(
        (status = OK, description = "Location replaced", body = Location),
        (status = BAD_REQUEST, description = "Invalid location data"),
        (status = NOT_FOUND, description = "No location with this id")
    ),
    tag = "locations"
)]
pub async fn update_location_handler(
    State(state): State<AppState>,
    Path(location_id): Path<i32>,
    Json(input): Json<LocationInput>,
) -> Result<Json<Location>, BusinessError> {
    let location = update_location(&state.db, state.validation_mode(), location_id, &input).await?;
    Ok(Json(location))
}

#[utoipa::path(
    delete,
    path = "/{location_id}",
    params(("location_id" = i32, Path, description = "Location id")),
    responses(
        (status = NO_CONTENT, description = "Location deleted"),
        (status = NOT_FOUND, description = "No location with this id"),
        (status = CONFLICT, description = "Location is still referenced by samples")
    ),
    tag = "locations"
)]
pub async fn delete_location_handler(
    State(state): State<AppState>,
    Path(location_id): Path<i32>,
) -> Result<StatusCode, BusinessError> {
    delete_location(&state.db, location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
