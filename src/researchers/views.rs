use super::models::{
    FILTERABLE, Researcher, ResearcherInput, SORTABLE, create_researcher, delete_researcher,
    get_all_researchers, get_one_researcher, update_researcher,
};
use crate::common::errors::BusinessError;
use crate::common::list::ListQuery;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_researchers, create_researcher_handler))
        .routes(routes!(
            get_researcher,
            replace_researcher,
            patch_researcher,
            delete_researcher_handler
        ))
        .with_state(state.clone())
}

/// Filterable on name, email and affiliation; ordered by name by default
#[utoipa::path(
    get,
    path = "/",
    params(ListQuery),
    responses(
        (status = OK, description = "Researchers matching the filter", body = Vec<Researcher>),
        (status = BAD_REQUEST, description = "Malformed filter, sort or range")
    ),
    tag = "researchers"
)]
pub async fn list_researchers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<(HeaderMap, Json<Vec<Researcher>>), BusinessError> {
    let params = query.parse(&FILTERABLE, &SORTABLE)?;
    let page = get_all_researchers(&state.db, &params).await?;
    Ok(page.into_response("researchers"))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = ResearcherInput,
    responses(
        (status = CREATED, description = "Researcher created", body = Researcher),
        (status = BAD_REQUEST, description = "Missing name or malformed email"),
        (status = CONFLICT, description = "Email already registered")
    ),
    tag = "researchers"
)]
pub async fn create_researcher_handler(
    State(state): State<AppState>,
    Json(input): Json<ResearcherInput>,
) -> Result<(StatusCode, Json<Researcher>), BusinessError> {
    let researcher = create_researcher(&state.db, state.validation_mode(), &input).await?;
    Ok((StatusCode::CREATED, Json(researcher)))
}

#[utoipa::path(
    get,
    path = "/{researcher_id}",
    params(("researcher_id" = i32, Path, description = "Researcher id")),
    responses(
        (status = OK, description = "The researcher", body = Researcher),
        (status = NOT_FOUND, description = "No researcher with this id")
    ),
    tag = "researchers"
)]
pub async fn get_researcher(
    State(state): State<AppState>,
    Path(researcher_id): Path<i32>,
) -> Result<Json<Researcher>, BusinessError> {
    Ok(Json(get_one_researcher(&state.db, researcher_id).await?))
}

#[utoipa::path(
    put,
    path = "/{researcher_id}",
    params(("researcher_id" = i32, Path, description = "Researcher id")),
    request_body = ResearcherInput,
    responses(
        (status = OK, description = "Researcher replaced", body = Researcher),
        (status = BAD_REQUEST, description = "Missing name or malformed email"),
        (status = NOT_FOUND, description = "No researcher with this id"),
        (status = CONFLICT, description = "Email already registered")
    ),
    tag = "researchers"
)]
pub async fn replace_researcher(
    State(state): State<AppState>,
    Path(researcher_id): Path<i32>,
    Json(input): Json<ResearcherInput>,
) -> Result<Json<Researcher>, BusinessError> {
    let researcher =
        update_researcher(&state.db, state.validation_mode(), researcher_id, &input, false).await?;
    Ok(Json(researcher))
}

#[utoipa::path(
    patch,
    path = "/{researcher_id}",
    params(("researcher_id" = i32, Path, description = "Researcher id")),
    request_body = ResearcherInput,
    responses(
        (status = OK, description = "Researcher updated", body = Researcher),
        (status = BAD_REQUEST, description = "Blank name or malformed email"),
        (status = NOT_FOUND, description = "No researcher with this id"),
        (status = CONFLICT, description = "Email already registered")
    ),
    tag = "researchers"
)]
pub async fn patch_researcher(
    State(state): State<AppState>,
    Path(researcher_id): Path<i32>,
    Json(input): Json<ResearcherInput>,
) -> Result<Json<Researcher>, BusinessError> {
    let researcher =
        update_researcher(&state.db, state.validation_mode(), researcher_id, &input, true).await?;
    Ok(Json(researcher))
}

#[utoipa::path(
    delete,
    path = "/{researcher_id}",
    params(("researcher_id" = i32, Path, description = "Researcher id")),
    responses(
        (status = NO_CONTENT, description = "Researcher and their sample links deleted"),
        (status = NOT_FOUND, description = "No researcher with this id")
    ),
    tag = "researchers"
)]
pub async fn delete_researcher_handler(
    State(state): State<AppState>,
    Path(researcher_id): Path<i32>,
) -> Result<StatusCode, BusinessError> {
    delete_researcher(&state.db, researcher_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
