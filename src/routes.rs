use crate::common::state::AppState;
use crate::config::Config;
use crate::{
    audit_logs, conditions, growth_metrics, locations, researchers, sample_researchers, samples,
};
use axum::{Router, extract::DefaultBodyLimit};
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(db: &DatabaseConnection, config: &Config) -> Router {
    #[derive(OpenApi)]
    #[openapi(info(
        title = "Plant Sampling API",
        description = "Field botany samples with their collection sites, conditions, researchers, growth records and audit trail"
    ))]
    struct ApiDoc;

    let app_state: AppState = AppState::new(db.clone(), config.clone());

    // Build the router with OpenAPI documentation
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(&app_state)) // Root routes
        .nest("/api/locations", locations::views::router(&app_state))
        .nest("/api/conditions", conditions::views::router(&app_state))
        .nest("/api/researchers", researchers::views::router(&app_state))
        .nest("/api/samples", samples::views::router(&app_state))
        .nest(
            "/api/sample-researchers",
            sample_researchers::views::router(&app_state),
        )
        .nest(
            "/api/growth-metrics",
            growth_metrics::views::router(&app_state),
        )
        .nest("/api/audit-logs", audit_logs::views::router(&app_state))
        .split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(1024 * 1024))
}
