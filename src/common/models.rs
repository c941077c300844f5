use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Serialize)]
pub struct HealthCheck {
    pub status: String,
}

/// Entry point listing the resource collections and their sub-routes
#[derive(ToSchema, Deserialize, Serialize)]
pub struct ApiIndex {
    pub message: String,
    pub app_name: String,
    pub deployment: String,
    pub endpoints: BTreeMap<String, BTreeMap<String, String>>,
}

impl ApiIndex {
    pub fn new(app_name: &str, deployment: &str) -> Self {
        let resources: [(&str, &[(&str, &str)]); 7] = [
            (
                "locations",
                &[("list_create", "/api/locations"), ("detail", "/api/locations/{location_id}")],
            ),
            (
                "conditions",
                &[("list_create", "/api/conditions"), ("detail", "/api/conditions/{condition_id}")],
            ),
            (
                "researchers",
                &[
                    ("list_create", "/api/researchers"),
                    ("detail", "/api/researchers/{researcher_id}"),
                ],
            ),
            (
                "samples",
                &[
                    ("list_create", "/api/samples"),
                    ("detail", "/api/samples/{sample_id}"),
                    ("hard_delete", "/api/samples/{sample_id}/hard-delete"),
                    ("growth_metrics", "/api/samples/{sample_id}/growth-metrics"),
                    ("audit_logs", "/api/samples/{sample_id}/audit-logs"),
                ],
            ),
            (
                "sample_researchers",
                &[
                    ("list_create", "/api/sample-researchers"),
                    ("detail", "/api/sample-researchers/{id}"),
                ],
            ),
            (
                "growth_metrics",
                &[
                    ("list_create", "/api/growth-metrics"),
                    ("detail", "/api/growth-metrics/{growth_id}"),
                ],
            ),
            ("audit_logs", &[("list", "/api/audit-logs")]),
        ];

        let endpoints = resources
            .into_iter()
            .map(|(name, routes)| {
                let routes = routes
                    .iter()
                    .map(|(kind, path)| ((*kind).to_string(), (*path).to_string()))
                    .collect();
                (name.to_string(), routes)
            })
            .collect();

        Self {
            message: "Plant Sampling API".to_string(),
            app_name: app_name.to_string(),
            deployment: deployment.to_string(),
            endpoints,
        }
    }
}
