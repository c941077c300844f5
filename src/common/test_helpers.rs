/// Shared test helper functions for creating test objects across the test suite
///
/// Builders follow the object hierarchy:
/// Locations + Conditions → Samples → {Growth metrics, Researcher links}
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

/// Extract response body as JSON for testing
pub async fn extract_response_body(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let body: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        let raw_text = String::from_utf8_lossy(&bytes);
        json!({"error": raw_text})
    });
    (status, body)
}

/// Send a request with an optional JSON body and decode the response
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = if let Some(data) = body {
        builder = builder.header("content-type", "application/json");
        builder.body(Body::from(data.to_string())).unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    extract_response_body(response).await
}

/// GET a listing, returning its `Content-Range` header alongside the body
pub async fn get_list(app: &axum::Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let content_range = response
        .headers()
        .get(axum::http::header::CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let (status, body) = extract_response_body(response).await;
    (status, content_range, body)
}

/// Percent-encodes a JSON query parameter value
pub fn encode_json(value: &Value) -> String {
    value
        .to_string()
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (byte as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

pub fn valid_location_data() -> Value {
    json!({
        "coordinates": {"latitude": 51.4769, "longitude": -0.2914},
        "region": "Surrey",
        "country": "United Kingdom",
        "site_type": "forest"
    })
}

pub fn valid_condition_data() -> Value {
    json!({
        "soil_composition": {
            "pH": 6.5,
            "nutrients": {"nitrogen": "medium", "phosphorus": "low"},
            "type": "loamy"
        },
        "temperature": 14.2,
        "humidity": 71,
        "altitude": 45
    })
}

/// Create a test location, returning its id and body
pub async fn create_test_location(app: &axum::Router) -> Result<(i64, Value), String> {
    create_test_location_with_data(app, valid_location_data()).await
}

pub async fn create_test_location_with_data(
    app: &axum::Router,
    location_data: Value,
) -> Result<(i64, Value), String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/locations",
        Some(json!({ "location_data": location_data })),
    )
    .await;

    if status == StatusCode::CREATED {
        Ok((body["location_id"].as_i64().unwrap(), body))
    } else {
        Err(format!("Failed to create location: Status {status}, Body: {body}"))
    }
}

/// Create a test environmental condition record, returning its id and body
pub async fn create_test_condition(app: &axum::Router) -> Result<(i64, Value), String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/conditions",
        Some(json!({ "condition_data": valid_condition_data() })),
    )
    .await;

    if status == StatusCode::CREATED {
        Ok((body["condition_id"].as_i64().unwrap(), body))
    } else {
        Err(format!("Failed to create condition: Status {status}, Body: {body}"))
    }
}

/// Create a researcher with a unique email
pub async fn create_test_researcher(app: &axum::Router) -> Result<(i64, Value), String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/researchers",
        Some(json!({
            "name": "Test Researcher",
            "email": format!("researcher-{}@example.org", Uuid::new_v4()),
            "affiliation": "Field Botany Unit"
        })),
    )
    .await;

    if status == StatusCode::CREATED {
        Ok((body["researcher_id"].as_i64().unwrap(), body))
    } else {
        Err(format!("Failed to create researcher: Status {status}, Body: {body}"))
    }
}

/// Create a sample with a customizable detail payload
pub async fn create_test_sample_with_detail(
    app: &axum::Router,
    location_id: i64,
    condition_id: i64,
    sample_detail: Value,
) -> Result<(i64, Value), String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": sample_detail,
            "location_id": location_id,
            "condition_id": condition_id
        })),
    )
    .await;

    if status == StatusCode::CREATED {
        Ok((body["sample_id"].as_i64().unwrap(), body))
    } else {
        Err(format!("Failed to create sample: Status {status}, Body: {body}"))
    }
}

/// Create a location, a condition and a sample referencing both
pub async fn create_full_object_hierarchy(
    app: &axum::Router,
) -> Result<FullObjectHierarchy, String> {
    let (location_id, _) = create_test_location(app).await?;
    let (condition_id, _) = create_test_condition(app).await?;
    let (sample_id, sample) = create_test_sample_with_detail(
        app,
        location_id,
        condition_id,
        json!({
            "species": "Quercus robur",
            "common_name": "English Oak",
            "sampling_date": "2024-03-01"
        }),
    )
    .await?;

    Ok(FullObjectHierarchy {
        location_id,
        condition_id,
        sample_id,
        sample,
    })
}

/// Represents a complete object hierarchy for testing
pub struct FullObjectHierarchy {
    pub location_id: i64,
    pub condition_id: i64,
    pub sample_id: i64,
    pub sample: Value,
}
