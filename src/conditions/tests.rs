use super::models::{ConditionData, SoilType};
use crate::common::test_helpers::{
    create_full_object_hierarchy, create_test_condition, send, valid_condition_data,
};
use crate::common::validation::{Payload, ValidationMode};
use crate::config::test_helpers::setup_test_app;
use axum::http::StatusCode;
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn with(path: &[&str], value: Value) -> Value {
    let mut data = valid_condition_data();
    let mut cursor = &mut data;
    for key in &path[..path.len() - 1] {
        cursor = &mut cursor[*key];
    }
    cursor[path[path.len() - 1]] = value;
    data
}

#[rstest]
#[case(&["soil_composition", "pH"], json!(0))]
#[case(&["soil_composition", "pH"], json!(14))]
#[case(&["temperature"], json!(-50))]
#[case(&["temperature"], json!(60))]
#[case(&["humidity"], json!(0))]
#[case(&["humidity"], json!(100))]
#[case(&["altitude"], json!(-500))]
#[case(&["altitude"], json!(9000))]
fn test_condition_boundaries_accepted(#[case] path: &[&str], #[case] value: Value) {
    let data = with(path, value);
    assert!(ConditionData::validate(&data).is_empty(), "{data}");
}

#[rstest]
#[case(&["soil_composition", "pH"], json!(14.01), "condition_data.soil_composition.pH")]
#[case(&["soil_composition", "pH"], json!(-0.1), "condition_data.soil_composition.pH")]
#[case(&["temperature"], json!(60.1), "condition_data.temperature")]
#[case(&["temperature"], json!(-50.1), "condition_data.temperature")]
#[case(&["humidity"], json!(100.5), "condition_data.humidity")]
#[case(&["altitude"], json!(9001), "condition_data.altitude")]
#[case(&["altitude"], json!(-501), "condition_data.altitude")]
#[case(&["soil_composition", "type"], json!("gravel"), "condition_data.soil_composition.type")]
fn test_condition_out_of_range_rejected(
    #[case] path: &[&str],
    #[case] value: Value,
    #[case] field: &str,
) {
    let violations = ConditionData::validate(&with(path, value));
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].field, field);
}

#[test]
fn test_condition_numeric_strings_and_accumulation() {
    let parsed = ConditionData::parse(&with(&["humidity"], json!("55.5")), ValidationMode::FailFast)
        .unwrap();
    assert_eq!(parsed.humidity, Decimal::new(555, 1));
    assert_eq!(parsed.soil_composition.soil_type, SoilType::Loamy);

    let broken = json!({
        "soil_composition": {"pH": 20, "type": "loamy"},
        "temperature": 100,
        "humidity": 50
    });
    let fail_fast = ConditionData::parse(&broken, ValidationMode::FailFast).unwrap_err();
    assert_eq!(fail_fast.iter().count(), 1);

    let fields: Vec<String> = ConditionData::validate(&broken)
        .into_iter()
        .map(|v| v.field)
        .collect();
    assert!(fields.contains(&"condition_data.soil_composition.pH".to_string()));
    assert!(fields.contains(&"condition_data.soil_composition.nutrients".to_string()));
    assert!(fields.contains(&"condition_data.temperature".to_string()));
    assert!(fields.contains(&"condition_data.altitude".to_string()));
}

#[tokio::test]
async fn test_condition_crud_operations() {
    let app = setup_test_app().await;

    let (condition_id, body) = create_test_condition(&app).await.unwrap();
    assert_eq!(body["condition_data"]["soil_composition"]["pH"], 6.5);
    assert_eq!(body["condition_data"]["soil_composition"]["type"], "loamy");
    assert_eq!(
        body["condition_data"]["soil_composition"]["nutrients"]["nitrogen"],
        "medium"
    );
    assert!(body["recorded_at"].is_string());

    let uri = format!("/api/conditions/{condition_id}");
    let (status, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["condition_id"], condition_id);
    assert_eq!(fetched["condition_data"], body["condition_data"]);

    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "condition_data": with(&["temperature"], json!(-3.5)) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["condition_data"]["temperature"], -3.5);

    let (status, rejected) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "condition_data": with(&["humidity"], json!(101)) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected["error"]["field"], "condition_data.humidity");

    let (_, unchanged) = send(&app, "GET", &uri, None).await;
    assert_eq!(unchanged["condition_data"]["humidity"], 71.0);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_condition_delete_restricted_by_sample() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/conditions/{}", hierarchy.condition_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "REFERENTIAL_INTEGRITY_ERROR");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/conditions/{}", hierarchy.condition_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
