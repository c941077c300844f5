use crate::audit_logs::models as audit;
use crate::common::test_helpers::{
    create_full_object_hierarchy, create_test_condition, create_test_location,
    create_test_location_with_data, create_test_researcher, create_test_sample_with_detail, send,
    valid_location_data,
};
use crate::config::test_helpers::{setup_test_app, setup_test_app_with_db};
use crate::{growth_metrics::models as growth_metrics, sample_researchers::models as links};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{Value, json};

fn actions(logs: &Value) -> Vec<String> {
    logs.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap().to_string())
        .collect()
}

/// Makes every `event` statement on `table` abort with a storage error
async fn fail_storage_on(db: &DatabaseConnection, event: &str, table: &str) {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER fail_{event}_{table} BEFORE {event} ON {table} \
         BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END"
    ))
    .await
    .unwrap();
}

async fn audit_logs_for(app: &axum::Router, sample_id: i64) -> Value {
    let (status, logs) =
        send(app, "GET", &format!("/api/samples/{sample_id}/audit-logs"), None).await;
    assert_eq!(status, StatusCode::OK);
    logs
}

#[tokio::test]
async fn test_create_sample_returns_projection_and_audits() {
    let app = setup_test_app().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();

    let (sample_id, body) = create_test_sample_with_detail(
        &app,
        location_id,
        condition_id,
        json!({
            "species": "Quercus robur",
            "common_name": "English Oak",
            "sampling_date": "2024-03-01",
            "description": "Mature specimen near the north gate"
        }),
    )
    .await
    .unwrap();

    assert!(sample_id > 0);
    assert_eq!(body["sample_detail"]["species"], "Quercus robur");
    assert_eq!(body["sample_detail"]["sampling_date"], "2024-03-01");
    assert_eq!(body["location"]["location_id"], location_id);
    assert_eq!(body["location"]["location_data"]["region"], "Surrey");
    assert_eq!(body["condition"]["condition_id"], condition_id);
    assert_eq!(body["researchers"], json!([]));
    assert_eq!(body["growth_measurements"], json!([]));
    assert_eq!(body["status"], "active");

    let logs = audit_logs_for(&app, sample_id).await;
    assert_eq!(actions(&logs), vec!["CREATED"]);
    assert_eq!(logs[0]["sample_id"], sample_id);
    assert_eq!(logs[0]["details"]["species"], "Quercus robur");
    assert_eq!(logs[0]["details"]["location_id"], location_id);
}

#[tokio::test]
async fn test_sampling_date_defaults_to_today() {
    let app = setup_test_app().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();

    let (_, body) = create_test_sample_with_detail(
        &app,
        location_id,
        condition_id,
        json!({ "species": "Betula pendula", "common_name": "Silver Birch" }),
    )
    .await
    .unwrap();

    assert_eq!(
        body["sample_detail"]["sampling_date"],
        Utc::now().date_naive().to_string()
    );
    assert!(body["sample_detail"].get("description").is_none());
}

#[tokio::test]
async fn test_future_sampling_date_is_rejected() {
    let (app, db) = setup_test_app_with_db().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();

    let future = (Utc::now().date_naive() + Duration::days(2)).to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": {
                "species": "Fagus sylvatica",
                "common_name": "European Beech",
                "sampling_date": future
            },
            "location_id": location_id,
            "condition_id": condition_id
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "sample_detail.sampling_date");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("cannot be in the future")
    );
    assert_eq!(crate::samples::models::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(audit::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_sample_validation() {
    let app = setup_test_app().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": { "common_name": "English Oak" },
            "location_id": location_id,
            "condition_id": condition_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "sample_detail.species");

    let (status, body) = send(
        &app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": { "species": "Quercus robur", "common_name": "English Oak" },
            "condition_id": condition_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "location_id");

    let (status, body) = send(
        &app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": { "species": "Quercus robur", "common_name": "English Oak", "sampling_date": "01/03/2024" },
            "location_id": location_id,
            "condition_id": condition_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "sample_detail.sampling_date");
}

#[tokio::test]
async fn test_create_sample_with_missing_reference_rolls_back() {
    let (app, db) = setup_test_app_with_db().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();

    let err = create_test_sample_with_detail(
        &app,
        location_id,
        9999,
        json!({ "species": "Quercus robur", "common_name": "English Oak" }),
    )
    .await
    .unwrap_err();
    assert!(err.contains("404"), "{err}");

    assert_eq!(crate::samples::models::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(audit::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_partial_update_keeps_untouched_fields_and_audits() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/samples/{sample_id}"),
        Some(json!({ "sample_detail": { "common_name": "Pedunculate Oak" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Patch failed: {body}");
    assert_eq!(body["sample_detail"]["species"], "Quercus robur");
    assert_eq!(body["sample_detail"]["common_name"], "Pedunculate Oak");
    assert_eq!(body["sample_detail"]["sampling_date"], "2024-03-01");
    assert_eq!(body["created_at"], hierarchy.sample["created_at"]);

    let logs = audit_logs_for(&app, sample_id).await;
    assert_eq!(actions(&logs), vec!["UPDATED", "CREATED"]);
    assert_eq!(logs[0]["details"]["old_detail"]["common_name"], "English Oak");
    assert_eq!(logs[0]["details"]["new_detail"]["common_name"], "Pedunculate Oak");
    assert_eq!(logs[0]["details"]["new_detail"]["species"], "Quercus robur");
}

#[tokio::test]
async fn test_failed_update_leaves_sample_unchanged() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/samples/{sample_id}"),
        Some(json!({ "sample_detail": { "species": "   " } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "sample_detail.species");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/samples/{sample_id}"),
        Some(json!({
            "sample_detail": { "species": "Quercus petraea", "common_name": "Sessile Oak" },
            "location_id": 9999
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (_, fetched) = send(&app, "GET", &format!("/api/samples/{sample_id}"), None).await;
    assert_eq!(fetched["sample_detail"]["species"], "Quercus robur");
    assert_eq!(fetched["location_id"], hierarchy.location_id);
    assert_eq!(actions(&audit_logs_for(&app, sample_id).await), vec!["CREATED"]);
}

#[tokio::test]
async fn test_replace_sample_and_move_location() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let mut highlands = valid_location_data();
    highlands["region"] = json!("Highlands");
    let (new_location, _) = create_test_location_with_data(&app, highlands).await.unwrap();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/samples/{}", hierarchy.sample_id),
        Some(json!({
            "sample_detail": { "species": "Quercus petraea", "common_name": "Sessile Oak" },
            "location_id": new_location
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Replace failed: {body}");
    assert_eq!(body["sample_detail"]["species"], "Quercus petraea");
    assert_eq!(body["location_id"], new_location);
    assert_eq!(body["location"]["location_data"]["region"], "Highlands");
    assert_eq!(body["condition_id"], hierarchy.condition_id);
}

#[tokio::test]
async fn test_soft_delete_is_idempotent() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;
    let uri = format!("/api/samples/{sample_id}");

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!("Sample {sample_id} soft deleted successfully")
    );
    assert_eq!(body["deleted_sample"]["species"], "Quercus robur");
    assert_eq!(body["deleted_sample"]["status"], "deleted");

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sample already deleted");
    assert_eq!(body["status"], "deleted");

    let logs = audit_logs_for(&app, sample_id).await;
    assert_eq!(actions(&logs), vec!["DELETED", "CREATED"]);
    assert_eq!(logs[0]["details"]["species"], "Quercus robur");

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Sample deleted", "sample_id": sample_id, "status": "deleted" })
    );

    let (_, listed) = send(&app, "GET", "/api/samples", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_soft_deleted_sample_refuses_writes() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;
    let (researcher_id, _) = create_test_researcher(&app).await.unwrap();

    send(&app, "DELETE", &format!("/api/samples/{sample_id}"), None).await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/samples/{sample_id}"),
        Some(json!({ "sample_detail": { "common_name": "Oak" } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/samples/{sample_id}/growth-metrics"),
        Some(json!({ "height": 12.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "POST",
        "/api/sample-researchers",
        Some(json!({ "sample_id": sample_id, "researcher_id": researcher_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/samples/{sample_id}/growth-metrics"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(
        actions(&audit_logs_for(&app, sample_id).await),
        vec!["DELETED", "CREATED"]
    );
}

#[tokio::test]
async fn test_hard_delete_removes_children_and_keeps_history() {
    let (app, db) = setup_test_app_with_db().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;
    let (researcher_id, _) = create_test_researcher(&app).await.unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/samples/{sample_id}/growth-metrics"),
        Some(json!({ "height": 12.5, "leaf_count": 40, "health_status": "good" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        "POST",
        "/api/sample-researchers",
        Some(json!({ "sample_id": sample_id, "researcher_id": researcher_id, "role": "lead_researcher" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/samples/{sample_id}/hard-delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Hard delete failed: {body}");
    assert_eq!(body["deleted_sample"]["deletion_type"], "permanent");
    assert_eq!(body["deleted_sample"]["species"], "Quercus robur");
    assert!(body["warning"].as_str().unwrap().contains("cannot be undone"));

    let (status, _) = send(&app, "GET", &format!("/api/samples/{sample_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let sample_id_i32 = i32::try_from(sample_id).unwrap();
    let remaining_metrics = growth_metrics::Entity::find()
        .filter(growth_metrics::Column::SampleId.eq(sample_id_i32))
        .count(&db)
        .await
        .unwrap();
    let remaining_links = links::Entity::find()
        .filter(links::Column::SampleId.eq(sample_id_i32))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(remaining_metrics, 0);
    assert_eq!(remaining_links, 0);

    let logs = audit_logs_for(&app, sample_id).await;
    assert_eq!(
        actions(&logs),
        vec!["HARD_DELETED", "GROWTH_METRICS_ADDED", "CREATED"]
    );
    assert_eq!(
        logs[0]["details"]["warning"],
        "PERMANENT DELETION - All data removed from database"
    );

    // The researcher survives the sample
    let (status, _) = send(&app, "GET", &format!("/api/researchers/{researcher_id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/samples/{sample_id}/hard-delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hard_delete_after_soft_delete() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;

    send(&app, "DELETE", &format!("/api/samples/{sample_id}"), None).await;
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/samples/{sample_id}/hard-delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        actions(&audit_logs_for(&app, sample_id).await),
        vec!["HARD_DELETED", "DELETED", "CREATED"]
    );
}

#[tokio::test]
async fn test_sample_projection_includes_children() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;
    let (researcher_id, researcher) = create_test_researcher(&app).await.unwrap();

    send(
        &app,
        "POST",
        "/api/sample-researchers",
        Some(json!({ "sample_id": sample_id, "researcher_id": researcher_id, "role": "field_technician" })),
    )
    .await;
    for (height, measured_at) in [(10.5, "2024-04-01T09:00:00Z"), (14.25, "2024-05-01T09:00:00Z")] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/samples/{sample_id}/growth-metrics"),
            Some(json!({ "height": height, "measured_at": measured_at })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = send(&app, "GET", &format!("/api/samples/{sample_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["researchers"][0]["researcher_id"], researcher_id);
    assert_eq!(body["researchers"][0]["email"], researcher["email"]);
    assert_eq!(body["researchers"][0]["role"], "field_technician");

    let heights: Vec<f64> = body["growth_measurements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["height"].as_f64().unwrap())
        .collect();
    assert_eq!(heights, vec![14.25, 10.5]);
}

#[tokio::test]
async fn test_list_samples_with_filters() {
    let app = setup_test_app().await;
    let (north, _) = create_test_location(&app).await.unwrap();
    let (south, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();

    let (oak, _) = create_test_sample_with_detail(
        &app,
        north,
        condition_id,
        json!({ "species": "Quercus robur", "common_name": "English Oak" }),
    )
    .await
    .unwrap();
    let (birch, _) = create_test_sample_with_detail(
        &app,
        south,
        condition_id,
        json!({ "species": "Betula pendula", "common_name": "Silver Birch" }),
    )
    .await
    .unwrap();

    let ids = |body: &Value| -> Vec<i64> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|s| s["sample_id"].as_i64().unwrap())
            .collect()
    };

    let (status, body) = send(&app, "GET", "/api/samples", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![birch, oak]);
    assert_eq!(body[0]["species"], "Betula pendula");
    assert_eq!(body[0]["common_name"], "Silver Birch");

    let (_, body) = send(&app, "GET", &format!("/api/samples?location_id={north}"), None).await;
    assert_eq!(ids(&body), vec![oak]);

    let (_, body) = send(&app, "GET", "/api/samples?species=QUERCUS", None).await;
    assert_eq!(ids(&body), vec![oak]);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/samples?condition_id={condition_id}&species=betula"),
        None,
    )
    .await;
    assert_eq!(ids(&body), vec![birch]);
}

#[tokio::test]
async fn test_unknown_sample_is_not_found() {
    let app = setup_test_app().await;

    for (method, uri) in [
        ("GET", "/api/samples/424242"),
        ("DELETE", "/api/samples/424242"),
        ("DELETE", "/api/samples/424242/hard-delete"),
        ("GET", "/api/samples/424242/growth-metrics"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
    }

    let (status, body) = send(&app, "GET", "/api/samples/424242/audit-logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_storage_failure_after_sample_insert_rolls_back_create() {
    let (app, db) = setup_test_app_with_db().await;
    let (location_id, _) = create_test_location(&app).await.unwrap();
    let (condition_id, _) = create_test_condition(&app).await.unwrap();
    fail_storage_on(&db, "INSERT", "sample_audit_log").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/samples",
        Some(json!({
            "sample_detail": {"species": "Quercus robur", "common_name": "English Oak"},
            "location_id": location_id,
            "condition_id": condition_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(body["error"]["code"], "STORAGE_ERROR");

    assert_eq!(crate::samples::models::Entity::find().count(&db).await.unwrap(), 0);
    let (_, listed) = send(&app, "GET", "/api/samples", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_storage_failure_leaves_update_unapplied() {
    let (app, db) = setup_test_app_with_db().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let uri = format!("/api/samples/{}", hierarchy.sample_id);
    fail_storage_on(&db, "INSERT", "sample_audit_log").await;

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({"sample_detail": {"common_name": "Oak"}}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample_detail"]["common_name"], "English Oak");
    assert_eq!(audit::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_storage_failure_on_last_step_keeps_hard_deleted_sample_whole() {
    let (app, db) = setup_test_app_with_db().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let sample_id = hierarchy.sample_id;
    let (researcher_id, _) = create_test_researcher(&app).await.unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/samples/{sample_id}/growth-metrics"),
        Some(json!({"height": 12.5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        "POST",
        "/api/sample-researchers",
        Some(json!({"sample_id": sample_id, "researcher_id": researcher_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The audit entry and child deletes run before the sample row goes
    fail_storage_on(&db, "DELETE", "plant_sample").await;
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/samples/{sample_id}/hard-delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");

    let (status, body) = send(&app, "GET", &format!("/api/samples/{sample_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["growth_measurements"].as_array().unwrap().len(), 1);
    assert_eq!(body["researchers"].as_array().unwrap().len(), 1);

    let logs = audit_logs_for(&app, sample_id).await;
    assert_eq!(actions(&logs), vec!["GROWTH_METRICS_ADDED", "CREATED"]);
}
