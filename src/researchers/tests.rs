use super::models::is_valid_email;
use crate::common::test_helpers::{
    create_full_object_hierarchy, create_test_researcher, encode_json, get_list, send,
};
use crate::config::test_helpers::setup_test_app;
use axum::http::StatusCode;
use rstest::rstest;
use serde_json::{Value, json};

#[rstest]
#[case("ada@example.org", true)]
#[case("first.last+tag@field-station.ac.uk", true)]
#[case("no-at-sign.example.org", false)]
#[case("@example.org", false)]
#[case("ada@localhost", false)]
#[case("ada@@example.org", false)]
#[case("ada lovelace@example.org", false)]
#[case("ada@example..org", false)]
#[case(".ada@example.org", false)]
fn test_email_syntax(#[case] email: &str, #[case] valid: bool) {
    assert_eq!(is_valid_email(email), valid, "{email}");
}

#[tokio::test]
async fn test_researcher_crud_operations() {
    let app = setup_test_app().await;

    let (researcher_id, body) = create_test_researcher(&app).await.unwrap();
    assert_eq!(body["name"], "Test Researcher");
    assert_eq!(body["affiliation"], "Field Botany Unit");
    assert!(body["phone"].is_null());

    let uri = format!("/api/researchers/{researcher_id}");
    let (status, patched) = send(&app, "PATCH", &uri, Some(json!({"phone": "+44 20 7946 0000"}))).await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["phone"], "+44 20 7946 0000");
    assert_eq!(patched["affiliation"], "Field Botany Unit");
    assert_eq!(patched["email"], body["email"]);

    let (status, cleared) = send(&app, "PATCH", &uri, Some(json!({"affiliation": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["affiliation"].is_null());
    assert_eq!(cleared["phone"], "+44 20 7946 0000");

    let (status, replaced) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({"name": "Dr. Jane Goodall", "email": "jane.goodall@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{replaced}");
    assert_eq!(replaced["name"], "Dr. Jane Goodall");
    assert!(replaced["phone"].is_null());

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_researcher_validation() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/researchers",
        Some(json!({"name": "   ", "email": "someone@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "name");

    let (status, body) = send(
        &app,
        "POST",
        "/api/researchers",
        Some(json!({"name": "Someone", "email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "email");

    let (status, body) = send(&app, "POST", "/api/researchers", Some(json!({"name": "Someone"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "email");
    assert_eq!(body["error"]["message"], "Validation failed for field 'email': is required");
}

#[tokio::test]
async fn test_researcher_duplicate_email() {
    let app = setup_test_app().await;
    let researcher = json!({"name": "Barbara McClintock", "email": "barbara@example.org"});

    let (status, _) = send(&app, "POST", "/api/researchers", Some(researcher.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/researchers", Some(researcher)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_RESOURCE");

    let (_, other) = create_test_researcher(&app).await.unwrap();
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/researchers/{}", other["researcher_id"]),
        Some(json!({"email": "barbara@example.org"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_researchers_listed_by_name() {
    let app = setup_test_app().await;
    for (name, email) in [
        ("Mendel", "mendel@example.org"),
        ("Agnes Arber", "arber@example.org"),
        ("Hooker", "hooker@example.org"),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/researchers",
            Some(json!({"name": name, "email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/api/researchers", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Agnes Arber", "Hooker", "Mendel"]);
}

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_researcher_list_filter_sort_and_range() {
    let app = setup_test_app().await;
    for (name, email, affiliation) in [
        ("Mendel", "mendel@brno.example.org", "Abbey"),
        ("Agnes Arber", "arber@cam.example.org", "Cambridge"),
        ("Joseph Hooker", "hooker@kew.example.org", "Kew Gardens"),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/researchers",
            Some(json!({"name": name, "email": email, "affiliation": affiliation})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let list = |query: Value| {
        let app = app.clone();
        async move {
            let (key, value) = query.as_object().unwrap().iter().next().unwrap();
            get_list(&app, &format!("/api/researchers?{key}={}", encode_json(value))).await
        }
    };

    let (status, range, body) = get_list(&app, "/api/researchers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(range.as_deref(), Some("researchers 0-2/3"));
    assert_eq!(names(&body), vec!["Agnes Arber", "Joseph Hooker", "Mendel"]);

    let (status, range, body) = list(json!({"filter": {"name": "ER"}})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(names(&body), vec!["Agnes Arber", "Joseph Hooker"]);
    assert_eq!(range.as_deref(), Some("researchers 0-1/2"));

    let (_, _, body) = list(json!({"filter": {"affiliation": "kew", "email": "hooker"}})).await;
    assert_eq!(names(&body), vec!["Joseph Hooker"]);

    let (_, _, body) = list(json!({"sort": ["email", "DESC"]})).await;
    assert_eq!(names(&body), vec!["Mendel", "Joseph Hooker", "Agnes Arber"]);

    let (_, range, body) = list(json!({"range": [1, 2]})).await;
    assert_eq!(names(&body), vec!["Joseph Hooker", "Mendel"]);
    assert_eq!(range.as_deref(), Some("researchers 1-2/3"));

    let (_, range, body) = list(json!({"filter": {"name": "nobody"}})).await;
    assert_eq!(body, json!([]));
    assert_eq!(range.as_deref(), Some("researchers */0"));
}

#[tokio::test]
async fn test_researcher_list_rejects_unknown_columns() {
    let app = setup_test_app().await;

    for (query, field) in [
        (json!({"filter": {"phone": "0"}}), "filter.phone"),
        (json!({"filter": {"name": 7}}), "filter.name"),
        (json!({"sort": ["phone", "ASC"]}), "sort"),
        (json!({"sort": ["name", "UP"]}), "sort"),
        (json!({"range": [3, 1]}), "range"),
    ] {
        let (key, value) = query.as_object().unwrap().iter().next().unwrap();
        let uri = format!("/api/researchers?{key}={}", encode_json(value));
        let (status, _, body) = get_list(&app, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["field"], field, "{uri}");
    }
}

#[tokio::test]
async fn test_researcher_delete_cascades_links() {
    let app = setup_test_app().await;
    let hierarchy = create_full_object_hierarchy(&app).await.unwrap();
    let (researcher_id, _) = create_test_researcher(&app).await.unwrap();

    let (status, link) = send(
        &app,
        "POST",
        "/api/sample-researchers",
        Some(json!({
            "sample_id": hierarchy.sample_id,
            "researcher_id": researcher_id,
            "role": "field_technician"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{link}");

    let (status, _) = send(&app, "DELETE", &format!("/api/researchers/{researcher_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/sample-researchers/{}", link["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, sample) = send(&app, "GET", &format!("/api/samples/{}", hierarchy.sample_id), None).await;
    assert!(sample["researchers"].as_array().unwrap().is_empty());
}
