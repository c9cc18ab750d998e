mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

// Store-backed CRUD behavior. These tests need a provisioned Postgres
// (DATABASE_URL) and skip themselves unless SCALE_TEST_DB is set.

async fn list(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    query: &str,
) -> Result<Vec<Value>> {
    let res = client
        .get(format!("{}/api/holiday{}", base, query))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res.json::<Vec<Value>>().await?)
}

#[tokio::test]
async fn create_then_list_is_tenant_scoped_and_newest_first() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let org_a = common::new_session("Acme", "a@acme.test", "Member");
    let org_b = common::new_session("Borg", "b@borg.test", "Member");

    for title in ["first", "second", "third"] {
        let res = client
            .post(format!("{}/api/holiday", server.base_url))
            .bearer_auth(&org_a.token)
            .json(&json!({ "title": title }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let records = list(&client, &server.base_url, &org_a.token, "").await?;
    assert_eq!(records.len(), 3);

    // Newest first
    assert_eq!(records[0]["title"], "third");
    assert_eq!(records[2]["title"], "first");

    for rec in &records {
        assert_eq!(rec["organizationId"], org_a.organization_id.to_string());
        assert_eq!(rec["email"], "a@acme.test");
        assert_eq!(rec["reportedBy"], "a@acme.test");
        assert_eq!(rec["organization"], "Acme");
        assert!(rec["createdAt"].is_string());
    }

    // A session for another organization sees none of it
    let other = list(&client, &server.base_url, &org_b.token, "").await?;
    assert!(other.is_empty());

    Ok(())
}

#[tokio::test]
async fn slug_and_id_params_narrow_the_scope() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    for (title, slug) in [("in-apollo", "apollo"), ("in-gemini", "gemini")] {
        let res = client
            .post(format!("{}/api/holiday", server.base_url))
            .bearer_auth(&session.token)
            .json(&json!({ "title": title, "projectSlug": slug }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let apollo = list(&client, &server.base_url, &session.token, "?slug=apollo").await?;
    assert_eq!(apollo.len(), 1);
    assert_eq!(apollo[0]["title"], "in-apollo");

    let id = apollo[0]["_id"].as_str().unwrap();
    let by_id = list(
        &client,
        &server.base_url,
        &session.token,
        &format!("?id={}", id),
    )
    .await?;
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0]["_id"], id);

    Ok(())
}

#[tokio::test]
async fn put_updates_fields_but_never_created_at() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    let res = client
        .post(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({ "title": "original" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let records = list(&client, &server.base_url, &session.token, "").await?;
    let id = records[0]["_id"].as_str().unwrap().to_string();
    let created_at = records[0]["createdAt"].as_str().unwrap().to_string();

    let res = client
        .put(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({
            "_id": id,
            "title": "renamed",
            "createdAt": "1999-01-01T00:00:00Z",
            "email": "spoofed@evil.test"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let records = res.json::<Vec<Value>>().await?;
    let updated = records.iter().find(|r| r["_id"] == id.as_str()).unwrap();
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["createdAt"], created_at.as_str());
    assert_eq!(updated["email"], "a@acme.test");
    assert!(updated["updatedAt"].is_string());

    Ok(())
}

#[tokio::test]
async fn put_on_missing_record_is_404() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    let res = client
        .put(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({
            "_id": uuid::Uuid::new_v4().to_string(),
            "title": "ghost"
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn put_cannot_reach_across_organizations() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let org_a = common::new_session("Acme", "a@acme.test", "Member");
    let org_b = common::new_session("Borg", "b@borg.test", "Member");

    let res = client
        .post(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&org_a.token)
        .json(&json!({ "title": "private" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let records = res.json::<Vec<Value>>().await?;
    let id = records[0]["_id"].as_str().unwrap();

    // Organization B knows the id but still cannot touch the record
    let res = client
        .put(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&org_b.token)
        .json(&json!({ "_id": id, "title": "stolen" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn delete_validates_ids_and_reports_misses() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    // Empty list is a client error
    let res = client
        .delete(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!([]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Matching nothing is a 404 echoing the attempted ids
    let ghost = uuid::Uuid::new_v4().to_string();
    let res = client
        .delete(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!([ghost]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let payload = res.json::<Value>().await?;
    assert_eq!(payload["data"], json!([ghost]));

    // A real delete returns the refreshed (now shorter) list
    let res = client
        .post(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({ "title": "doomed" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let records = res.json::<Vec<Value>>().await?;
    let id = records[0]["_id"].as_str().unwrap();

    let res = client
        .delete(format!("{}/api/holiday", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!([id]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let remaining = res.json::<Vec<Value>>().await?;
    assert!(remaining.iter().all(|r| r["_id"] != id));

    Ok(())
}

#[tokio::test]
async fn concurrent_creates_get_distinct_consecutive_keys() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    let creates = (0..8).map(|i| {
        let client = client.clone();
        let url = format!("{}/api/holiday", server.base_url);
        let token = session.token.clone();
        async move {
            client
                .post(&url)
                .bearer_auth(&token)
                .json(&json!({ "title": format!("holiday {}", i), "key": "HOL" }))
                .send()
                .await
        }
    });

    for res in futures::future::join_all(creates).await {
        assert_eq!(res?.status(), StatusCode::OK);
    }

    let records = list(&client, &server.base_url, &session.token, "").await?;
    let mut keys: Vec<i64> = records
        .iter()
        .filter_map(|r| r["key"].as_i64())
        .collect();
    keys.sort_unstable();

    // Distinct and consecutive from 1: no duplicates, no gaps
    assert_eq!(keys, (1..=8).collect::<Vec<i64>>());

    Ok(())
}

#[tokio::test]
async fn post_validates_against_the_collection_master() -> Result<()> {
    if !common::db_tests_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let session = common::new_session("Acme", "a@acme.test", "Member");

    // Install a field configuration for the teamcharter collection
    let res = client
        .post(format!("{}/api/teamchartermaster", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({
            "fields": [
                { "name": "mission", "label": "Mission", "type": "text", "required": true },
                { "name": "status", "label": "Status", "type": "dropdown",
                  "optionList": ["Draft", "Final"] }
            ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Violating body: missing mission, status not in the option list
    let res = client
        .post(format!("{}/api/teamcharter", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({ "status": "Pending" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = res.json::<Value>().await?;
    assert_eq!(payload["code"], "VALIDATION_ERROR");
    assert!(payload["field_errors"]["mission"].is_string());
    assert!(payload["field_errors"]["status"].is_string());

    // Conforming body passes
    let res = client
        .post(format!("{}/api/teamcharter", server.base_url))
        .bearer_auth(&session.token)
        .json(&json!({ "mission": "Ship it", "status": "Draft" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}
