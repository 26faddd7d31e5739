mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{bearer, send, test_app, token_for};
use screening_backend::models::{
    connection::Category,
    remote::{RemoteCandidate, RemoteJob, RemoteRecord},
};
use screening_backend::services::gateway::RemoteAccount;

fn remote(id: &str, name: &str, email: &str) -> RemoteRecord {
    RemoteRecord::Candidate(RemoteCandidate {
        remote_id: id.into(),
        full_name: name.into(),
        email: Some(email.into()),
        ..Default::default()
    })
}

#[tokio::test]
async fn sync_merges_existing_and_creates_new_records() {
    let app = test_app();
    let auth = bearer(&token_for("recruiter-1"));
    let headers = [("authorization", auth.as_str())];

    let (status, _) = send(&app.router, "POST", "/api/sync", &headers, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (status, link) = send(
        &app.router,
        "POST",
        "/api/connections/link-token",
        &headers,
        Some(json!({ "organization_name": "Acme", "email_address": "hr@acme.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(link["link_token"], "link_recruiter-1");

    let (status, linked) = send(
        &app.router,
        "POST",
        "/api/connections/exchange",
        &headers,
        Some(json!({ "public_token": "pub_ats" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["category"], "ats");
    assert!(linked.get("account_token").is_none());

    let (_, local) = send(
        &app.router,
        "POST",
        "/api/candidates",
        &headers,
        Some(json!({ "full_name": "Ana Gomez", "email": "ana@example.com", "skills": ["Go"] })),
    )
    .await;

    app.connector.set_records(
        Category::Ats,
        vec![
            RemoteRecord::Candidate(RemoteCandidate {
                remote_id: "gh-1".into(),
                full_name: "Ana Gomez".into(),
                email: Some("ana@example.com".into()),
                current_title: Some("Senior Engineer".into()),
                skills: vec![],
                ..Default::default()
            }),
            remote("gh-2", "Ben Ode", "ben@example.com"),
            RemoteRecord::Job(RemoteJob {
                remote_id: "job-1".into(),
                title: "Backend Engineer".into(),
                company: Some("Acme".into()),
                ..Default::default()
            }),
            RemoteRecord::Job(RemoteJob {
                remote_id: "job-2".into(),
                title: "".into(),
                ..Default::default()
            }),
        ],
    );

    let (status, report) = send(&app.router, "POST", "/api/sync", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["candidates"], json!({ "created": 1, "updated": 1, "skipped": 0 }));
    assert_eq!(report["jobs"]["created"], 1);
    assert_eq!(report["categories"]["ats"]["status"], "completed");
    assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    assert_eq!(report["errors"][0]["remote_id"], "job-2");

    let (_, merged) = send(
        &app.router,
        "GET",
        &format!("/api/candidates/{}", local["id"].as_str().unwrap()),
        &headers,
        None,
    )
    .await;
    assert_eq!(merged["current_title"], "Senior Engineer");
    assert_eq!(merged["skills"], json!(["Go"]));

    let (status, again) = send(&app.router, "POST", "/api/sync?category=ats", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["candidates"], json!({ "created": 0, "updated": 0, "skipped": 2 }));
    assert_eq!(again["jobs"]["skipped"], 1);

    let (_, status_body) = send(&app.router, "GET", "/api/connections/status", &headers, None).await;
    assert_eq!(status_body["ats_connected"], true);
    assert_eq!(status_body["crm_connected"], false);
    assert!(!status_body["connections"][0]["last_synced_at"].is_null());

    let (status, _) = send(&app.router, "DELETE", "/api/connections/ats", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app.router, "POST", "/api/sync", &headers, None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn push_requires_crm_then_updates_the_same_contact() {
    let app = test_app();
    let auth = bearer(&token_for("recruiter-2"));
    let headers = [("authorization", auth.as_str())];

    let (_, candidate) = send(
        &app.router,
        "POST",
        "/api/candidates",
        &headers,
        Some(json!({ "full_name": "Ana Gomez", "email": "ana@example.com" })),
    )
    .await;
    let push = json!({ "candidate_id": candidate["id"] });

    let (status, _) = send(&app.router, "POST", "/api/sync/push", &headers, Some(push.clone())).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    send(
        &app.router,
        "POST",
        "/api/connections/exchange",
        &headers,
        Some(json!({ "public_token": "pub_crm" })),
    )
    .await;

    let (status, first) = send(&app.router, "POST", "/api/sync/push", &headers, Some(push.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["action"], "created");
    let remote_id = first["remote_id"].as_str().unwrap().to_string();

    let (_, second) = send(&app.router, "POST", "/api/sync/push", &headers, Some(push)).await;
    assert_eq!(second["action"], "updated");
    assert_eq!(second["remote_id"], remote_id.as_str());
    assert_eq!(app.connector.pushed.lock().unwrap().len(), 1);
    assert_eq!(
        *app.connector.updated.lock().unwrap(),
        vec![(remote_id.clone(), None)]
    );

    app.connector.set_records(
        Category::Crm,
        vec![remote(&remote_id, "Ana Gomez", "ana.gomez@personal.test")],
    );
    let (_, report) = send(&app.router, "POST", "/api/sync?category=crm", &headers, None).await;
    assert_eq!(report["candidates"]["created"], 0);
    assert_eq!(report["candidates"]["updated"], 1);
}

#[tokio::test]
async fn connection_sync_relinks_accounts_from_the_aggregator() {
    let app = test_app();
    let auth = bearer(&token_for("recruiter-3"));
    let headers = [("authorization", auth.as_str())];

    app.connector.set_accounts(vec![
        RemoteAccount {
            category: Category::Crm,
            integration: Some("HubSpot".into()),
            account_token: Some("acct_crm_remote".into()),
        },
        RemoteAccount {
            category: Category::Ats,
            integration: Some("Lever".into()),
            account_token: None,
        },
    ]);

    let (status, report) = send(&app.router, "POST", "/api/connections/sync", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["accounts_found"], 2);
    assert_eq!(report["linked"].as_array().unwrap().len(), 1);
    assert_eq!(report["missing_tokens"][0]["category"], "ats");

    let (_, status) = send(&app.router, "GET", "/api/connections/status", &headers, None).await;
    assert_eq!(status["crm_connected"], true);
    assert_eq!(status["ats_connected"], false);
}
