//! Device enrolls through the real router, then talks to its database through
//! the session-cookie interceptor; Cloudant and the identity service are
//! wiremock servers.

#![allow(clippy::unwrap_used)]

use anyhow::Result;
use bluelist::{
    api::{self, AppState, auth::RemoteAuthenticator},
    client::{BackendClient, StaticAuthorization},
    cloudant::{Cloudant, Endpoint, database_name, design},
    todo::{Priority, Scope, TodoItem, visible_items},
};
use secrecy::SecretString;
use serde_json::json;
use std::{net::TcpListener as StdTcpListener, sync::Arc};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    StdTcpListener::bind("127.0.0.1:0").is_ok()
}

async fn mount_cloudant(server: &MockServer, database: &str) {
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("Authorization", "Bearer alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "alice"})))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/{database}")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(server)
        .await;
    for view in &design::VIEWS {
        Mock::given(method("PUT"))
            .and(path(format!("/{database}/_design/{}", view.design)))
            .and(body_json(view.document()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(format!("/{database}/_index")))
        .and(body_json(design::datatype_index()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;

    // registry: empty until enroll stores the key
    Mock::given(method("GET"))
        .and(path(format!("/bluelist_registry/{database}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not_found"})))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/bluelist_registry/{database}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": database, "_rev": "1-a", "key": "key-alice", "password": "pw-alice"
        })))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/bluelist_registry/{database}")))
        .and(body_json(json!({"key": "key-alice", "password": "pw-alice"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_api/v2/api_keys"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "key": "key-alice", "password": "pw-alice"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/_api/v2/db/{database}/_security")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/_api/v2/db/{database}/_security")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(server)
        .await;

    // first login (enroll) hands out a cookie that has already expired
    Mock::given(method("POST"))
        .and(path("/_session"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "AuthSession=expired; Path=/"),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_session"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Set-Cookie", "AuthSession=fresh; Path=/"),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/{database}/_find")))
        .and(header("Cookie", "AuthSession=expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized", "reason": "Session expired"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{database}/_find")))
        .and(header("Cookie", "AuthSession=fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [
                {"_id": "1", "_rev": "1-a", "@datatype": "TodoItem", "name": "walk dog", "priority": 0},
                {"_id": "2", "_rev": "1-b", "@datatype": "TodoItem", "name": "Buy milk", "priority": 2}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{database}")))
        .and(header("Cookie", "AuthSession=fresh"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": "3", "rev": "1-c"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn enroll_then_use_store_across_cookie_expiry() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let cloudant_server = MockServer::start().await;
    let database = database_name("alice");
    mount_cloudant(&cloudant_server, &database).await;

    let cloudant = Cloudant::new(
        Endpoint::parse(&cloudant_server.uri())?,
        "admin".to_string(),
        SecretString::from("secret".to_string()),
    )?;
    let authenticator =
        RemoteAuthenticator::new(Url::parse(&format!("{}/userinfo", cloudant_server.uri()))?)?;
    let app = api::router(Arc::new(AppState {
        cloudant,
        authenticator: Arc::new(authenticator),
        registry: "bluelist_registry".to_string(),
    }));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let backend = BackendClient::new(
        &format!("http://{addr}"),
        Arc::new(StaticAuthorization::new(SecretString::from(
            "Bearer alice".to_string(),
        ))),
    )?;

    let store = backend.connect().await?;
    assert_eq!(
        store.database().as_str(),
        format!("{}/{database}", cloudant_server.uri())
    );
    assert_eq!(
        store.interceptor().cached().as_deref(),
        Some("AuthSession=expired")
    );

    // 401 with the enrollment cookie, refresh through the backend, retry
    let items = store.list().await?;
    assert_eq!(items.len(), 2);
    assert_eq!(
        store.interceptor().cached().as_deref(),
        Some("AuthSession=fresh")
    );

    let visible: Vec<String> = visible_items(&items, Scope::All)
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(visible, ["Buy milk", "walk dog"]);

    let created = store
        .create(&TodoItem::new("Call mom", Priority::from_scope("High")))
        .await?;
    assert_eq!(created.id.as_deref(), Some("3"));
    assert_eq!(created.priority, Priority::High);

    server.abort();
    Ok(())
}
