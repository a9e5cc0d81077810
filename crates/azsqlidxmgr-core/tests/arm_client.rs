//! Resource manager client against a mock server

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use azsqlidxmgr_core::azure::{ArmClient, TokenSource};
use azsqlidxmgr_core::{CoreError, ReplicationRole, ResourceProvider, Server};

struct StaticToken;

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _scope: &str) -> azsqlidxmgr_core::Result<String> {
        Ok("test-token".to_string())
    }
}

fn client(server: &MockServer) -> ArmClient {
    ArmClient::new(Url::parse(&server.uri()).unwrap(), Arc::new(StaticToken))
}

#[tokio::test]
async fn test_subscriptions_follow_next_link() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(query_param("api-version", "2022-12-01"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "/subscriptions/sub-2", "subscriptionId": "sub-2", "displayName": "Sandbox" }
            ]
        })))
        .with_priority(1)
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(query_param("api-version", "2022-12-01"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "/subscriptions/sub-1", "subscriptionId": "sub-1", "displayName": "Production" }
            ],
            "nextLink": format!("{}/subscriptions?api-version=2022-12-01&page=2", mock.uri())
        })))
        .mount(&mock)
        .await;

    let arm = client(&mock);
    let subscriptions: Vec<_> = arm.subscriptions().try_collect().await.unwrap();

    let names: Vec<_> = subscriptions
        .iter()
        .map(|s| s.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Production", "Sandbox"]);
    assert_eq!(subscriptions[0].id, "sub-1");
}

#[tokio::test]
async fn test_servers_databases_and_links() {
    let mock = MockServer::start().await;
    let server_id = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Sql/servers/sql-prod";

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/providers/Microsoft.Sql/servers"))
        .and(query_param("api-version", "2021-11-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": server_id,
                "name": "sql-prod",
                "properties": { "fullyQualifiedDomainName": "sql-prod.database.windows.net" }
            }]
        })))
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/databases", server_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": format!("{}/databases/master", server_id), "name": "master" },
                { "id": format!("{}/databases/orders", server_id), "name": "orders" }
            ]
        })))
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/databases/orders/replicationLinks", server_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "name": "geo", "properties": { "role": "Primary", "partnerRole": "Secondary" } }
            ]
        })))
        .mount(&mock)
        .await;

    let arm = client(&mock);
    let subscription = azsqlidxmgr_core::Subscription {
        id: "sub-1".to_string(),
        display_name: "Production".to_string(),
    };

    let servers: Vec<Server> = arm.servers(&subscription).try_collect().await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(
        servers[0].fully_qualified_domain_name,
        "sql-prod.database.windows.net"
    );

    let databases: Vec<_> = arm.databases(&servers[0]).try_collect().await.unwrap();
    assert_eq!(databases.len(), 2);
    assert_eq!(databases[1].name, "orders");

    let links: Vec<_> = arm
        .replication_links(&databases[1])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].role, ReplicationRole::Primary);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "AuthorizationFailed", "message": "The client does not have authorization" }
        })))
        .mount(&mock)
        .await;

    let arm = client(&mock);
    let err = arm
        .subscriptions()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    match err {
        CoreError::ResourceManager { status, message } => {
            assert_eq!(status, 403);
            assert!(message.starts_with("AuthorizationFailed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock)
        .await;

    let arm = client(&mock);
    let err = arm
        .subscriptions()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Decode(_)));
}
