//! Azure Resource Manager client
//!
//! Lists subscriptions, SQL servers, databases and replication links over the
//! ARM REST API. Every list is followed through its `nextLink` chain lazily,
//! one page per poll once the previous page is drained.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use super::credential::{TokenSource, management_scope};
use crate::error::{CoreError, Result};
use crate::model::{Database, ReplicationLink, ReplicationRole, Server, Subscription};
use crate::resources::{ResourceProvider, ResourceStream};

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const SQL_API_VERSION: &str = "2021-11-01";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
struct Page<R> {
    #[serde(default)]
    value: Vec<R>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubscription {
    subscription_id: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    id: String,
    name: String,
    #[serde(default)]
    properties: RawServerProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerProperties {
    fully_qualified_domain_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDatabase {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawReplicationLink {
    name: String,
    #[serde(default)]
    properties: RawReplicationLinkProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawReplicationLinkProperties {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl From<RawSubscription> for Subscription {
    fn from(raw: RawSubscription) -> Self {
        Subscription {
            id: raw.subscription_id,
            display_name: raw.display_name,
        }
    }
}

impl From<RawServer> for Server {
    fn from(raw: RawServer) -> Self {
        // FQDN is only absent for servers still being provisioned
        let fully_qualified_domain_name = raw
            .properties
            .fully_qualified_domain_name
            .unwrap_or_else(|| format!("{}.database.windows.net", raw.name));
        Server {
            id: raw.id,
            name: raw.name,
            fully_qualified_domain_name,
        }
    }
}

impl From<RawDatabase> for Database {
    fn from(raw: RawDatabase) -> Self {
        Database {
            id: raw.id,
            name: raw.name,
        }
    }
}

impl From<RawReplicationLink> for ReplicationLink {
    fn from(raw: RawReplicationLink) -> Self {
        ReplicationLink {
            name: raw.name,
            role: ReplicationRole::parse(raw.properties.role.as_deref()),
        }
    }
}

/// Resource manager client implementing [`ResourceProvider`]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    scope: String,
    tokens: Arc<dyn TokenSource>,
}

impl ArmClient {
    pub fn new(endpoint: Url, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, tokens)
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(http: reqwest::Client, endpoint: Url, tokens: Arc<dyn TokenSource>) -> Self {
        let scope = management_scope(&endpoint);
        Self {
            http,
            endpoint,
            scope,
            tokens,
        }
    }

    fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self.endpoint.join(path).map_err(|e| {
            CoreError::Validation(format!("invalid resource path '{}': {}", path, e))
        })?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    async fn get_page<R: DeserializeOwned>(&self, url: Url) -> Result<Page<R>> {
        debug!("GET {}", url);
        let token = self.tokens.token(&self.scope).await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        trace!("Response {}: {}", status, body);

        if !status.is_success() {
            return Err(CoreError::ResourceManager {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn paginate<'a, R, T>(&'a self, first: Result<Url>) -> ResourceStream<'a, T>
    where
        R: DeserializeOwned + Into<T> + Send + 'a,
        T: Send + 'a,
    {
        let first = match first {
            Ok(url) => url,
            Err(e) => return stream::once(async { Err(e) }).boxed(),
        };

        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok(None);
            };
            let page: Page<R> = self.get_page(url).await?;
            let next = page
                .next_link
                .map(|link| {
                    Url::parse(&link).map_err(|e| {
                        CoreError::Validation(format!("invalid nextLink '{}': {}", link, e))
                    })
                })
                .transpose()?;
            Ok::<_, CoreError>(Some((page.value, next)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(|raw| Ok::<T, CoreError>(raw.into()))))
        .try_flatten()
        .boxed()
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error:
                ErrorBody {
                    code: Some(code),
                    message: Some(message),
                },
        }) => format!("{}: {}", code, message),
        Ok(ErrorEnvelope {
            error: ErrorBody {
                message: Some(message),
                ..
            },
        }) => message,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.to_string(),
    }
}

impl ResourceProvider for ArmClient {
    fn subscriptions(&self) -> ResourceStream<'_, Subscription> {
        self.paginate::<RawSubscription, _>(self.url("/subscriptions", SUBSCRIPTIONS_API_VERSION))
    }

    fn servers<'a>(&'a self, subscription: &'a Subscription) -> ResourceStream<'a, Server> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Sql/servers",
            urlencoding::encode(&subscription.id)
        );
        self.paginate::<RawServer, _>(self.url(&path, SQL_API_VERSION))
    }

    fn databases<'a>(&'a self, server: &'a Server) -> ResourceStream<'a, Database> {
        let path = format!("{}/databases", server.id);
        self.paginate::<RawDatabase, _>(self.url(&path, SQL_API_VERSION))
    }

    fn replication_links<'a>(
        &'a self,
        database: &'a Database,
    ) -> ResourceStream<'a, ReplicationLink> {
        let path = format!("{}/replicationLinks", database.id);
        self.paginate::<RawReplicationLink, _>(self.url(&path, SQL_API_VERSION))
    }
}
