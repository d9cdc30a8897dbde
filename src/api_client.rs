use crate::config::{Config, ProxyConfig};
use crate::error::{ConfigError, SentryError};
use async_trait::async_trait;
use reqwest::{Client, Method, header};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentryApi: Send + Sync {
    async fn list_projects(&self, org_slug: &str) -> Result<Page<Project>, SentryError>;
    async fn list_issues(
        &self,
        org_slug: &str,
        query: &IssuesQuery,
    ) -> Result<Page<Issue>, SentryError>;
    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetails, SentryError>;
    async fn update_issue_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<StatusUpdate, SentryError>;
    async fn list_issue_events(
        &self,
        issue_id: &str,
        query: &EventsQuery,
    ) -> Result<Page<Event>, SentryError>;
    async fn get_project_stats(
        &self,
        org_slug: &str,
        project_slug: &str,
        query: &StatsQuery,
    ) -> Result<Vec<StatsPoint>, SentryError>;
}

/// One page of a listing endpoint plus the raw `Link` header that points past it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub link: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, link: Option<String>) -> Self {
        Self { items, link }
    }
}

pub struct SentryApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Resolved,
    Unresolved,
    Ignored,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Resolved => "resolved",
            IssueStatus::Unresolved => "unresolved",
            IssueStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    #[default]
    Received,
    Rejected,
    Blacklisted,
}

/// Bucket size of the stats series. Stats are always reported hourly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1h")]
    OneHour,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub short_id: String,
    pub title: String,
    #[serde(default)]
    pub culprit: Option<String>,
    #[serde(default)]
    pub level: String,
    pub status: String,
    #[serde(default)]
    pub platform: Option<String>,
    pub project: ProjectRef,
    #[serde(default, rename = "type")]
    pub issue_type: Option<String>,
    pub count: String,
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub first_seen: String,
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub permalink: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueMetadata {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueTag {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(default)]
    pub metadata: IssueMetadata,
    #[serde(default)]
    pub tags: Vec<IssueTag>,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub has_seen: bool,
}

/// Acknowledgement returned by `PUT /issues/{id}/`. Sentry echoes only the changed fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "eventID")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<EventTag>,
    #[serde(default)]
    pub user: Option<EventUser>,
}

/// `[unix_timestamp, count]` as returned by the project stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatsPoint(pub i64, pub u64);

impl StatsPoint {
    pub fn count(&self) -> u64 {
        self.1
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IssuesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl IssuesQuery {
    /// Sentry filters status through the search syntax, so `is:<status>` is prepended.
    pub fn search(status: Option<IssueStatus>, query: Option<String>) -> Option<String> {
        let query = query.filter(|q| !q.trim().is_empty());
        match (status, query) {
            (Some(status), Some(query)) => Some(format!("is:{} {}", status, query)),
            (Some(status), None) => Some(format!("is:{}", status)),
            (None, query) => query,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsQuery {
    pub stat: StatKind,
    pub resolution: Resolution,
}

struct ApiResponse<T> {
    data: T,
    link: Option<String>,
}

impl SentryApiClient {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.auth_token))
                .map_err(|_| ConfigError::InvalidAuthToken)?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("sentry-issues-mcp/", env!("CARGO_PKG_VERSION")));
        match &config.proxy {
            Some(ProxyConfig::Socks(url)) => {
                let proxy = reqwest::Proxy::all(url).map_err(|source| ConfigError::InvalidProxy {
                    url: url.clone(),
                    source,
                })?;
                builder = builder.proxy(proxy);
            }
            Some(ProxyConfig::Https(url)) => {
                let proxy =
                    reqwest::Proxy::https(url).map_err(|source| ConfigError::InvalidProxy {
                        url: url.clone(),
                        source,
                    })?;
                builder = builder.proxy(proxy);
            }
            None => {}
        }
        let client = builder.build().map_err(ConfigError::HttpClient)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, SentryError> {
        let url = format!("{}/api/0{}", self.base_url, endpoint);
        info!("{} {}", method, url);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|source| SentryError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Sentry request failed: {}", url);
            return Err(SentryError::upstream(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                text,
            ));
        }
        let link = resp
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp.text().await.map_err(|source| SentryError::Transport {
            url: url.clone(),
            source,
        })?;
        let data = serde_json::from_str(&text).map_err(|source| {
            error!(
                "Failed to parse JSON from {}: {}. Response: {}",
                url,
                source,
                text.chars().take(500).collect::<String>()
            );
            SentryError::Decode {
                url: url.clone(),
                source,
            }
        })?;
        Ok(ApiResponse { data, link })
    }

    async fn get_page<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Page<T>, SentryError> {
        let resp = self.request(Method::GET, endpoint, None).await?;
        Ok(Page::new(resp.data, resp.link))
    }
}

fn with_query<Q: Serialize>(endpoint: String, query: &Q) -> String {
    let query_string = serde_qs::to_string(query).unwrap_or_default();
    if query_string.is_empty() {
        endpoint
    } else {
        format!("{}?{}", endpoint, query_string)
    }
}

#[async_trait]
impl SentryApi for SentryApiClient {
    async fn list_projects(&self, org_slug: &str) -> Result<Page<Project>, SentryError> {
        self.get_page(&format!("/organizations/{}/projects/", org_slug))
            .await
    }
    async fn list_issues(
        &self,
        org_slug: &str,
        query: &IssuesQuery,
    ) -> Result<Page<Issue>, SentryError> {
        let endpoint = with_query(format!("/organizations/{}/issues/", org_slug), query);
        self.get_page(&endpoint).await
    }
    async fn get_issue(&self, issue_id: &str) -> Result<IssueDetails, SentryError> {
        let resp = self
            .request(Method::GET, &format!("/issues/{}/", issue_id), None)
            .await?;
        Ok(resp.data)
    }
    async fn update_issue_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
    ) -> Result<StatusUpdate, SentryError> {
        let body = serde_json::json!({ "status": status });
        let resp = self
            .request(Method::PUT, &format!("/issues/{}/", issue_id), Some(body))
            .await?;
        Ok(resp.data)
    }
    async fn list_issue_events(
        &self,
        issue_id: &str,
        query: &EventsQuery,
    ) -> Result<Page<Event>, SentryError> {
        let endpoint = with_query(format!("/issues/{}/events/", issue_id), query);
        self.get_page(&endpoint).await
    }
    async fn get_project_stats(
        &self,
        org_slug: &str,
        project_slug: &str,
        query: &StatsQuery,
    ) -> Result<Vec<StatsPoint>, SentryError> {
        let endpoint = with_query(
            format!("/projects/{}/{}/stats/", org_slug, project_slug),
            query,
        );
        let resp = self.request(Method::GET, &endpoint, None).await?;
        Ok(resp.data)
    }
}
