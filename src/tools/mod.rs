pub mod get_issue;
pub mod get_project_stats;
pub mod list_issue_events;
pub mod list_issues;
pub mod list_projects;
pub mod update_issue_status;

use crate::api_client::{SentryApi, SentryApiClient};
use crate::config::{Config, ToolDefaults};
use crate::error::{ConfigError, ErrorOutput};
use get_issue::GetIssueInput;
use get_project_stats::GetProjectStatsInput;
use list_issue_events::ListIssueEventsInput;
use list_issues::ListIssuesInput;
use list_projects::ListProjectsInput;
use regex::Regex;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool_router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};
use update_issue_status::UpdateIssueStatusInput;

pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

pub(crate) fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Accepts `10` as well as `10.0`; fractional values are rejected.
/// Out-of-range values saturate so `check_limit` reports them.
pub(crate) fn deserialize_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "limit must be a whole number, got {}",
            value
        )));
    }
    Ok(value as u32)
}

pub(crate) fn check_limit(limit: u32) -> Result<u32, ErrorOutput> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ErrorOutput::invalid_arguments(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )))
    }
}

static ISSUE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/(?:organizations/[^/]+/)?issues/([^/?#]+)")
        .expect("issue URL pattern is valid")
});

/// Accepts a numeric id, a short id, or a full issue URL and returns the id part.
/// The id becomes a path segment, so path and query delimiters are rejected.
pub fn parse_issue_id(input: &str) -> Result<String, ErrorOutput> {
    let input = input.trim();
    let id = ISSUE_URL
        .captures(input)
        .map_or(input, |caps| caps.get(1).map_or(input, |m| m.as_str()));
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id.contains(char::is_whitespace) {
        return Err(ErrorOutput::invalid_arguments(format!(
            "Invalid issue ID: {:?}",
            input
        )));
    }
    Ok(id.to_string())
}

fn render<T: Serialize>(outcome: Result<T, ErrorOutput>) -> CallToolResult {
    match outcome.map(|value| serde_json::to_string_pretty(&value)) {
        Ok(Ok(text)) => CallToolResult::success(vec![Content::text(text)]),
        Ok(Err(e)) => render_error(ErrorOutput::new(
            format!("Failed to serialize tool output: {}", e),
            "This is a server bug; please report it.",
        )),
        Err(err) => render_error(err),
    }
}

fn render_error(err: ErrorOutput) -> CallToolResult {
    warn!("tool call failed: {}", err.error);
    let text = serde_json::to_string(&err).unwrap_or_else(|_| err.error.clone());
    CallToolResult::error(vec![Content::text(text)])
}

#[derive(Clone)]
pub struct SentryTools {
    client: Arc<dyn SentryApi>,
    defaults: Arc<ToolDefaults>,
    tool_router: ToolRouter<SentryTools>,
}

#[tool_router]
impl SentryTools {
    pub fn new(client: Arc<dyn SentryApi>, defaults: ToolDefaults) -> Self {
        Self {
            client,
            defaults: Arc::new(defaults),
            tool_router: Self::tool_router(),
        }
    }
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = SentryApiClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.defaults.clone()))
    }
    #[rmcp::tool(
        description = "List all Sentry projects in an organization. Uses SENTRY_ORG if organization is not specified. Returns project names, slugs, platforms, and status."
    )]
    async fn list_projects(
        &self,
        Parameters(input): Parameters<ListProjectsInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("list_projects: {:?}", input);
        Ok(render(
            list_projects::execute(&*self.client, &self.defaults, input).await,
        ))
    }
    #[rmcp::tool(
        description = "List issues in a Sentry organization with optional filters. Returns issue summaries with event counts, user impact, and timestamps. Use cursor for pagination."
    )]
    async fn list_issues(
        &self,
        Parameters(input): Parameters<ListIssuesInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("list_issues: {:?}", input);
        Ok(render(
            list_issues::execute(&*self.client, &self.defaults, input).await,
        ))
    }
    #[rmcp::tool(
        description = "Get detailed information about a specific Sentry issue including error type, stack trace location, affected users, tags, and event counts."
    )]
    async fn get_issue(
        &self,
        Parameters(input): Parameters<GetIssueInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("get_issue: {:?}", input);
        Ok(render(get_issue::execute(&*self.client, input).await))
    }
    #[rmcp::tool(
        description = "Get events (occurrences) for a specific issue. Returns summarized event data with timestamps, affected users, and key tags. Use cursor for pagination."
    )]
    async fn list_issue_events(
        &self,
        Parameters(input): Parameters<ListIssueEventsInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("list_issue_events: {:?}", input);
        Ok(render(list_issue_events::execute(&*self.client, input).await))
    }
    #[rmcp::tool(
        description = "Update the status of a Sentry issue. Can resolve, unresolve, or ignore an issue."
    )]
    async fn update_issue_status(
        &self,
        Parameters(input): Parameters<UpdateIssueStatusInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("update_issue_status: {:?}", input);
        Ok(render(
            update_issue_status::execute(&*self.client, input).await,
        ))
    }
    #[rmcp::tool(
        description = "Get error statistics for a project including event counts, error rates, and top issues. Shows data for the last 24 hours. Uses SENTRY_ORG and SENTRY_PROJECT when not specified."
    )]
    async fn get_project_stats(
        &self,
        Parameters(input): Parameters<GetProjectStatsInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("get_project_stats: {:?}", input);
        Ok(render(
            get_project_stats::execute(&*self.client, &self.defaults, input).await,
        ))
    }
}

impl SentryTools {
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    /// Routes a raw tool call by name. Every outcome, including unknown tools and
    /// arguments that fail to deserialize, comes back as a `CallToolResult`.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> CallToolResult {
        let arguments = Value::Object(arguments);
        let result = match name {
            "list_projects" => invoke(arguments, |p| self.list_projects(p)).await,
            "list_issues" => invoke(arguments, |p| self.list_issues(p)).await,
            "get_issue" => invoke(arguments, |p| self.get_issue(p)).await,
            "list_issue_events" => invoke(arguments, |p| self.list_issue_events(p)).await,
            "update_issue_status" => invoke(arguments, |p| self.update_issue_status(p)).await,
            "get_project_stats" => invoke(arguments, |p| self.get_project_stats(p)).await,
            _ => {
                return render_error(ErrorOutput::new(
                    format!("Unknown tool: {}", name),
                    format!("Available tools: {}", self.tool_names().join(", ")),
                ));
            }
        };
        result.unwrap_or_else(|e| render_error(ErrorOutput::invalid_arguments(e.message)))
    }
}

async fn invoke<I, F, Fut>(arguments: Value, call: F) -> Result<CallToolResult, McpError>
where
    I: DeserializeOwned,
    F: FnOnce(Parameters<I>) -> Fut,
    Fut: Future<Output = Result<CallToolResult, McpError>>,
{
    match serde_json::from_value::<I>(arguments) {
        Ok(input) => call(Parameters(input)).await,
        Err(e) => Ok(render_error(ErrorOutput::invalid_arguments(format!(
            "Invalid arguments: {}",
            e
        )))),
    }
}

impl ServerHandler for SentryTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(true),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "sentry-issues-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools return compact JSON summaries of Sentry data. Failures return {error, suggestion, details}."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(&request.name, request.arguments.unwrap_or_default())
            .await)
    }
}
