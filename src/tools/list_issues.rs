use super::{check_limit, default_limit, deserialize_limit};
use crate::api_client::{Issue, IssueStatus, IssuesQuery, SentryApi};
use crate::config::ToolDefaults;
use crate::error::ErrorOutput;
use crate::format::{parse_count, relative_time};
use crate::pagination::Pagination;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListIssuesInput {
    #[schemars(description = "The organization slug (defaults to SENTRY_ORG)")]
    pub organization: Option<String>,
    #[schemars(description = "Filter by project slug")]
    pub project: Option<String>,
    #[schemars(description = "Filter by issue status")]
    pub status: Option<IssueStatus>,
    #[schemars(
        description = "Search query using Sentry search syntax, e.g. 'level:error browser.name:Chrome'"
    )]
    pub query: Option<String>,
    #[schemars(description = "Pagination cursor for next page")]
    pub cursor: Option<String>,
    #[serde(default = "default_limit", deserialize_with = "deserialize_limit")]
    #[schemars(
        description = "Number of issues to return, 1-100 (default 25)",
        range(min = 1, max = 100)
    )]
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub level: String,
    pub status: String,
    pub event_count: u64,
    pub user_count: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub project: String,
    pub link: String,
}

impl IssueSummary {
    pub fn from_issue(issue: &Issue, now: DateTime<Utc>) -> Self {
        Self {
            id: issue.id.clone(),
            short_id: issue.short_id.clone(),
            title: issue.title.clone(),
            level: issue.level.clone(),
            status: issue.status.clone(),
            event_count: parse_count(&issue.count),
            user_count: issue.user_count,
            first_seen: relative_time(&issue.first_seen, now),
            last_seen: relative_time(&issue.last_seen, now),
            project: issue.project.slug.clone(),
            link: issue.permalink.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueListOutput {
    pub issues: Vec<IssueSummary>,
    pub showing: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub message: String,
}

pub fn format_issue_list(
    issues: &[Issue],
    link: Option<&str>,
    now: DateTime<Utc>,
) -> IssueListOutput {
    let Pagination { has_more, cursor } = Pagination::from_link_header(link);
    let summaries: Vec<IssueSummary> = issues
        .iter()
        .map(|i| IssueSummary::from_issue(i, now))
        .collect();
    let showing = summaries.len();
    let message = if showing == 0 {
        "No issues found matching the criteria.".to_string()
    } else {
        let unresolved = summaries.iter().filter(|s| s.status == "unresolved").count();
        let total_events: u64 = summaries.iter().map(|s| s.event_count).sum();
        format!(
            "Showing {} issue(s){}. {} unresolved, {} total events.",
            showing,
            if has_more { " (more available)" } else { "" },
            unresolved,
            total_events
        )
    };
    IssueListOutput {
        issues: summaries,
        showing,
        has_more,
        cursor,
        message,
    }
}

pub async fn execute(
    client: &dyn SentryApi,
    defaults: &ToolDefaults,
    input: ListIssuesInput,
) -> Result<IssueListOutput, ErrorOutput> {
    let organization = defaults.organization(input.organization)?;
    let limit = check_limit(input.limit)?;
    let query = IssuesQuery {
        project: input.project.filter(|p| !p.is_empty()),
        query: IssuesQuery::search(input.status, input.query),
        cursor: input.cursor.filter(|c| !c.is_empty()),
        limit: Some(limit),
    };
    let page = client.list_issues(&organization, &query).await?;
    Ok(format_issue_list(&page.items, page.link.as_deref(), Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::ProjectRef;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn issue(id: &str, status: &str, count: &str) -> Issue {
        Issue {
            id: id.to_string(),
            short_id: format!("FRONTEND-{}", id),
            title: "TypeError".to_string(),
            culprit: None,
            level: "error".to_string(),
            status: status.to_string(),
            platform: Some("javascript".to_string()),
            project: ProjectRef {
                id: "1".to_string(),
                slug: "frontend".to_string(),
                name: "Frontend".to_string(),
            },
            issue_type: Some("error".to_string()),
            count: count.to_string(),
            user_count: 3,
            first_seen: "2024-06-01T12:00:00Z".to_string(),
            last_seen: "2024-06-15T10:00:00Z".to_string(),
            permalink: format!("https://sentry.io/issues/{}", id),
        }
    }

    #[test]
    fn test_empty_list() {
        let out = format_issue_list(&[], None, now());
        assert_eq!(out.showing, 0);
        assert!(!out.has_more);
        assert_eq!(out.message, "No issues found matching the criteria.");
    }

    #[test]
    fn test_summary_fields_and_message() {
        let issues = vec![
            issue("1", "unresolved", "47"),
            issue("2", "resolved", "3"),
            issue("3", "unresolved", "oops"),
        ];
        let out = format_issue_list(&issues, None, now());
        assert_eq!(out.issues[0].event_count, 47);
        assert_eq!(out.issues[2].event_count, 0);
        assert_eq!(out.issues[0].last_seen, "2h ago");
        assert_eq!(out.issues[0].first_seen, "2024-06-01");
        assert_eq!(out.issues[0].project, "frontend");
        assert_eq!(
            out.message,
            "Showing 3 issue(s). 2 unresolved, 50 total events."
        );
    }

    #[test]
    fn test_more_available() {
        let link = "<https://sentry.io/api/0/organizations/o/issues/?cursor=abc123>; rel=\"next\"; results=\"true\"";
        let out = format_issue_list(&[issue("1", "unresolved", "1")], Some(link), now());
        assert!(out.has_more);
        assert_eq!(out.cursor.as_deref(), Some("abc123"));
        assert!(out.message.contains("(more available)"));
    }

    #[test]
    fn test_cursor_omitted_from_json_when_absent() {
        let out = format_issue_list(&[], None, now());
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("cursor").is_none());
        assert_eq!(json["hasMore"], false);
    }

    #[test]
    fn test_input_defaults() {
        let input: ListIssuesInput = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(input.limit, 25);
        assert!(input.status.is_none());
        let err = serde_json::from_value::<ListIssuesInput>(serde_json::json!({"status": "open"}));
        assert!(err.is_err());
    }
}
