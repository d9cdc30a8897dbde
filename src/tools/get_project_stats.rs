use crate::api_client::{Issue, IssuesQuery, Resolution, SentryApi, StatKind, StatsPoint, StatsQuery};
use crate::config::ToolDefaults;
use crate::error::ErrorOutput;
use crate::format::parse_count;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const TOP_ISSUES: usize = 5;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetProjectStatsInput {
    #[schemars(description = "The organization slug (defaults to SENTRY_ORG)")]
    pub organization: Option<String>,
    #[schemars(description = "The project slug (defaults to SENTRY_PROJECT)")]
    pub project: Option<String>,
    #[schemars(
        description = "Which event outcome to count: received (default), rejected, or blacklisted"
    )]
    pub stat: Option<StatKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopIssue {
    pub id: String,
    pub title: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatsOutput {
    pub project: String,
    pub period: String,
    pub total_events: u64,
    pub total_errors: u64,
    pub error_rate: String,
    pub top_issues: Vec<TopIssue>,
    pub message: String,
}

pub fn format_project_stats(
    project_slug: &str,
    stats: &[StatsPoint],
    top_issues: &[Issue],
) -> ProjectStatsOutput {
    let total_events: u64 = stats.iter().map(StatsPoint::count).sum();
    let hours = stats.len();
    let avg_per_hour = if hours > 0 {
        (total_events as f64 / hours as f64).round() as u64
    } else {
        0
    };
    let top_issues: Vec<TopIssue> = top_issues
        .iter()
        .take(TOP_ISSUES)
        .map(|i| TopIssue {
            id: i.short_id.clone(),
            title: i.title.clone(),
            count: parse_count(&i.count),
        })
        .collect();
    let message = format!(
        "Project \"{}\": {} events in the last {} hours (avg {}/hr). {} top issue(s) listed.",
        project_slug,
        total_events,
        hours,
        avg_per_hour,
        top_issues.len()
    );
    ProjectStatsOutput {
        project: project_slug.to_string(),
        period: format!("{} hours", hours),
        total_events,
        // the stats endpoint counts error events unless asked otherwise
        total_errors: total_events,
        error_rate: format!("{}/hr", avg_per_hour),
        top_issues,
        message,
    }
}

pub async fn execute(
    client: &dyn SentryApi,
    defaults: &ToolDefaults,
    input: GetProjectStatsInput,
) -> Result<ProjectStatsOutput, ErrorOutput> {
    let organization = defaults.organization(input.organization)?;
    let project = defaults.project(input.project)?;
    let stats_query = StatsQuery {
        stat: input.stat.unwrap_or_default(),
        resolution: Resolution::OneHour,
    };
    let stats = client
        .get_project_stats(&organization, &project, &stats_query)
        .await?;
    let issues_query = IssuesQuery {
        project: Some(project.clone()),
        limit: Some(TOP_ISSUES as u32),
        ..Default::default()
    };
    let top_issues = client.list_issues(&organization, &issues_query).await?;
    Ok(format_project_stats(&project, &stats, &top_issues.items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{MockSentryApi, Page, ProjectRef};

    fn hourly(counts: &[u64]) -> Vec<StatsPoint> {
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| StatsPoint(1_718_409_600 + i as i64 * 3600, *c))
            .collect()
    }

    fn issue(n: usize) -> Issue {
        Issue {
            id: n.to_string(),
            short_id: format!("WEB-{}", n),
            title: format!("Error {}", n),
            culprit: None,
            level: "error".to_string(),
            status: "unresolved".to_string(),
            platform: None,
            project: ProjectRef {
                id: "1".to_string(),
                slug: "web".to_string(),
                name: "Web".to_string(),
            },
            issue_type: None,
            count: (n * 10).to_string(),
            user_count: 0,
            first_seen: String::new(),
            last_seen: String::new(),
            permalink: String::new(),
        }
    }

    #[test]
    fn test_aggregates_day_of_samples() {
        let mut counts = vec![10u64; 23];
        counts.push(102);
        let stats = hourly(&counts);
        assert_eq!(stats.len(), 24);
        let out = format_project_stats("web", &stats, &[issue(1), issue(2)]);
        assert_eq!(out.total_events, 332);
        assert_eq!(out.total_errors, 332);
        assert_eq!(out.error_rate, "14/hr");
        assert_eq!(out.period, "24 hours");
        assert_eq!(out.top_issues[1].id, "WEB-2");
        assert_eq!(out.top_issues[1].count, 20);
        assert_eq!(
            out.message,
            "Project \"web\": 332 events in the last 24 hours (avg 14/hr). 2 top issue(s) listed."
        );
    }

    #[test]
    fn test_empty_series() {
        let out = format_project_stats("web", &[], &[]);
        assert_eq!(out.total_events, 0);
        assert_eq!(out.error_rate, "0/hr");
        assert_eq!(out.period, "0 hours");
    }

    #[test]
    fn test_top_issues_capped() {
        let issues: Vec<Issue> = (1..=8).map(issue).collect();
        let out = format_project_stats("web", &hourly(&[1]), &issues);
        assert_eq!(out.top_issues.len(), 5);
    }

    #[tokio::test]
    async fn test_execute_uses_defaults_and_fetches_top_issues() {
        let mut mock = MockSentryApi::new();
        mock.expect_get_project_stats()
            .withf(|org: &str, project: &str, query: &StatsQuery| {
                org == "acme" && project == "web" && query.stat == StatKind::Rejected
            })
            .times(1)
            .returning(|_, _, _| Ok(hourly(&[4, 6])));
        mock.expect_list_issues()
            .withf(|org: &str, query: &IssuesQuery| {
                org == "acme" && query.project.as_deref() == Some("web") && query.limit == Some(5)
            })
            .times(1)
            .returning(|_, _| Ok(Page::new(vec![issue(1)], None)));
        let defaults = ToolDefaults {
            organization: Some("acme".to_string()),
            project: Some("web".to_string()),
        };
        let input = GetProjectStatsInput {
            organization: None,
            project: None,
            stat: Some(StatKind::Rejected),
        };
        let out = execute(&mock, &defaults, input).await.unwrap();
        assert_eq!(out.total_events, 10);
        assert_eq!(out.error_rate, "5/hr");
        assert_eq!(out.top_issues.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_project_never_calls_upstream() {
        let mut mock = MockSentryApi::new();
        mock.expect_get_project_stats().times(0);
        mock.expect_list_issues().times(0);
        let defaults = ToolDefaults {
            organization: Some("acme".to_string()),
            project: None,
        };
        let input = GetProjectStatsInput {
            organization: None,
            project: None,
            stat: None,
        };
        let err = execute(&mock, &defaults, input).await.unwrap_err();
        assert_eq!(err.error, "Project not specified");
    }
}
