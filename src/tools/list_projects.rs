use crate::api_client::{Project, SentryApi};
use crate::config::ToolDefaults;
use crate::error::ErrorOutput;
use crate::format::{or_unknown, relative_time};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsInput {
    #[schemars(description = "The organization slug (defaults to SENTRY_ORG)")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub platform: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectListOutput {
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
    pub message: String,
}

pub fn format_project_list(projects: &[Project], now: DateTime<Utc>) -> ProjectListOutput {
    let summaries: Vec<ProjectSummary> = projects
        .iter()
        .map(|p| ProjectSummary {
            id: p.id.clone(),
            name: p.name.clone(),
            slug: p.slug.clone(),
            platform: or_unknown(p.platform.as_deref()),
            status: or_unknown(p.status.as_deref()),
            created_at: relative_time(&p.date_created, now),
        })
        .collect();
    let total = summaries.len();
    let message = match summaries.as_slice() {
        [] => "No projects found in this organization.".to_string(),
        [only] => format!("Found 1 project: {}", only.name),
        _ => {
            let mut platforms: Vec<&str> = Vec::new();
            for summary in &summaries {
                if !platforms.contains(&summary.platform.as_str()) {
                    platforms.push(&summary.platform);
                }
            }
            format!(
                "Found {} projects across {} platform(s): {}{}",
                total,
                platforms.len(),
                platforms.iter().take(3).copied().collect::<Vec<_>>().join(", "),
                if platforms.len() > 3 { "..." } else { "" }
            )
        }
    };
    ProjectListOutput {
        projects: summaries,
        total,
        message,
    }
}

pub async fn execute(
    client: &dyn SentryApi,
    defaults: &ToolDefaults,
    input: ListProjectsInput,
) -> Result<ProjectListOutput, ErrorOutput> {
    let organization = defaults.organization(input.organization)?;
    let page = client.list_projects(&organization).await?;
    Ok(format_project_list(&page.items, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn project(name: &str, platform: Option<&str>) -> Project {
        Project {
            id: name.len().to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            platform: platform.map(str::to_string),
            date_created: "2024-06-15T11:00:00Z".to_string(),
            status: Some("active".to_string()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty() {
        let out = format_project_list(&[], now());
        assert_eq!(out.total, 0);
        assert_eq!(out.message, "No projects found in this organization.");
    }

    #[test]
    fn test_single() {
        let out = format_project_list(&[project("Frontend App", Some("javascript"))], now());
        assert_eq!(out.message, "Found 1 project: Frontend App");
        assert_eq!(out.projects[0].created_at, "1h ago");
    }

    #[test]
    fn test_many_with_unknown_platform() {
        let mut unnamed = project("Worker", None);
        unnamed.status = None;
        let projects = vec![
            project("Frontend", Some("javascript")),
            project("Backend", Some("python")),
            project("Api", Some("python")),
            unnamed,
        ];
        let out = format_project_list(&projects, now());
        assert_eq!(out.total, 4);
        assert_eq!(
            out.message,
            "Found 4 projects across 3 platform(s): javascript, python, unknown"
        );
        assert_eq!(out.projects[3].platform, "unknown");
        assert_eq!(out.projects[3].status, "unknown");
    }

    #[test]
    fn test_platform_overflow() {
        let projects = vec![
            project("A", Some("go")),
            project("B", Some("rust")),
            project("C", Some("python")),
            project("D", Some("ruby")),
        ];
        let out = format_project_list(&projects, now());
        assert_eq!(
            out.message,
            "Found 4 projects across 4 platform(s): go, rust, python..."
        );
    }
}
