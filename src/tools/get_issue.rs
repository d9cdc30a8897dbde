use super::parse_issue_id;
use crate::api_client::{IssueDetails, SentryApi};
use crate::error::ErrorOutput;
use crate::format::{or_unknown, parse_count, relative_time};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const TOP_TAGS: usize = 5;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetIssueInput {
    #[schemars(
        description = "The issue ID (numeric), short ID (e.g., PROJECT-123), or full Sentry issue URL"
    )]
    pub issue_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMetadataSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetailOutput {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub level: String,
    pub status: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub culprit: String,
    pub event_count: u64,
    pub user_count: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub project: String,
    pub link: String,
    pub metadata: IssueMetadataSummary,
    pub top_tags: Vec<TagPair>,
    pub message: String,
}

pub fn format_issue_detail(details: &IssueDetails, now: DateTime<Utc>) -> IssueDetailOutput {
    let issue = &details.issue;
    let event_count = parse_count(&issue.count);
    let level = or_unknown(Some(issue.level.as_str()));
    let last_seen = relative_time(&issue.last_seen, now);
    let message = format!(
        "{}: \"{}\" - {} events affecting {} user(s), last seen {}",
        level.to_uppercase(),
        issue.title,
        event_count,
        issue.user_count,
        last_seen
    );
    IssueDetailOutput {
        id: issue.id.clone(),
        short_id: issue.short_id.clone(),
        title: issue.title.clone(),
        level,
        status: issue.status.clone(),
        issue_type: or_unknown(issue.issue_type.as_deref()),
        culprit: issue.culprit.clone().unwrap_or_default(),
        event_count,
        user_count: issue.user_count,
        first_seen: relative_time(&issue.first_seen, now),
        last_seen,
        project: issue.project.slug.clone(),
        link: issue.permalink.clone(),
        metadata: IssueMetadataSummary {
            error_type: details.metadata.error_type.clone(),
            error_value: details.metadata.value.clone(),
            filename: details.metadata.filename.clone(),
            function: details.metadata.function.clone(),
        },
        top_tags: details
            .tags
            .iter()
            .take(TOP_TAGS)
            .map(|t| TagPair {
                key: t.key.clone(),
                value: t.value.clone(),
            })
            .collect(),
        message,
    }
}

pub async fn execute(
    client: &dyn SentryApi,
    input: GetIssueInput,
) -> Result<IssueDetailOutput, ErrorOutput> {
    let issue_id = parse_issue_id(&input.issue_id)?;
    let details = client.get_issue(&issue_id).await?;
    Ok(format_issue_detail(&details, Utc::now()))
}
