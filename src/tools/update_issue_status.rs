use super::parse_issue_id;
use crate::api_client::{IssueStatus, SentryApi};
use crate::error::ErrorOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueStatusInput {
    #[schemars(
        description = "The issue ID (numeric), short ID (e.g., PROJECT-123), or full Sentry issue URL"
    )]
    pub issue_id: String,
    #[schemars(description = "The new status: resolved, unresolved, or ignored")]
    pub status: IssueStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusOutput {
    pub issue_id: String,
    pub previous_status: String,
    pub new_status: String,
    pub success: bool,
    pub message: String,
}

pub fn format_update_status(
    issue_id: &str,
    previous_status: &str,
    new_status: &str,
    success: bool,
) -> UpdateStatusOutput {
    let message = if success {
        format!(
            "Issue {} status changed from \"{}\" to \"{}\".",
            issue_id, previous_status, new_status
        )
    } else {
        format!("Failed to update issue {} status.", issue_id)
    };
    UpdateStatusOutput {
        issue_id: issue_id.to_string(),
        previous_status: previous_status.to_string(),
        new_status: new_status.to_string(),
        success,
        message,
    }
}

/// Reads the current status first so the result can report the transition.
pub async fn execute(
    client: &dyn SentryApi,
    input: UpdateIssueStatusInput,
) -> Result<UpdateStatusOutput, ErrorOutput> {
    let issue_id = parse_issue_id(&input.issue_id)?;
    let current = client.get_issue(&issue_id).await?;
    let previous = current.issue.status;
    let ack = client.update_issue_status(&issue_id, input.status).await?;
    let success = ack
        .status
        .as_deref()
        .is_none_or(|status| status == input.status.as_str());
    info!(
        issue_id = %issue_id,
        previous = %previous,
        new = %input.status,
        success,
        "issue status updated"
    );
    Ok(format_update_status(
        &issue_id,
        &previous,
        input.status.as_str(),
        success,
    ))
}
