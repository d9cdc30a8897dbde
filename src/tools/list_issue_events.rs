use super::{check_limit, default_limit, deserialize_limit, parse_issue_id};
use crate::api_client::{Event, EventUser, EventsQuery, SentryApi};
use crate::error::ErrorOutput;
use crate::format::relative_time;
use crate::pagination::Pagination;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListIssueEventsInput {
    #[schemars(
        description = "The issue ID (numeric), short ID (e.g., PROJECT-123), or full Sentry issue URL"
    )]
    pub issue_id: String,
    #[schemars(description = "Pagination cursor for next page")]
    pub cursor: Option<String>,
    #[serde(default = "default_limit", deserialize_with = "deserialize_limit")]
    #[schemars(
        description = "Number of events to return, 1-100 (default 25)",
        range(min = 1, max = 100)
    )]
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListOutput {
    pub events: Vec<EventSummary>,
    pub showing: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub message: String,
}

/// Picks the most recognisable identifier: email, username, id, then IP address.
pub fn display_user(user: &EventUser) -> Option<String> {
    [&user.email, &user.username, &user.id, &user.ip_address]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .cloned()
}

fn summarize(event: &Event, now: DateTime<Utc>) -> EventSummary {
    let id = event
        .event_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| event.id.clone());
    EventSummary {
        id,
        title: event.title.clone(),
        message: event.message.clone().unwrap_or_default(),
        timestamp: relative_time(&event.date_created, now),
        user: event.user.as_ref().and_then(display_user),
        tags: event
            .tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect(),
    }
}

pub fn format_event_list(
    events: &[Event],
    link: Option<&str>,
    now: DateTime<Utc>,
) -> EventListOutput {
    let Pagination { has_more, cursor } = Pagination::from_link_header(link);
    let summaries: Vec<EventSummary> = events.iter().map(|e| summarize(e, now)).collect();
    let showing = summaries.len();
    let message = if showing == 0 {
        "No events found for this issue.".to_string()
    } else {
        let users: HashSet<&str> = summaries.iter().filter_map(|s| s.user.as_deref()).collect();
        format!(
            "Showing {} event(s){}. {} unique user(s) affected.",
            showing,
            if has_more { " (more available)" } else { "" },
            users.len()
        )
    };
    EventListOutput {
        events: summaries,
        showing,
        has_more,
        cursor,
        message,
    }
}

pub async fn execute(
    client: &dyn SentryApi,
    input: ListIssueEventsInput,
) -> Result<EventListOutput, ErrorOutput> {
    let limit = check_limit(input.limit)?;
    let issue_id = parse_issue_id(&input.issue_id)?;
    let query = EventsQuery {
        cursor: input.cursor.filter(|c| !c.is_empty()),
        limit: Some(limit),
    };
    let page = client.list_issue_events(&issue_id, &query).await?;
    Ok(format_event_list(&page.items, page.link.as_deref(), Utc::now()))
}
