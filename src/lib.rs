//! MCP server exposing Sentry projects, issues, events and stats as compact,
//! LLM-friendly JSON summaries.

pub mod api_client;
pub mod config;
pub mod error;
pub mod format;
pub mod pagination;
pub mod tools;
