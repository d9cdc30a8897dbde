use rmcp::{ServiceExt, transport::stdio};
use sentry_issues_mcp::config::Config;
use sentry_issues_mcp::tools::SentryTools;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sentry_issues_mcp=info".parse()?)
                .add_directive("rmcp=warn".parse()?)
                .add_directive("hyper=warn".parse()?)
                .add_directive("hyper_util=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    let config = Config::from_env()?;
    info!(
        base_url = %config.base_url,
        default_org = ?config.defaults.organization,
        default_project = ?config.defaults.project,
        "Starting sentry-issues-mcp server"
    );
    let tools = SentryTools::from_config(&config)?;
    let service = tools.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
