use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use slack_bulk_maintainer::config;
use slack_bulk_maintainer::input;
use slack_bulk_maintainer::maintainer::{Maintainer, NotifyPolicy, RowStatus};
use slack_bulk_maintainer::slack::SlackClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Bulk-update Slack user profiles from a CSV and notify the affected users"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// CSV with one row per intended profile change (header names profile fields)
    #[arg(long)]
    csv: PathBuf,

    /// Only compute and log the updates; never call users.profile.set or chat.postMessage
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let rows = input::parse_rows(&args.csv)?;
    info!(rows = rows.len(), csv = %args.csv.display(), "loaded desired state");

    let client = SlackClient::from_config(&cfg)?;
    let mut maintainer = Maintainer::new(client, NotifyPolicy::from(&cfg.notification));

    maintainer.fetch_auth_user().await?;
    let directory = maintainer.fetch_user_list().await?;

    if args.dry_run {
        let queries = maintainer.plan(&rows, &directory);
        let pending = queries.iter().filter(|q| !q.skip_call_api).count();
        info!(rows = queries.len(), pending, "dry run finished");
        return Ok(());
    }

    let reports = maintainer.update_profiles(&rows, &directory).await;
    let failed = reports
        .iter()
        .filter(|r| matches!(r.status, RowStatus::Failed { .. }))
        .count();
    if failed > 0 {
        warn!(failed, "some rows failed; see errors above");
    }
    info!(summary = %maintainer.summary(), "done");
    Ok(())
}
