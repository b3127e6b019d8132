use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use slack_bulk_maintainer::{config, input};
use slack_bulk_maintainer::maintainer::{Maintainer, NotifyPolicy};
use slack_bulk_maintainer::slack::SlackClient;

/// Dump the workspace directory as a CSV usable as a desired-state template.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Include members that cannot be matched by email, such as bots
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = config::load(Some(&args.config))?;
    let client = SlackClient::from_config(&cfg)?;
    let maintainer = Maintainer::new(client, NotifyPolicy::default());
    let members = maintainer.fetch_user_list().await?;

    input::write_template(&members, args.all, io::stdout().lock())?;
    Ok(())
}
