mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let cli_args = Cli::parse();
  let session = commands::open_session(&cli_args).await?;

  let outcome = match &cli_args.command {
    Commands::Call(args) => commands::rpc::call(&session, args).await,
    Commands::Publish(args) => commands::pubsub::publish(&session, args).await,
    Commands::Subscribe(args) => commands::pubsub::subscribe(&session, args).await,
    Commands::Registrations(sub) => commands::registrations::run(&session, sub).await,
  };

  let closed = session.end().await;
  tracing::debug!(?closed, "Session closed");
  outcome
}
