//! amanah-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), layers
//! `AMANAH_*` environment variables over it, opens the SQLite store and
//! serves the JSON API over HTTP.
//!
//! ```text
//! AMANAH_PORT=9000 AMANAH_BOOTSTRAP_ADMIN=root cargo run -p amanah-server
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use amanah_core::Workflow;
use amanah_server::ServerConfig;
use amanah_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Amanah verification workflow server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("AMANAH"))
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let workflow =
    Workflow::new(Arc::new(store)).with_max_page_size(server_cfg.max_page_size);

  if let Some(username) = &server_cfg.bootstrap_admin {
    match workflow
      .bootstrap_super_admin(username)
      .await
      .context("failed to seed bootstrap admin")?
    {
      Some(account) => tracing::info!(admin_id = %account.admin_id, "seeded super admin {username:?}"),
      None => tracing::debug!("admin accounts already exist; bootstrap skipped"),
    }
  }

  let app = amanah_server::router(workflow);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
