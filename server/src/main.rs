mod config;
mod graphql;
mod http;
mod portal;
mod store;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use entity::RecordTable;
use platform_authn::SessionStore;
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;

use crate::{
    config::{AppConfig, SourceConfig},
    http::{AppState, ServeConfig},
    portal::Portal,
    store::{FileSource, RecordSource, RecordStore, RemoteSource},
};

#[derive(Parser, Debug)]
#[command(name = "portal-server", version, about = "Employee portal server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Fetch the employee dataset once and print it.
    Fetch(FetchCommand),
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Read a saved dataset response instead of calling the endpoint"
    )]
    dataset_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct FetchCommand {
    #[arg(long, help = "Print the typed rows as JSON")]
    json: bool,
    #[command(flatten)]
    source: SourceArgs,
}

impl SourceArgs {
    fn build(self, config: SourceConfig) -> Result<Arc<dyn RecordSource>> {
        let source: Arc<dyn RecordSource> = match self.dataset_file {
            Some(path) => Arc::new(FileSource::new(path)),
            None => Arc::new(RemoteSource::new(config).context("failed to build HTTP client")?),
        };
        Ok(source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Fetch(cmd) => run_fetch(cmd).await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn run_fetch(cmd: FetchCommand) -> Result<()> {
    let source = cmd.source.build(SourceConfig::from_env()?)?;
    let rows = source
        .fetch()
        .await
        .with_context(|| format!("failed to fetch {}", source.describe()))?;
    let (table, issues) = RecordTable::from_rows(&rows);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(table.records())?);
        return Ok(());
    }
    for issue in &issues {
        println!("warning: {issue}");
    }
    let view = products_hr::analytics(&table);
    println!("source:   {}", source.describe());
    println!("rows:     {}", table.len());
    println!("issues:   {}", issues.len());
    println!("average:  {}", view.average_salary);
    println!("highest:  {}", view.highest_salary);
    if table.is_empty() {
        return Err(anyhow!("dataset is empty"));
    }
    Ok(())
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let source = cmd.source.build(config.source.clone())?;
    let portal = Arc::new(Portal::new(
        RecordStore::new(source),
        SessionStore::new(config.session_ttl),
        config.authn(),
    ));

    let loader = portal.clone();
    tokio::spawn(async move {
        loader.refresh().await;
    });

    let state = AppState::new(config, portal);
    http::serve(ServeConfig::new(cmd.host, cmd.port), state).await
}
