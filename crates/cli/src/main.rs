use anyhow::Context;
use clap::{Parser, Subcommand};
use trackdash_cache::{CacheReader, ReadOutcome};
use trackdash_config::{Settings, SettingsLoader};
use trackdash_refresh::CombinedReportBuilder;
use trackdash_server::{router, AppState};

#[derive(Parser)]
#[command(name = "trackdash")]
#[command(about = "Report acquisition and caching dashboard backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Fetch the combined report once and persist it, without serving
    Refresh,
    /// Print the latest cached artifact's metadata
    Show {
        /// Also print the cached rows as JSON
        #[arg(long)]
        rows: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = SettingsLoader::new()
        .load()
        .context("failed to load settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Refresh => refresh(settings).await,
        Command::Show { rows } => show(settings, rows).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let listen = settings.listen;
    let state = AppState::new(settings)?;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!(%listen, "serving");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated abnormally")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn refresh(settings: Settings) -> anyhow::Result<()> {
    let (report_a, report_b) = settings.combined_report_ids()?;
    let state = AppState::new(settings)?;
    let builder = CombinedReportBuilder::new(
        state.client.clone(),
        state.store.clone(),
        report_a,
        report_b,
    );
    let outcome = builder.build_and_persist().await?;
    println!(
        "{} ({} rows: {} + {}, {} ms)",
        outcome.artifact.name,
        outcome.result.rows.len(),
        outcome.result.counts.source_a,
        outcome.result.counts.source_b,
        outcome.result.fetch_duration.as_millis()
    );
    Ok(())
}

async fn show(settings: Settings, with_rows: bool) -> anyhow::Result<()> {
    let reader = CacheReader::new(settings.cache_dir);
    match reader.read_latest().await? {
        ReadOutcome::NoArtifacts => {
            println!("no cached artifacts");
        }
        ReadOutcome::Latest(latest) => {
            println!("{}", latest.artifact.name);
            for (key, value) in &latest.metadata {
                println!("  {key}: {value}");
            }
            if with_rows {
                println!("{}", serde_json::to_string_pretty(&latest.rows)?);
            }
        }
    }
    Ok(())
}
