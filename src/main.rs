//! inquiry-triage - Command-line driver for the triage core

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use inquiry_triage::app::{StaticHost, TriageForm};
use inquiry_triage::auth::{
    ChainedTokenProvider, EnvTokenProvider, KeychainTokenProvider, TokenProvider,
};
use inquiry_triage::config::Settings;
use inquiry_triage::domain::EmailId;
use inquiry_triage::storage::{JsonPreferenceStore, KeychainAccess};
use inquiry_triage::App;

#[derive(Parser)]
#[command(name = "inquiry-triage")]
#[command(about = "Triage rental inquiries into accepted and rejected reply drafts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft and file replies for every inquiry on the email's listing
    Run {
        /// Mailbox id of the email that triggers the run
        email_id: String,
        /// Number of inquiries to accept
        quota: String,
        /// File holding the confirmation template
        accept_file: PathBuf,
        /// File holding the rejection template
        reject_file: PathBuf,
    },
    /// Follow the profile of an email until interrupted
    Watch {
        /// Mailbox id of the email to follow
        email_id: String,
        /// Quota shown in the request summary
        quota: Option<String>,
    },
    /// Flip whether originals are deleted after filing
    ToggleDelete,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        tracing::error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    let settings_path = Settings::default_path()?;
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("failed to load {}", settings_path.display()))?;
    tracing::debug!(path = %settings_path.display(), "settings loaded");

    let preferences = Arc::new(JsonPreferenceStore::in_data_dir()?);
    let tokens: Arc<dyn TokenProvider> = Arc::new(ChainedTokenProvider::new(vec![
        Arc::new(EnvTokenProvider) as Arc<dyn TokenProvider>,
        Arc::new(KeychainTokenProvider::new(KeychainAccess::new())),
    ]));

    match command {
        Commands::Run {
            email_id,
            quota,
            accept_file,
            reject_file,
        } => {
            let confirmation = tokio::fs::read_to_string(&accept_file)
                .await
                .with_context(|| format!("failed to read {}", accept_file.display()))?;
            let rejection = tokio::fs::read_to_string(&reject_file)
                .await
                .with_context(|| format!("failed to read {}", reject_file.display()))?;

            let host = Arc::new(StaticHost::new(Some(EmailId::from(email_id.as_str()))));
            let app = App::new(settings, host, preferences, tokens)?;

            let form = TriageForm::new(quota, confirmation, rejection);
            let report = app.triage(&form).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Watch { email_id, quota } => {
            let host = Arc::new(StaticHost::new(Some(EmailId::from(email_id.as_str()))));
            let app = App::new(settings, host, preferences, tokens)?;

            let shutdown = CancellationToken::new();
            let quota_text = quota.unwrap_or_default();
            let (handle, mut display) = app.start_sync(&quota_text, shutdown.clone());

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = display.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = display.borrow_and_update().clone();
                        match &state.snapshot {
                            Some(snapshot) => println!(
                                "[{:?}] {} / {}: {} | {}",
                                state.phase,
                                snapshot.object_name,
                                snapshot.folder_name,
                                snapshot.customer_profile,
                                state.summary
                            ),
                            None => println!("[{:?}] {}", state.phase, state.summary),
                        }
                    }
                }
            }

            shutdown.cancel();
            handle.await.context("sync loop panicked")?;
        }
        Commands::ToggleDelete => {
            let host = Arc::new(StaticHost::new(None));
            let app = App::new(settings, host, preferences, tokens)?;
            let enabled = app.toggle_delete().await?;
            println!(
                "delete originals after filing: {}",
                if enabled { "on" } else { "off" }
            );
        }
    }

    Ok(())
}
