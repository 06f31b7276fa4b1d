//! mailsort: one pass over a mailbox.
//!
//! Labels every message whose plain-text body mentions a category as a
//! common noun, and copies its attachments into `<export_root>/<category>/`.

use std::process::ExitCode;

use anyhow::Context;
use mailsort_core::{
    Config, Exporter, FileCredentialStore, GoogleAuthorizer, ImapSource, LexiconTagger, Pipeline,
    SessionProvider,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsort=info,mailsort_core=info,mailsort_imap=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    let categories = config.category_set()?;
    info!(
        folder = %config.folder,
        categories = ?categories.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Starting mailsort"
    );

    let sessions = SessionProvider::new(
        FileCredentialStore::new(&config.token_path),
        GoogleAuthorizer::from_config(&config),
    );
    let token = sessions
        .acquire()
        .await
        .context("acquiring a mail credential")?;

    let mut source = ImapSource::connect(&config)
        .await
        .with_context(|| format!("connecting to {}:{}", config.imap_host, config.imap_port))?;

    let tagger = LexiconTagger::new();
    let exporter = Exporter::new(&config.export_root);
    let report = Pipeline::new(&tagger, &categories, &exporter)
        .run(&mut source, &token, &config.folder)
        .await
        .with_context(|| format!("processing folder {}", config.folder))?;

    info!(
        scanned = report.scanned,
        classified = report.classified,
        skipped = report.skipped,
        "Done"
    );
    Ok(())
}
