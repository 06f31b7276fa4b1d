//! One pass over a folder: fetch, classify, label, export.

use mailsort_oauth::Token;
use tracing::{debug, info, warn};

use crate::category::{Category, CategorySet};
use crate::classify::classify;
use crate::error::Result;
use crate::export::{Exporter, SaveOutcome};
use crate::message::{Message, MessageId};
use crate::source::MessageSource;
use crate::tagger::Tagger;

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Messages listed in the folder.
    pub scanned: usize,
    /// Messages that matched at least one category.
    pub classified: usize,
    /// Messages skipped because they could not be fetched or decoded.
    pub skipped: usize,
    /// Labels successfully applied.
    pub labels_applied: usize,
    /// Labels the server refused.
    pub label_failures: usize,
    /// Attachments written.
    pub files_written: usize,
    /// Attachments already on disk and left alone.
    pub files_existing: usize,
    /// Attachments that could not be decoded or written.
    pub export_failures: usize,
}

/// Classification and export settings for a run.
#[derive(Debug)]
pub struct Pipeline<'a, T: ?Sized> {
    tagger: &'a T,
    categories: &'a CategorySet,
    exporter: &'a Exporter,
}

impl<'a, T> Pipeline<'a, T>
where
    T: Tagger + ?Sized,
{
    /// Creates a pipeline.
    pub const fn new(tagger: &'a T, categories: &'a CategorySet, exporter: &'a Exporter) -> Self {
        Self {
            tagger,
            categories,
            exporter,
        }
    }

    /// Processes every message in `folder`.
    ///
    /// Category directories are created first. The session is opened with
    /// `token` and is closed before returning, whether the pass succeeded or
    /// not. Failures tied to a single message, label or attachment are logged
    /// and counted in the report; only failures that stop the whole pass are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the category directories cannot be created, the
    /// session cannot be opened, the folder cannot be selected, or listing
    /// its messages fails.
    pub async fn run<S>(&self, source: &mut S, token: &Token, folder: &str) -> Result<RunReport>
    where
        S: MessageSource + ?Sized,
    {
        self.exporter.prepare(self.categories).await?;

        let result = self.run_session(source, token, folder).await;
        source.close().await;

        let report = result?;
        info!(
            scanned = report.scanned,
            classified = report.classified,
            skipped = report.skipped,
            labels_applied = report.labels_applied,
            label_failures = report.label_failures,
            files_written = report.files_written,
            files_existing = report.files_existing,
            export_failures = report.export_failures,
            "Run complete"
        );
        Ok(report)
    }

    async fn run_session<S>(
        &self,
        source: &mut S,
        token: &Token,
        folder: &str,
    ) -> Result<RunReport>
    where
        S: MessageSource + ?Sized,
    {
        source.open(token).await?;
        source.select_folder(folder).await?;

        let ids = source.list_all_ids().await?;
        info!(folder, count = ids.len(), "Scanning folder");

        let mut report = RunReport::default();
        for id in ids {
            report.scanned += 1;
            self.process(source, id, &mut report).await;
        }
        Ok(report)
    }

    async fn process<S>(&self, source: &mut S, id: MessageId, report: &mut RunReport)
    where
        S: MessageSource + ?Sized,
    {
        let raw = match source.fetch_raw(id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%id, error = %e, "Skipping message");
                report.skipped += 1;
                return;
            }
        };

        let message = match Message::parse(id, &raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(%id, error = %e, "Skipping undecodable message");
                report.skipped += 1;
                return;
            }
        };

        let matched = classify(self.tagger, &message.body, self.categories);
        if matched.is_empty() {
            debug!(%id, "No category");
            return;
        }
        report.classified += 1;
        debug!(
            %id,
            subject = message.subject.as_deref().unwrap_or(""),
            categories = ?matched.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Classified"
        );

        for category in matched {
            match source.apply_label(id, category).await {
                Ok(()) => report.labels_applied += 1,
                Err(e) => {
                    warn!(%id, %category, error = %e, "Label not applied");
                    report.label_failures += 1;
                }
            }
            self.export(&message, category, report).await;
        }
    }

    async fn export(&self, message: &Message, category: &Category, report: &mut RunReport) {
        for part in message.attachments() {
            let Some(filename) = part.filename.as_deref() else {
                continue;
            };
            let payload = match part.payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        id = %message.id,
                        %category,
                        filename,
                        error = %e,
                        "Attachment not decodable"
                    );
                    report.export_failures += 1;
                    continue;
                }
            };
            match self.exporter.save(category, filename, &payload).await {
                Ok(SaveOutcome::Written) => report.files_written += 1,
                Ok(SaveOutcome::AlreadyExists) => report.files_existing += 1,
                Err(e) => {
                    warn!(
                        id = %message.id,
                        %category,
                        filename,
                        error = %e,
                        "Attachment not saved"
                    );
                    report.export_failures += 1;
                }
            }
        }
    }
}
