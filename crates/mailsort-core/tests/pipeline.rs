//! Whole runs against a scripted mail store.
//!
//! The source is an in-memory fake and the tagger returns fixed output per
//! body text, so these tests depend on neither a server nor the built-in
//! tagger's heuristics.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailsort_core::{
    Category, CategorySet, Error, Exporter, MessageId, MessageSource, Pipeline, PosTag, RunReport,
    SourceError,
};
use mailsort_oauth::Token;
use tempfile::TempDir;

const MESSAGE_A: &[u8] = b"Subject: Trip\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
I booked a flight for my personal trip\r\n\
--b1\r\n\
Content-Type: application/pdf; name=\"itinerary.pdf\"\r\n\
Content-Disposition: attachment; filename=\"itinerary.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--b1--\r\n";

const MESSAGE_B: &[u8] = b"Subject: Numbers\r\n\
Content-Type: multipart/mixed; boundary=\"b2\"\r\n\
\r\n\
--b2\r\n\
Content-Type: text/plain\r\n\
\r\n\
The quarterly report\r\n\
--b2\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"q3.csv\"\r\n\
\r\n\
a,b\r\n\
--b2--\r\n";

const WORK_WITH_ATTACHMENT: &[u8] = b"Content-Type: multipart/mixed; boundary=x\r\n\
\r\n\
--x\r\n\
Content-Type: text/plain\r\n\
\r\n\
work\r\n\
--x\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
\r\n\
agenda\r\n\
--x--\r\n";

const WORK_WITH_BROKEN_ATTACHMENT: &[u8] = b"Content-Type: multipart/mixed; boundary=y\r\n\
\r\n\
--y\r\n\
Content-Type: text/plain\r\n\
\r\n\
work\r\n\
--y\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"broken.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
QUJD!\r\n\
--y\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"minutes.txt\"\r\n\
\r\n\
done\r\n\
--y--\r\n";

const BAD_CHARSET: &[u8] = b"Content-Type: text/plain; charset=utf-8\r\n\r\nwork \xff\xfe\r\n";

/// Tagger output keyed by body text; any other text tags every word `NN`.
fn fixed_tagger(text: &str) -> Vec<(String, PosTag)> {
    let scripted: &[(&str, &str)] = match text.trim() {
        "I booked a flight for my personal trip" => &[
            ("I", "PRP"),
            ("booked", "VBD"),
            ("a", "DT"),
            ("flight", "NN"),
            ("for", "IN"),
            ("my", "PRP$"),
            ("personal", "NN"),
            ("trip", "NN"),
            ("travel", "NN"),
        ],
        "The quarterly report" => &[("The", "DT"), ("quarterly", "JJ"), ("report", "NN")],
        other => {
            return other
                .split_whitespace()
                .map(|w| (w.to_string(), PosTag::NN))
                .collect();
        }
    };
    scripted
        .iter()
        .map(|(w, t)| ((*w).to_string(), PosTag::new(*t)))
        .collect()
}

#[derive(Debug, Default)]
struct Calls {
    opened: usize,
    closed: usize,
    fetched: Vec<u32>,
    labels: Vec<(u32, String)>,
}

#[derive(Default)]
struct FakeSource {
    ids: Vec<u32>,
    messages: HashMap<u32, &'static [u8]>,
    unreachable: HashSet<u32>,
    label_rejects: HashSet<u32>,
    fail_open: bool,
    fail_select: bool,
    calls: Arc<Mutex<Calls>>,
}

impl FakeSource {
    fn with_messages(messages: &[(u32, &'static [u8])]) -> Self {
        Self {
            ids: messages.iter().map(|(id, _)| *id).collect(),
            messages: messages.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    async fn open(&mut self, _token: &Token) -> Result<(), SourceError> {
        self.calls.lock().unwrap().opened += 1;
        if self.fail_open {
            return Err(SourceError::AuthRejected("invalid credentials".into()));
        }
        Ok(())
    }

    async fn select_folder(&mut self, name: &str) -> Result<(), SourceError> {
        if self.fail_select {
            return Err(SourceError::Folder {
                name: name.to_string(),
                reason: "NO Unknown Mailbox".into(),
            });
        }
        Ok(())
    }

    async fn list_all_ids(&mut self) -> Result<Vec<MessageId>, SourceError> {
        Ok(self.ids.iter().filter_map(|n| MessageId::new(*n)).collect())
    }

    async fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>, SourceError> {
        self.calls.lock().unwrap().fetched.push(id.get());
        if self.unreachable.contains(&id.get()) {
            return Err(SourceError::Fetch {
                id,
                reason: "no body returned".into(),
            });
        }
        self.messages
            .get(&id.get())
            .map(|raw| raw.to_vec())
            .ok_or_else(|| SourceError::Fetch {
                id,
                reason: "unknown message".into(),
            })
    }

    async fn apply_label(&mut self, id: MessageId, label: &Category) -> Result<(), SourceError> {
        self.calls
            .lock()
            .unwrap()
            .labels
            .push((id.get(), label.to_string()));
        if self.label_rejects.contains(&id.get()) {
            return Err(SourceError::Label {
                id,
                label: label.to_string(),
                reason: "NO [CANNOT] label rejected".into(),
            });
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.calls.lock().unwrap().closed += 1;
    }
}

fn token() -> Token {
    Token::new("ya29.test", "Bearer")
}

async fn run(source: &mut FakeSource, root: &Path) -> mailsort_core::Result<RunReport> {
    let categories = CategorySet::default();
    let exporter = Exporter::new(root);
    let tagger = fixed_tagger;
    Pipeline::new(&tagger, &categories, &exporter)
        .run(source, &token(), "INBOX")
        .await
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn travel_and_personal_message_is_labelled_and_exported() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[(1, MESSAGE_A), (2, MESSAGE_B)]);
    let calls = source.calls();

    let report = run(&mut source, dir.path()).await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(
        calls.labels,
        vec![(1, "personal".to_string()), (1, "travel".to_string())]
    );
    assert_eq!(calls.fetched, vec![1, 2]);
    assert_eq!((calls.opened, calls.closed), (1, 1));

    assert_eq!(files_in(&dir.path().join("travel")), vec!["itinerary.pdf"]);
    assert_eq!(files_in(&dir.path().join("personal")), vec!["itinerary.pdf"]);
    assert!(files_in(&dir.path().join("work")).is_empty());
    assert_eq!(
        std::fs::read(dir.path().join("travel/itinerary.pdf")).unwrap(),
        b"%PDF-1.4\n"
    );

    assert_eq!(
        report,
        RunReport {
            scanned: 2,
            classified: 1,
            labels_applied: 2,
            files_written: 2,
            ..RunReport::default()
        }
    );
}

#[tokio::test]
async fn unmatched_message_gets_no_labels_and_no_exports() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[(7, MESSAGE_B)]);
    let calls = source.calls();

    let report = run(&mut source, dir.path()).await.unwrap();

    assert!(calls.lock().unwrap().labels.is_empty());
    for category in CategorySet::DEFAULT {
        assert!(files_in(&dir.path().join(category)).is_empty());
    }
    assert_eq!(report.classified, 0);
    assert_eq!(report.scanned, 1);
}

#[tokio::test]
async fn per_message_failures_do_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[
        (1, MESSAGE_B),
        (2, BAD_CHARSET),
        (3, WORK_WITH_ATTACHMENT),
        (4, MESSAGE_A),
    ]);
    source.unreachable.insert(1);
    source.label_rejects.insert(3);
    let calls = source.calls();

    let report = run(&mut source, dir.path()).await.unwrap();

    assert_eq!(calls.lock().unwrap().fetched, vec![1, 2, 3, 4]);
    assert_eq!(calls.lock().unwrap().closed, 1);
    assert_eq!(
        std::fs::read(dir.path().join("work/notes.txt")).unwrap(),
        b"agenda"
    );
    assert_eq!(
        report,
        RunReport {
            scanned: 4,
            classified: 2,
            skipped: 2,
            labels_applied: 2,
            label_failures: 1,
            files_written: 3,
            ..RunReport::default()
        }
    );
}

#[tokio::test]
async fn undecodable_attachment_keeps_label_and_other_files() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[(1, WORK_WITH_BROKEN_ATTACHMENT)]);
    let calls = source.calls();

    let report = run(&mut source, dir.path()).await.unwrap();

    assert_eq!(calls.lock().unwrap().labels, vec![(1, "work".to_string())]);
    assert_eq!(files_in(&dir.path().join("work")), vec!["minutes.txt"]);
    assert_eq!(
        report,
        RunReport {
            scanned: 1,
            classified: 1,
            labels_applied: 1,
            files_written: 1,
            export_failures: 1,
            ..RunReport::default()
        }
    );
}

#[tokio::test]
async fn rerun_keeps_existing_files() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("travel")).unwrap();
    std::fs::write(dir.path().join("travel/itinerary.pdf"), b"older copy").unwrap();

    let mut source = FakeSource::with_messages(&[(1, MESSAGE_A)]);
    let first = run(&mut source, dir.path()).await.unwrap();
    let mut source = FakeSource::with_messages(&[(1, MESSAGE_A)]);
    let second = run(&mut source, dir.path()).await.unwrap();

    assert_eq!((first.files_written, first.files_existing), (1, 1));
    assert_eq!((second.files_written, second.files_existing), (0, 2));
    assert_eq!(
        std::fs::read(dir.path().join("travel/itinerary.pdf")).unwrap(),
        b"older copy"
    );
}

#[tokio::test]
async fn folder_failure_aborts_but_closes_session() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[(1, MESSAGE_A)]);
    source.fail_select = true;
    let calls = source.calls();

    let err = run(&mut source, dir.path()).await.unwrap_err();

    assert!(matches!(err, Error::Source(SourceError::Folder { .. })));
    let calls = calls.lock().unwrap();
    assert!(calls.fetched.is_empty());
    assert_eq!(calls.closed, 1);
    assert!(dir.path().join("travel").is_dir());
}

#[tokio::test]
async fn rejected_credential_aborts_before_listing() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::with_messages(&[(1, MESSAGE_A)]);
    source.fail_open = true;
    let calls = source.calls();

    let err = run(&mut source, dir.path()).await.unwrap_err();

    assert!(matches!(err, Error::Source(SourceError::AuthRejected(_))));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.opened, 1);
    assert!(calls.fetched.is_empty());
    assert!(calls.labels.is_empty());
}
