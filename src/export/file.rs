//! A requested data-search download: fetch, write, notify.
use crate::error::Result;
use crate::export::notifier::{Message, NotificationQueue, UserId};
use crate::export::search::{ExportQuery, SearchBackend, fetch};
use crate::export::table::{ExportTable, build_table, serialize, write_table};
use crate::locale::{MessageKey, translate};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde_json::{Value, json};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use urlencoding::encode;

/// Rows fetched for a single export.
pub const LIMIT: usize = 500;

const FALLBACK_FILENAME: &str = "something.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Pending,
    Fetched,
    Written,
    Notified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportUser {
    pub id: UserId,
    /// ISO 639-1 code used for the notice row and the message.
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub download_base_url: String,
    pub limit: usize,
    /// Author recorded on requester messages.
    pub sender_id: UserId,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            download_base_url: String::new(),
            limit: LIMIT,
            sender_id: 0,
        }
    }
}

#[derive(Debug)]
pub struct DataSearchFile {
    query: ExportQuery,
    user: Option<ExportUser>,
    settings: ExportSettings,
    state: ExportState,
    completed_at: Option<DateTime<Utc>>,
    filename: OnceCell<String>,
}

impl DataSearchFile {
    pub fn new(query: ExportQuery, user: Option<ExportUser>, settings: ExportSettings) -> Self {
        Self {
            query,
            user,
            settings,
            state: ExportState::Pending,
            completed_at: None,
            filename: OnceCell::new(),
        }
    }

    pub fn query(&self) -> &ExportQuery {
        &self.query
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// `{attribute}[_f{from}][-{to}][_by_{sort}].csv`, with path separators
    /// and `..` in each part replaced by `_`.
    pub fn filename(&self) -> &str {
        self.filename.get_or_init(|| {
            let Some(attribute) = self
                .query
                .attribute_name
                .as_deref()
                .filter(|a| !a.trim().is_empty())
            else {
                return FALLBACK_FILENAME.to_string();
            };
            let mut name = path_safe(attribute);
            if let Some(from) = present(&self.query.from) {
                name.push_str(&format!("_f{}", path_safe(from)));
            }
            if let Some(to) = present(&self.query.to) {
                name.push_str(&format!("-{}", path_safe(to)));
            }
            if let Some(sort) = present(&self.query.sort) {
                name.push_str(&format!("_by_{}", path_safe(sort)));
            }
            name.push_str(".csv");
            name
        })
    }

    pub fn path(&self) -> PathBuf {
        self.settings.output_dir.join(self.filename())
    }

    pub fn download_path(&self) -> String {
        format!(
            "{}/{}",
            self.settings.download_base_url.trim_end_matches('/'),
            encode(self.filename())
        )
    }

    /// Records which query produced the file at [`path`](Self::path).
    pub fn query_path(&self) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("{}.query.json", self.filename()))
    }

    /// True when this export was written, or when the file on disk was
    /// written for an equivalent query.
    pub fn file_exists(&self) -> bool {
        if matches!(self.state, ExportState::Written | ExportState::Notified) {
            return true;
        }
        if !self.path().exists() {
            return false;
        }
        let reusable = self.stored_identity().as_ref() == Some(&self.identity());
        if !reusable {
            debug!(
                "{} was written for another query; rebuilding",
                self.path().display()
            );
        }
        reusable
    }

    /// Everything that changes the contents of the file.
    fn identity(&self) -> Value {
        json!({
            "q": self.query.query_string,
            "attribute": self.query.attribute_uri,
            "from": self.query.from,
            "to": self.query.to,
            "sort": self.query.sort,
            "language": self.language(),
            "limit": self.settings.limit,
        })
    }

    fn stored_identity(&self) -> Option<Value> {
        let bytes = fs::read(self.query_path()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn language(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.language.as_str())
            .unwrap_or(self.query.language.as_str())
    }

    /// Fetches and serializes without touching the filesystem.
    pub async fn csv(&self, backend: &dyn SearchBackend) -> Result<String> {
        let page = fetch(backend, &self.query, self.settings.limit).await?;
        let table = build_table(page.results);
        serialize(&table, page.total_entries, self.settings.limit, self.language())
    }

    /// Builds the file and queues the requester's notification.
    ///
    /// When the file already exists nothing is fetched; the requester is
    /// notified again and the state moves straight to `Notified`.
    /// Notification problems are logged and never fail the build.
    pub async fn build(
        &mut self,
        backend: &dyn SearchBackend,
        notifications: &NotificationQueue,
    ) -> Result<ExportState> {
        if self.file_exists() {
            info!("{} already exists; skipping fetch", self.path().display());
            self.send_notification(notifications);
            self.state = ExportState::Notified;
            return Ok(self.state);
        }

        let page = fetch(backend, &self.query, self.settings.limit).await?;
        self.state = ExportState::Fetched;

        let table = build_table(page.results);
        self.write_file(&table, page.total_entries)?;
        self.state = ExportState::Written;

        self.send_notification(notifications);
        self.state = ExportState::Notified;
        self.completed_at = Some(Utc::now());
        Ok(self.state)
    }

    fn write_file(&self, table: &ExportTable, total: u64) -> Result<()> {
        let dir = &self.settings.output_dir;
        fs::create_dir_all(dir)?;
        let path = self.path();
        let query_path = self.query_path();

        // The old identity goes first so a crash never pairs it with new data.
        match fs::remove_file(&query_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        write_atomically(dir, &path, |writer| {
            write_table(writer, table, total, self.settings.limit, self.language())
        })?;
        let identity = self.identity();
        write_atomically(dir, &query_path, |writer| {
            serde_json::to_writer(writer, &identity).map_err(io::Error::from)?;
            Ok(())
        })?;
        info!(
            "Wrote {} rows ({} matched) to {}",
            table.rows.len(),
            total,
            path.display()
        );
        Ok(())
    }

    fn notification_for(&self, user: &ExportUser) -> Message {
        let download_path = self.download_path();
        let query = self.query.query_string.clone().unwrap_or_default();
        let body = translate(
            &user.language,
            MessageKey::FileReadyForDownload,
            &[("file", download_path.as_str()), ("query", query.as_str())],
        );
        Message {
            recipient: user.id,
            body,
            sender: self.settings.sender_id,
        }
    }

    fn send_notification(&self, notifications: &NotificationQueue) {
        let Some(user) = &self.user else {
            debug!("No requester for {}; nobody to notify", self.filename());
            return;
        };
        if let Err(e) = notifications.enqueue(self.notification_for(user)) {
            warn!("Could not queue notification for user {}: {}", user.id, e);
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn path_safe(part: &str) -> String {
    part.replace(['/', '\\', '\0'], "_").replace("..", "_")
}

/// Writes into a temporary file next to `path` and moves it into place
/// only once everything was written.
fn write_atomically(
    dir: &Path,
    path: &Path,
    write: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
