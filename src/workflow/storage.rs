/// File-backed persistence layer for workflow storage
///
/// One directory holds everything the store persists:
/// - `<id>.yml` / `<id>.yaml`: one workflow definition per entry
/// - `.acl.json`: a single JSON object of workflow id → ACL
/// - `.audit.jsonl`: append-only audit log, one JSON event per line
///
/// Entry names are passed in already normalized; this layer does no validation.
/// Not-found comes back as a plain `io::ErrorKind::NotFound` so the store can
/// decide per operation whether it is an error.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Reserved entry holding every workflow ACL
pub const ACL_ENTRY: &str = ".acl.json";

/// Reserved append-only audit log entry
pub const AUDIT_ENTRY: &str = ".audit.jsonl";

/// Extensions recognised as workflow entries, in lookup order
pub const WORKFLOW_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Directory-backed key/value storage
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Storage root, e.g. "data/workflows"
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if it does not exist yet
    ///
    /// Safe to call multiple times.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Read an entry as UTF-8 text
    pub async fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name)).await
    }

    /// Replace an entry wholesale
    ///
    /// Writes to a sibling temp file and renames it over the target, so readers see
    /// either the old or the new content, never a partial write.
    pub async fn write(&self, name: &str, content: &str) -> io::Result<()> {
        let target = self.root.join(name);
        let temp = self
            .root
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&temp, content).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        Ok(())
    }

    /// Append one line to an entry, creating the entry (not the root) if needed
    pub async fn append_line(&self, name: &str, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(name))
            .await?;

        // Single write so concurrent appenders cannot interleave inside a line
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }

    pub async fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.root.join(name)).await
    }

    /// Names of all regular entries in the root
    ///
    /// A missing root is reported as `NotFound`; the caller decides whether that
    /// means "empty".
    pub async fn list_entries(&self) -> io::Result<Vec<String>> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}

/// Entry name for a workflow id with the given extension
pub fn workflow_entry(id: &str, extension: &str) -> String {
    format!("{}.{}", id, extension)
}

/// Recover the workflow id from an entry name with a recognised extension
pub fn workflow_id_from_entry(name: &str) -> Option<&str> {
    WORKFLOW_EXTENSIONS.iter().find_map(|ext| {
        name.strip_suffix(*ext)
            .and_then(|stem| stem.strip_suffix('.'))
            .filter(|id| !id.is_empty())
    })
}
