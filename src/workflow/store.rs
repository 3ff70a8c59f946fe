/// Cache-coherent workflow store
///
/// Owns the in-memory cache of validated definitions and the file storage behind
/// it. Every operation normalizes the incoming id first; every mutation reaches
/// storage before the cache is touched, so after a call returns the cache never
/// claims a definition that storage does not hold.

use crate::{
    error::{Result, WorkflowError},
    workflow::{
        storage::{self, FileStorage, ACL_ENTRY, AUDIT_ENTRY, WORKFLOW_EXTENSIONS},
        types::{WorkflowAcl, WorkflowAuditEvent, WorkflowDefinition},
        validation::{normalize_workflow_id, validate_workflow},
    },
};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Extension used for every workflow entry the store writes
const WRITE_EXTENSION: &str = "yml";

/// Workflow definition store with a lock-free read-through cache
///
/// The cache map is swapped wholesale through `ArcSwap::rcu`, so concurrent
/// inserts and evictions for different ids never overwrite each other. Entries
/// have no expiry: they live until `save`, `delete` or `clear_cache`. The cache
/// is a single-process view; another process writing the same root is not seen
/// until the entry is evicted.
#[derive(Debug)]
pub struct WorkflowStore {
    /// Key: normalized workflow id, Value: validated definition
    cache: ArcSwap<HashMap<String, Arc<WorkflowDefinition>>>,

    storage: FileStorage,

    /// Serializes the read-merge-write of the shared ACL document within this process
    acl_lock: Mutex<()>,
}

impl WorkflowStore {
    /// Create a store rooted at `root`; nothing is touched on disk until an operation runs
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            cache: ArcSwap::new(Arc::new(HashMap::new())),
            storage: FileStorage::new(root),
            acl_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    /// Create the storage root directory if needed
    pub async fn init(&self) -> Result<()> {
        self.storage.init().await?;
        tracing::info!(root = %self.root().display(), "Workflow storage ready");
        Ok(())
    }

    /// Load a workflow by id
    ///
    /// Cached definitions are returned as-is. Otherwise the entry is read, parsed and
    /// validated before being cached. A missing entry yields `None`; unreadable,
    /// malformed or invalid content is an error.
    pub async fn load(&self, id: &str) -> Result<Option<Arc<WorkflowDefinition>>> {
        let id = normalize_workflow_id(id)?;

        if let Some(cached) = self.cache.load().get(&id) {
            tracing::debug!(workflow_id = %id, "Workflow served from cache");
            return Ok(Some(Arc::clone(cached)));
        }

        let content = match self.read_entry(&id).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(workflow_id = %id, "Workflow not found");
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(workflow_id = %id, error = %e, "Failed to read workflow");
                return Err(e.into());
            }
        };

        let workflow = WorkflowDefinition::from_yaml(&content)
            .and_then(|workflow| {
                validate_workflow(&workflow).map_err(|e| {
                    WorkflowError::validation(format!("Invalid workflow YAML: {}", e))
                })?;
                Ok(workflow)
            })
            .inspect_err(|e| {
                tracing::error!(workflow_id = %id, error = %e, "Failed to load workflow");
            })?;

        let workflow = Arc::new(workflow);
        self.cache_insert(&id, Arc::clone(&workflow));

        tracing::info!(workflow_id = %id, version = ?workflow.version, "Workflow loaded");
        Ok(Some(workflow))
    }

    /// Load every workflow entry in the storage root, ordered by id
    ///
    /// A missing root means no workflows. A malformed entry fails the whole listing.
    pub async fn list(&self) -> Result<Vec<Arc<WorkflowDefinition>>> {
        let entries = match self.storage.list_entries().await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(root = %self.root().display(), "Workflow root missing, nothing to list");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        // Same id under both extensions is listed once
        let ids: BTreeSet<&str> = entries
            .iter()
            .filter_map(|name| storage::workflow_id_from_entry(name))
            .collect();

        let mut workflows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(workflow) = self.load(id).await? {
                workflows.push(workflow);
            }
        }

        tracing::info!(count = workflows.len(), "Listed workflows");
        Ok(workflows)
    }

    /// Validate and persist a workflow, then cache exactly the object that was validated
    pub async fn save(&self, workflow: &WorkflowDefinition) -> Result<()> {
        validate_workflow(workflow)?;

        let id = normalize_workflow_id(&workflow.id)?;
        let content = workflow.to_yaml()?;

        self.storage
            .write(&storage::workflow_entry(&id, WRITE_EXTENSION), &content)
            .await?;

        self.cache_insert(&id, Arc::new(workflow.clone()));

        tracing::info!(workflow_id = %id, version = ?workflow.version, "Workflow saved");
        Ok(())
    }

    /// Remove a workflow's storage entry and evict it from the cache
    ///
    /// Deleting an id with no entry is an error. The cache entry is evicted in that
    /// case too, since storage has nothing behind it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = normalize_workflow_id(id)?;

        let result = self.remove_entries(&id).await;
        match &result {
            Ok(()) => self.cache_evict(&id),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.cache_evict(&id),
            Err(_) => {}
        }
        result?;

        tracing::info!(workflow_id = %id, "Workflow deleted");
        Ok(())
    }

    /// Drop every cached definition; storage is untouched
    pub fn clear_cache(&self) {
        self.cache.store(Arc::new(HashMap::new()));
        tracing::debug!("Workflow cache cleared");
    }

    /// ACL for a workflow, or `None` when the document or the key is absent
    pub async fn load_acl(&self, workflow_id: &str) -> Result<Option<WorkflowAcl>> {
        let Some(mut acls) = self.read_acl_document().await? else {
            return Ok(None);
        };

        match acls.remove(workflow_id) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite one workflow's ACL in the shared document
    ///
    /// Other entries are carried over untouched. Calls within this process are
    /// serialized; writers in other processes still race last-writer-wins.
    pub async fn save_acl(&self, acl: &WorkflowAcl) -> Result<()> {
        let _guard = self.acl_lock.lock().await;

        let mut acls = self.read_acl_document().await?.unwrap_or_default();
        acls.insert(acl.workflow_id.clone(), serde_json::to_value(acl)?);

        let content = serde_json::to_string_pretty(&acls)?;
        self.storage.write(ACL_ENTRY, &content).await?;

        tracing::info!(workflow_id = %acl.workflow_id, "Workflow ACL saved");
        Ok(())
    }

    /// Append one event to the audit log; prior lines are never rewritten
    pub async fn audit_change(&self, event: &WorkflowAuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.storage.append_line(AUDIT_ENTRY, &line).await?;

        tracing::info!(
            workflow_id = %event.workflow_id,
            event_type = ?event.event_type,
            "Workflow audit event logged"
        );
        Ok(())
    }

    /// First existing entry for `id`, trying each recognised extension in order
    async fn read_entry(&self, id: &str) -> io::Result<String> {
        let mut last_err = io::Error::from(io::ErrorKind::NotFound);
        for ext in WORKFLOW_EXTENSIONS {
            match self.storage.read(&storage::workflow_entry(id, ext)).await {
                Ok(content) => return Ok(content),
                Err(e) if e.kind() == io::ErrorKind::NotFound => last_err = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }

    /// Remove the entry under every recognised extension; `NotFound` only if none existed
    async fn remove_entries(&self, id: &str) -> io::Result<()> {
        let mut removed = false;
        let mut last_err = io::Error::from(io::ErrorKind::NotFound);
        for ext in WORKFLOW_EXTENSIONS {
            match self.storage.remove(&storage::workflow_entry(id, ext)).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => last_err = e,
                Err(e) => return Err(e),
            }
        }
        if removed {
            Ok(())
        } else {
            Err(last_err)
        }
    }

    async fn read_acl_document(&self) -> Result<Option<BTreeMap<String, Value>>> {
        match self.storage.read(ACL_ENTRY).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn cache_insert(&self, id: &str, workflow: Arc<WorkflowDefinition>) {
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.to_string(), Arc::clone(&workflow));
            next
        });
    }

    fn cache_evict(&self, id: &str) {
        self.cache.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(id);
            next
        });
    }
}
