//! Project collection management.
//!
//! Owns the in-memory project list and the editor state, and orchestrates
//! CRUD against the HTTP client. The list is fetched once per session
//! (wholesale replace on every refresh) and reconciled in place after each
//! save by identity match: replace on a matching id, append otherwise.
//! Deletes are never applied locally until the backend confirms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::error;

use crate::api::{ApiClient, ApiError};
use crate::models::{EditableProject, Project, ProjectDraft};
use crate::notify::Notifier;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A mutation for the same project is still in flight; the duplicate
    /// submission is rejected instead of racing it.
    #[error("Another request for this project is still in flight")]
    Busy,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Identity of an in-flight mutation. Draft creates carry no id and are
/// not guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MutationKey {
    Save(i64),
    Delete(i64),
}

/// Releases the in-flight slot when the mutation completes, on every path.
struct MutationSlot {
    map: Arc<DashMap<MutationKey, ()>>,
    key: MutationKey,
}

impl Drop for MutationSlot {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

pub struct ProjectWorkspace {
    api: Arc<ApiClient>,
    notices: Notifier,
    projects: RwLock<Vec<Project>>,
    editor: Mutex<Option<EditableProject>>,
    loading: AtomicBool,
    fetched: AtomicBool,
    in_flight: Arc<DashMap<MutationKey, ()>>,
}

impl ProjectWorkspace {
    pub fn new(api: Arc<ApiClient>, notices: Notifier) -> Self {
        Self {
            api,
            notices,
            projects: RwLock::new(Vec::new()),
            editor: Mutex::new(None),
            loading: AtomicBool::new(false),
            fetched: AtomicBool::new(false),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Snapshot of the current list.
    pub fn projects(&self) -> Vec<Project> {
        self.projects.read().clone()
    }

    pub fn find(&self, id: i64) -> Option<Project> {
        self.projects.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// `GET /projects` and replace the list wholesale. The loading flag is
    /// cleared on success and failure alike; fetch failures are logged,
    /// not surfaced as a notice.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.api.get::<Vec<Project>>("/projects").await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(list) => {
                *self.projects.write() = list;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to fetch projects");
                Err(err)
            }
        }
    }

    /// Fetch-once policy: the first call refreshes, later calls are no-ops.
    pub async fn ensure_loaded(&self) -> Result<(), ApiError> {
        if self.fetched.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.refresh().await
    }

    /// Open the editor on a fresh draft.
    pub fn open_blank_editor(&self) -> EditableProject {
        let draft = EditableProject::Draft(ProjectDraft::default());
        *self.editor.lock() = Some(draft.clone());
        draft
    }

    /// Open the editor on a deep copy of an existing project; edits never
    /// touch the list until saved.
    pub fn open_editor(&self, project: &Project) -> EditableProject {
        let copy = EditableProject::Persisted(project.clone());
        *self.editor.lock() = Some(copy.clone());
        copy
    }

    pub fn editor(&self) -> Option<EditableProject> {
        self.editor.lock().clone()
    }

    pub fn close_editor(&self) {
        *self.editor.lock() = None;
    }

    /// Create or update, dispatched on the project's variant. On success
    /// the server's canonical record is reconciled into the list and the
    /// editor closes; on failure the editor stays open for a retry.
    pub async fn save(&self, project: EditableProject) -> Result<Project, WorkspaceError> {
        let _slot = match project.id() {
            Some(id) => Some(self.claim(MutationKey::Save(id))?),
            None => None,
        };

        let result = match &project {
            EditableProject::Draft(draft) => self.api.post::<Project>("/projects", draft).await,
            EditableProject::Persisted(existing) => {
                self.api
                    .put::<Project>(&format!("/projects/{}", existing.id), existing)
                    .await
            }
        };

        match result {
            Ok(saved) => {
                self.reconcile(saved.clone());
                self.notices.success("Project saved successfully");
                self.close_editor();
                Ok(saved)
            }
            Err(err) => {
                self.notices.error(err.to_string());
                Err(err.into())
            }
        }
    }

    /// `DELETE /projects/{id}`; the local entry is only removed once the
    /// backend confirms.
    pub async fn delete(&self, id: i64) -> Result<(), WorkspaceError> {
        let _slot = self.claim(MutationKey::Delete(id))?;

        match self.api.delete(&format!("/projects/{}", id)).await {
            Ok(()) => {
                self.projects.write().retain(|p| p.id != id);
                self.notices.success("Project deleted successfully");
                Ok(())
            }
            Err(err) => {
                self.notices.error(err.to_string());
                Err(err.into())
            }
        }
    }

    fn reconcile(&self, saved: Project) {
        let mut projects = self.projects.write();
        match projects.iter_mut().find(|p| p.id == saved.id) {
            Some(slot) => *slot = saved,
            None => projects.push(saved),
        }
    }

    fn claim(&self, key: MutationKey) -> Result<MutationSlot, WorkspaceError> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(key) {
            Entry::Occupied(_) => Err(WorkspaceError::Busy),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(MutationSlot {
                    map: self.in_flight.clone(),
                    key,
                })
            }
        }
    }
}
