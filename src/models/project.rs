//! Project models and DTOs.

use serde::{Deserialize, Serialize};

use super::task::Task;

/// A project the backend has persisted. Identity is `id`; the in-memory
/// project list holds only this form and is unique by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A project that exists only client-side, pending its first save.
/// Serializes with no `id` field at all; the backend assigns one on create.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub tasks: Vec<Task>,
}

/// A project as held by the editor: either a draft that has never been
/// persisted or a deep copy of an existing record. The save operation
/// dispatches create-vs-update on this variant.
#[derive(Debug, Clone, PartialEq)]
pub enum EditableProject {
    Draft(ProjectDraft),
    Persisted(Project),
}

impl EditableProject {
    pub fn id(&self) -> Option<i64> {
        match self {
            EditableProject::Draft(_) => None,
            EditableProject::Persisted(project) => Some(project.id),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EditableProject::Draft(draft) => &draft.name,
            EditableProject::Persisted(project) => &project.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            EditableProject::Draft(draft) => draft.name = name.into(),
            EditableProject::Persisted(project) => project.name = name.into(),
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        match self {
            EditableProject::Draft(draft) => draft.description = description.into(),
            EditableProject::Persisted(project) => project.description = description.into(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        match self {
            EditableProject::Draft(draft) => &draft.tasks,
            EditableProject::Persisted(project) => &project.tasks,
        }
    }

    pub fn tasks_mut(&mut self) -> &mut Vec<Task> {
        match self {
            EditableProject::Draft(draft) => &mut draft.tasks,
            EditableProject::Persisted(project) => &mut project.tasks,
        }
    }
}

impl From<Project> for EditableProject {
    fn from(project: Project) -> Self {
        EditableProject::Persisted(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn test_draft_serializes_without_id() {
        let mut draft = ProjectDraft::default();
        draft.name = "P1".to_string();
        draft.tasks.push(Task::new("first"));

        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "P1");
        assert_eq!(json["tasks"][0]["status"], "pending");
    }

    #[test]
    fn test_project_decodes_with_defaults() {
        let project: Project = serde_json::from_str(r#"{"id":1,"name":"P1"}"#).unwrap();
        assert_eq!(project.description, "");
        assert!(project.tasks.is_empty());
        assert_eq!(project.user_id, None);
    }

    #[test]
    fn test_editable_project_dispatch() {
        let draft = EditableProject::Draft(ProjectDraft::default());
        assert_eq!(draft.id(), None);

        let persisted = EditableProject::from(Project {
            id: 7,
            name: "P7".to_string(),
            description: String::new(),
            user_id: None,
            tasks: vec![],
        });
        assert_eq!(persisted.id(), Some(7));
    }

    #[test]
    fn test_editor_copy_does_not_touch_original() {
        let original = Project {
            id: 1,
            name: "P1".to_string(),
            description: String::new(),
            user_id: None,
            tasks: vec![Task {
                id: Some(10),
                title: "t".to_string(),
                status: TaskStatus::Pending,
            }],
        };

        let mut edited = EditableProject::from(original.clone());
        edited.set_name("renamed");
        edited.tasks_mut()[0].status = TaskStatus::Completed;
        edited.tasks_mut().push(Task::new("extra"));

        assert_eq!(original.name, "P1");
        assert_eq!(original.tasks.len(), 1);
        assert_eq!(original.tasks[0].status, TaskStatus::Pending);
    }
}
