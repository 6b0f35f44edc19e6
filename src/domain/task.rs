//! Task domain model.

use serde::{Deserialize, Serialize};

use super::{Completable, Entity, EntityId, Patch, Timestamp};

// =============================================================================
// Priority
// =============================================================================

/// The priority level of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (the service default).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Returns the numeric rank of the priority; higher is more urgent.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(formatter, "low"),
            Self::Medium => write!(formatter, "medium"),
            Self::High => write!(formatter, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value().cmp(&other.value())
    }
}

// =============================================================================
// Task
// =============================================================================

/// A single item of a todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier (`_id` on the wire).
    #[serde(rename = "_id")]
    pub id: EntityId,
    /// Title of the task.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the task is done.
    #[serde(default)]
    pub is_completed: bool,
    /// Owning user, as referenced by the service.
    #[serde(default, rename = "user", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Free-form category (e.g. "work", "home").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    /// Creation time, as reported by whoever created the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Task {
    /// Creates an open task with the given identifier and title.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            is_completed: false,
            owner: None,
            category: None,
            priority: Priority::default(),
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns a copy with the given completion flag.
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.is_completed = completed;
        self
    }

    /// Returns a copy with the given priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns a copy with the given category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Returns a copy with the given due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Timestamp) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns `true` if the task is open and its due date lies before `now`.
    #[must_use]
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Title of the task.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Initial completion flag.
    #[serde(default)]
    pub is_completed: bool,
    /// Optional category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
}

impl TaskDraft {
    /// Creates a draft for an open, medium-priority task.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            is_completed: false,
            category: None,
            priority: Priority::default(),
            due_date: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn due_date(mut self, due_date: Timestamp) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Partial update of a task.
///
/// `Option` fields are non-nullable (`None` = not provided); `Patch` fields
/// are nullable and can be cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub category: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub due_date: Patch<Timestamp>,
}

impl TaskChanges {
    /// Returns `true` if no field is touched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_keep()
            && self.is_completed.is_none()
            && self.category.is_keep()
            && self.priority.is_none()
            && self.due_date.is_keep()
    }
}

impl Entity for Task {
    type Draft = TaskDraft;
    type Changes = TaskChanges;

    const COLLECTION: &'static str = "todos";
    const KIND: &'static str = "Task";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn from_draft(id: EntityId, draft: &TaskDraft, now: Timestamp) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            is_completed: draft.is_completed,
            owner: None,
            category: draft.category.clone(),
            priority: draft.priority,
            due_date: draft.due_date,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    fn apply(&mut self, changes: &TaskChanges, now: Timestamp) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        changes.description.apply_to(&mut self.description);
        if let Some(completed) = changes.is_completed {
            self.is_completed = completed;
        }
        changes.category.apply_to(&mut self.category);
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        changes.due_date.apply_to(&mut self.due_date);
        self.updated_at = Some(now);
    }
}

impl Completable for Task {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn completion_changes(completed: bool) -> TaskChanges {
        TaskChanges {
            is_completed: Some(completed),
            ..TaskChanges::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServerId;
    use rstest::rstest;

    #[rstest]
    fn test_deserialize_minimal_server_payload() {
        let json = r#"{"_id":"abc","title":"Buy milk","isCompleted":false}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, EntityId::Server(ServerId::new("abc")));
        assert_eq!(task.title, "Buy milk");
        assert!(!task.is_completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, None);
    }

    #[rstest]
    fn test_serialize_uses_camel_case_and_underscore_id() {
        let task = Task::new(ServerId::new("abc"), "Buy milk").with_category("home");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["_id"], "abc");
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["category"], "home");
        assert!(value.get("dueDate").is_none());
    }

    #[rstest]
    fn test_apply_merges_only_provided_fields() {
        let mut task = Task::new(ServerId::new("abc"), "Buy milk")
            .with_category("home")
            .with_priority(Priority::Low);
        let changes = TaskChanges {
            title: Some("Buy oat milk".to_string()),
            category: Patch::Clear,
            ..TaskChanges::default()
        };
        let now = Timestamp::now();

        task.apply(&changes, now);

        assert_eq!(task.title, "Buy oat milk");
        assert_eq!(task.category, None);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.updated_at, Some(now));
    }

    #[rstest]
    fn test_completion_changes_touch_only_the_flag() {
        let changes = Task::completion_changes(true);
        assert_eq!(changes.is_completed, Some(true));
        assert_eq!(
            serde_json::to_string(&changes).unwrap(),
            r#"{"isCompleted":true}"#
        );
    }

    #[rstest]
    #[case("low", Priority::Low)]
    #[case("Medium", Priority::Medium)]
    #[case(" HIGH ", Priority::High)]
    fn test_priority_from_str(#[case] raw: &str, #[case] expected: Priority) {
        assert_eq!(raw.parse::<Priority>().unwrap(), expected);
    }

    #[rstest]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[rstest]
    fn test_is_overdue() {
        let past = Timestamp::from_datetime(chrono::Utc::now() - chrono::Duration::days(1));
        let task = Task::new(ServerId::new("abc"), "Pay rent").with_due_date(past);
        assert!(task.is_overdue(Timestamp::now()));
        assert!(!task.with_completed(true).is_overdue(Timestamp::now()));
    }

    #[rstest]
    fn test_empty_changes() {
        assert!(TaskChanges::default().is_empty());
        assert!(!Task::completion_changes(false).is_empty());
    }
}
