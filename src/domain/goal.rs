//! Goal domain model.

use serde::{Deserialize, Serialize};

use super::{Completable, Entity, EntityId, Patch, Timestamp};

/// Horizon a goal is set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Yearly,
}

impl GoalType {
    /// All goal types, shortest horizon first.
    pub const ALL: [Self; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly];
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        formatter.write_str(name)
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown goal type '{other}'")),
        }
    }
}

/// A goal the user works towards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, rename = "user", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, rename = "type")]
    pub goal_type: GoalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Goal {
    /// Creates an open weekly goal.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            is_completed: false,
            owner: None,
            goal_type: GoalType::default(),
            target_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns a copy with the given goal type.
    #[must_use]
    pub const fn with_type(mut self, goal_type: GoalType) -> Self {
        self.goal_type = goal_type;
        self
    }

    /// Returns a copy with the given completion flag.
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.is_completed = completed;
        self
    }
}

/// Payload for creating a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub goal_type: GoalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Timestamp>,
}

impl GoalDraft {
    /// Creates a draft for a weekly goal.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            goal_type: GoalType::default(),
            target_date: None,
        }
    }

    /// Sets the goal type.
    #[must_use]
    pub const fn goal_type(mut self, goal_type: GoalType) -> Self {
        self.goal_type = goal_type;
        self
    }

    /// Sets the target date.
    #[must_use]
    pub const fn target_date(mut self, target_date: Timestamp) -> Self {
        self.target_date = Some(target_date);
        self
    }
}

/// Partial update of a goal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub goal_type: Option<GoalType>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub target_date: Patch<Timestamp>,
}

impl Entity for Goal {
    type Draft = GoalDraft;
    type Changes = GoalChanges;

    const COLLECTION: &'static str = "goals";
    const KIND: &'static str = "Goal";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn from_draft(id: EntityId, draft: &GoalDraft, now: Timestamp) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            is_completed: false,
            owner: None,
            goal_type: draft.goal_type,
            target_date: draft.target_date,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    fn apply(&mut self, changes: &GoalChanges, now: Timestamp) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        changes.description.apply_to(&mut self.description);
        if let Some(completed) = changes.is_completed {
            self.is_completed = completed;
        }
        if let Some(goal_type) = changes.goal_type {
            self.goal_type = goal_type;
        }
        changes.target_date.apply_to(&mut self.target_date);
        self.updated_at = Some(now);
    }
}

impl Completable for Goal {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn completion_changes(completed: bool) -> GoalChanges {
        GoalChanges {
            is_completed: Some(completed),
            ..GoalChanges::default()
        }
    }
}
