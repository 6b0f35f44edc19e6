//! Aggregate statistics over tasks and goals.
//!
//! Computed from collection snapshots, so statistics reflect optimistic
//! state as soon as the visible lists do.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Goal, GoalType, Priority, Task, Timestamp};

/// Category label used for tasks without one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Task counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    /// Completed share of all tasks, `0.0` when there are none.
    pub completion_rate: f64,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

/// Goal counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalStats {
    pub total: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub by_type: BTreeMap<String, usize>,
}

/// Dashboard statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub tasks: TaskStats,
    pub goals: GoalStats,
}

impl Stats {
    /// Computes statistics from task and goal snapshots.
    #[must_use]
    pub fn compute(tasks: &[Task], goals: &[Goal], now: Timestamp) -> Self {
        Self {
            tasks: TaskStats::compute(tasks, now),
            goals: GoalStats::compute(goals),
        }
    }
}

impl TaskStats {
    /// Computes task counters.
    #[must_use]
    pub fn compute(tasks: &[Task], now: Timestamp) -> Self {
        let mut by_priority: BTreeMap<String, usize> = Priority::ALL
            .iter()
            .map(|priority| (priority.to_string(), 0))
            .collect();
        let mut by_category = BTreeMap::new();

        for task in tasks {
            *by_priority.entry(task.priority.to_string()).or_default() += 1;
            let category = task
                .category
                .as_deref()
                .map_or_else(|| UNCATEGORIZED.to_string(), str::to_lowercase);
            *by_category.entry(category).or_default() += 1;
        }

        let completed = tasks.iter().filter(|task| task.is_completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            overdue: tasks.iter().filter(|task| task.is_overdue(now)).count(),
            completion_rate: rate(completed, tasks.len()),
            by_priority,
            by_category,
        }
    }
}

impl GoalStats {
    /// Computes goal counters.
    #[must_use]
    pub fn compute(goals: &[Goal]) -> Self {
        let mut by_type: BTreeMap<String, usize> = GoalType::ALL
            .iter()
            .map(|goal_type| (goal_type.to_string(), 0))
            .collect();
        for goal in goals {
            *by_type.entry(goal.goal_type.to_string()).or_default() += 1;
        }

        let completed = goals.iter().filter(|goal| goal.is_completed).count();
        Self {
            total: goals.len(),
            completed,
            completion_rate: rate(completed, goals.len()),
            by_type,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
