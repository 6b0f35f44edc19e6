//! Domain module.
//!
//! Identifiers, entities (tasks and goals), partial-update payloads and the
//! statistics computed over them.

pub mod entity;
pub mod goal;
pub mod id;
pub mod patch;
pub mod stats;
pub mod task;
pub mod timestamp;

pub use entity::{Completable, Entity};
pub use goal::{Goal, GoalChanges, GoalDraft, GoalType};
pub use id::{EntityId, IdParseError, ServerId, TEMP_ID_PREFIX, TempId};
pub use patch::Patch;
pub use stats::{GoalStats, Stats, TaskStats};
pub use task::{Priority, Task, TaskChanges, TaskDraft};
pub use timestamp::Timestamp;
