//! Module sequencing and course progress.
//!
//! Modules are taken strictly in `order_index` order: a module opens once every module
//! before it is completed.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status stored in `module_progress.status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    Completed,
    /// Anything else the table holds counts as started.
    #[serde(other)]
    InProgress,
}

impl ModuleStatus {
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Percentage of completed modules, rounded half up. No modules means no progress.
#[must_use]
pub fn compute_course_progress(statuses: &[ModuleStatus]) -> u8 {
    let total = statuses.len();
    if total == 0 {
        return 0;
    }
    let completed = statuses.iter().filter(|s| s.is_completed()).count();
    let pct = (completed * 200 + total) / (total * 2);
    u8::try_from(pct).unwrap_or(100)
}

/// Whether the module at `index` may be opened.
#[must_use]
pub fn unlocked(statuses: &[ModuleStatus], index: usize) -> bool {
    index < statuses.len() && statuses[..index].iter().all(|s| s.is_completed())
}

/// Index of the first module not yet completed.
#[must_use]
pub fn next_module(statuses: &[ModuleStatus]) -> Option<usize> {
    statuses.iter().position(|s| !s.is_completed())
}
