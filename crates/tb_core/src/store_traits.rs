use crate::app_error::AppResult;
use crate::models::{ObsidianTask, RemindersTask};
use crate::plan::{NewTaskFieldsV1, TaskChangesV1};
use crate::types::{ListId, RemId, VaultId};

/// The Markdown side of the bridge. Implementations own file layout,
/// block-id assignment, and atomic line rewriting; the engine only sees
/// snapshots and change sets.
pub trait ObsidianStore {
    fn list_tasks(&mut self, vault_id: &VaultId) -> AppResult<Vec<ObsidianTask>>;

    /// Edit in place at `(file, line)`, re-locating the block id first.
    fn update_task(&mut self, task: &ObsidianTask, changes: &TaskChangesV1) -> AppResult<()>;

    /// Append to `target_file` (created if absent, optionally under
    /// `heading`), assign a block id, and return a fresh snapshot.
    fn create_task(
        &mut self,
        vault_id: &VaultId,
        target_file: &str,
        heading: Option<&str>,
        fields: &NewTaskFieldsV1,
    ) -> AppResult<ObsidianTask>;

    fn delete_task(&mut self, task: &ObsidianTask) -> AppResult<()>;
}

/// The host calendar store boundary. `list_reminders` must accept the
/// expanded query set (default list plus every routed list); a persistent
/// authorization failure surfaces before any mutation is attempted.
pub trait RemindersGateway {
    fn list_reminders(&mut self, list_ids: &[ListId]) -> AppResult<Vec<RemindersTask>>;

    /// Returns the created item's calendar identifier.
    fn create_reminder(&mut self, list_id: &ListId, fields: &NewTaskFieldsV1) -> AppResult<RemId>;

    fn update_reminder(&mut self, id: &RemId, changes: &TaskChangesV1) -> AppResult<()>;

    fn delete_reminder(&mut self, id: &RemId) -> AppResult<()>;
}
