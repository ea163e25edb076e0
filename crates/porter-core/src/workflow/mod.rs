//! Workflow state machine
//!
//! ```text
//! setup → analysis → planning → feature_branch_created → target_prepared
//!       → commits_implemented → validated → reviewed → merged
//!       → feature_branch_deleted → completed
//! ```
//!
//! Any fatal error moves to `failed` after a best-effort rollback. A dry
//! run stops at `reviewed`.

mod manager;
mod state;

pub use manager::{issue, merge_message, migration_commit_message, WorkflowManager};
pub use state::{ImplementedCommit, Issue, Phase, Transition, WorkflowState};
