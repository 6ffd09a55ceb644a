//! Persistence for users and tasks.
//!
//! Handlers and middleware only see the [`Store`] trait. [`PgStore`] backs it with
//! Postgres; [`MemoryStore`] keeps everything in process and is used when no
//! database is configured, and by the tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskQuery, User, UserChanges};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with `BadRequest` when the username is taken.
    async fn create_user(&self, user: User) -> Result<User, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Returns `None` when no user has this id.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    /// Returns whether a user was deleted. Tasks owned by the user are left in place.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    async fn create_task(&self, task: Task) -> Result<Task, AppError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Tasks owned by `owner`, newest first.
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    /// Updates the task only if it belongs to `owner`.
    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        input: TaskInput,
    ) -> Result<Option<Task>, AppError>;

    /// Deletes the task only if it belongs to `owner`.
    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, AppError>;
}
