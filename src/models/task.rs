use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating or updating a task.
/// The owner is never taken from the payload; unknown fields are ignored.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub user_id: Uuid,
}

/// Query parameters for listing tasks. Listing is always scoped to the caller.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Case-insensitive search in title and description.
    pub search: Option<String>,
}

impl Task {
    /// Creates a new `Task` owned by `owner_id`.
    pub fn new(input: TaskInput, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            user_id: owner_id,
        }
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: Some("Test Description".to_string()),
            due_date: Some(Utc::now()),
        }
    }

    #[test]
    fn test_task_creation() {
        let owner = Uuid::new_v4();
        let task = Task::new(input("Test Task"), owner);

        assert_eq!(task.title, "Test Task");
        assert_eq!(task.user_id, owner);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_task_validation() {
        assert!(input("Valid Task").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input(&"a".repeat(201)).validate().is_err());

        let long_description = TaskInput {
            title: "Valid title".to_string(),
            description: Some("b".repeat(1001)),
            due_date: None,
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_owner_field_in_payload_is_ignored() {
        let payload = serde_json::json!({
            "title": "Sneaky",
            "user_id": Uuid::new_v4(),
            "user": "someone-else"
        });
        let parsed: TaskInput = serde_json::from_value(payload).unwrap();
        let owner = Uuid::new_v4();

        assert_eq!(Task::new(parsed, owner).user_id, owner);
    }

    #[test]
    fn test_matches_search() {
        let task = Task::new(input("Buy Milk"), Uuid::new_v4());
        assert!(task.matches_search("milk"));
        assert!(task.matches_search("DESCRIPTION"));
        assert!(!task.matches_search("bread"));

        // Wildcard characters have no special meaning.
        assert!(!task.matches_search("b_y"));
        assert!(!task.matches_search("%"));
        let sale = Task::new(input("50% off"), Uuid::new_v4());
        assert!(sale.matches_search("50%"));
    }
}
