pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod resolve;
pub mod scheduler;
pub mod storage;
pub mod task_api;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Priority, Task, TaskStatus};
    use time::macros::datetime;

    #[test]
    fn task_has_required_fields() {
        let task = Task {
            id: 1,
            list_name: "General".to_string(),
            description: "demo".to_string(),
            scheduled_at: None,
            repeat: None,
            priority: Priority::Normal,
            status: TaskStatus::Pending,
            created_at: datetime!(2025-12-20 00:00 UTC),
            completed_at: None,
            reminded_at: None,
        };

        assert_eq!(task.id, 1);
        assert_eq!(task.description, "demo");
        assert!(task.is_pending());
        assert!(!task.is_recurring());
        assert_eq!(task.scheduled_at, None);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing description");
        assert_eq!(err.code(), "invalid_input");
        assert!(err.is_user_facing());
    }
}
