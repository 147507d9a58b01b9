use crate::error::AppError;
use crate::model::Task;
use crate::notify::Notifier;
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, task: &Task, message: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary("remindbot");
        notification.body(message);
        if task.priority == crate::model::Priority::High {
            notification.urgency(Urgency::Critical);
        }

        notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
