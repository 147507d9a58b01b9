use crate::error::AppError;
use crate::model::{Priority, Task};
use time::macros::format_description;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const DISABLE_DESKTOP_ENV_VAR: &str = "REMIND_DISABLE_NOTIFICATIONS";

/// A sink for reminder deliveries.
pub trait Notifier: Send + Sync {
    fn notify(&self, task: &Task, message: &str) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _task: &Task, _message: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Text of the reminder sent when a task's delivery fires.
pub fn reminder_message(task: &Task) -> String {
    let mut message = format!("⏰ Reminder: {}", task.description);
    if let Some(at) = task.scheduled_at
        && let Ok(clock) = at.format(format_description!("[hour]:[minute]"))
    {
        message.push_str(&format!(" — {clock}"));
    }
    if let Some(repeat) = task.repeat.as_ref()
        && repeat.is_recurring()
    {
        message.push_str(&format!(" (repeats: {repeat})"));
    }
    if task.priority == Priority::High {
        message.push_str(" ❗");
    }
    if task.list_name != crate::model::DEFAULT_LIST {
        message.push_str(&format!(" [{}]", task.list_name));
    }
    message
}

/// Desktop notifications, unless disabled through the environment or
/// unsupported on this platform.
pub fn desktop_notifier() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_DESKTOP_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => {
                log::warn!("desktop notifications unavailable: {}", err.message());
                Ok(Box::new(NoopNotifier))
            }
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
