use crate::error::AppError;
use crate::model::Task;
use crate::notify::Notifier;
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, task: &Task, message: &str) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("remindbot")
            .text1(message)
            .text2(&task.list_name)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
