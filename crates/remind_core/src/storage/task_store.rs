use crate::error::AppError;
use crate::model::Task;
use crate::storage::json_store::{self, TaskState};
use std::path::{Path, PathBuf};

/// In-memory task list mirrored to a JSON file.
///
/// Every mutation goes through [`TaskStore::mutate`], which works on a copy and
/// only commits it once the file has been rewritten.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    state: TaskState,
}

impl TaskStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let state = json_store::load_state(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.state.tasks.iter().filter(|task| task.is_pending())
    }

    pub fn done(&self) -> impl Iterator<Item = &Task> {
        self.state.tasks.iter().filter(|task| !task.is_pending())
    }

    pub fn mutate<T, F>(&mut self, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut TaskState) -> Result<T, AppError>,
    {
        let mut draft = self.state.clone();
        let outcome = change(&mut draft)?;
        json_store::save_state(&self.path, &draft)?;
        self.state = draft;
        Ok(outcome)
    }
}

impl TaskState {
    /// Hands out the next id; ids are never reused.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }
}
