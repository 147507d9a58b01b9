pub mod json_store;
mod task_store;

pub use json_store::TaskState;
pub use task_store::TaskStore;
