mod task;

pub use task::{
    DEFAULT_LIST, Priority, Repeat, Task, TaskStatus, parse_weekday, weekday_name,
};
