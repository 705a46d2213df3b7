mod catalog;
mod id;
mod status;

pub use catalog::{resolve_task, split_arguments, TaskDescriptor};
pub use id::TaskId;
pub use status::TaskStatus;
