pub mod manager;
pub mod task;

pub use manager::{CompletionCallback, QueueManager, QueueSnapshot};
pub use task::{Job, ProgressSink, Task, TaskExecutor, TaskId, TaskStatus, UnitContext};
