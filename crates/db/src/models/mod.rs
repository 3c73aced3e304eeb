pub mod event;
pub mod export;
pub mod file_task;
pub mod job;
pub mod step_result;
pub mod template;
pub mod worker;
