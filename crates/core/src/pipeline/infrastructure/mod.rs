pub mod threaded_task_executor;
