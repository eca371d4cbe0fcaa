pub mod avatar_pipeline_use_case;
pub mod failure_log;
pub mod pipeline_logger;
