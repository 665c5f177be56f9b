pub mod pipeline_error;
pub mod pipeline_logger;
pub mod pipeline_state;
pub mod redact_video_use_case;
pub mod redaction_config;
