use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors of a redaction run. Per-frame detection failures never
/// show up here; they are absorbed by the face localizer.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open input video {path}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("cannot open output video {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("failed to decode frame {frame}: {source}")]
    Read {
        frame: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("failed to encode frame {frame}: {source}")]
    Write {
        frame: usize,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("pipeline already executed; create a new one per input")]
    AlreadyExecuted,
}
