//! Byte-stream upload and download around the file-based pipeline.
//!
//! The pipeline only works on paths. When the CLI is fed through stdin or
//! asked to emit to stdout, the bytes are staged in a temporary directory
//! that is removed when the staging value is dropped.
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use faceblur_core::shared::constants::{OUTPUT_FILE_NAME, OUTPUT_MIME_TYPE};

const UPLOAD_FILE_NAME: &str = "upload.mp4";

pub struct Staging {
    dir: tempfile::TempDir,
}

impl Staging {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("faceblur-").tempdir()?,
        })
    }

    /// Copies an uploaded video into the staging directory.
    pub fn receive_upload(&self, mut upload: impl Read) -> io::Result<PathBuf> {
        let path = self.dir.path().join(UPLOAD_FILE_NAME);
        let mut file = fs::File::create(&path)?;
        let bytes = io::copy(&mut upload, &mut file)?;
        file.flush()?;
        log::debug!("Staged {bytes} uploaded bytes at {}", path.display());
        Ok(path)
    }

    /// Where the pipeline should write output that will be streamed back.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILE_NAME)
    }
}

/// Streams a finished output file to `sink` and returns the byte count.
pub fn deliver(path: &Path, mut sink: impl Write) -> io::Result<u64> {
    let mut file = fs::File::open(path)?;
    let bytes = io::copy(&mut file, &mut sink)?;
    sink.flush()?;
    log::info!("Delivered {OUTPUT_FILE_NAME} ({OUTPUT_MIME_TYPE}, {bytes} bytes)");
    Ok(bytes)
}
