use std::path::Path;
use std::time::Instant;

use crate::blurring::domain::region_redactor::RegionRedactor;
use crate::detection::domain::face_localizer::FaceLocalizer;
use crate::shared::video_properties::VideoProperties;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_error::PipelineError;
use super::pipeline_logger::{PipelineLogger, Stage};
use super::pipeline_state::PipelineState;

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub properties: VideoProperties,
    pub frames_written: usize,
    pub faces_redacted: usize,
    /// Frames whose detection failed and were written unredacted.
    pub detection_failures: usize,
}

/// Redacts faces in one video file.
///
/// Reads each frame, localizes faces, blurs every returned box in order and
/// writes the frame out before reading the next one. Single use: a second
/// `execute` is rejected with [`PipelineError::AlreadyExecuted`].
pub struct RedactVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    localizer: FaceLocalizer,
    redactor: Box<dyn RegionRedactor>,
    logger: Box<dyn PipelineLogger>,
    state: PipelineState,
}

impl RedactVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        localizer: FaceLocalizer,
        redactor: Box<dyn RegionRedactor>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            localizer,
            redactor,
            logger,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<RunReport, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyExecuted);
        }
        self.state = PipelineState::Running;

        let result = self.run(input_path, output_path);
        self.state = match result {
            Ok(_) => PipelineState::Completed,
            Err(_) => PipelineState::Failed,
        };
        log::debug!("Redaction run {}", self.state);
        self.logger.summary();
        result
    }

    fn run(&mut self, input_path: &Path, output_path: &Path) -> Result<RunReport, PipelineError> {
        let properties = match self.reader.open(input_path) {
            Ok(p) => p,
            Err(source) => {
                self.reader.close();
                return Err(PipelineError::SourceOpen {
                    path: input_path.to_path_buf(),
                    source,
                });
            }
        };
        self.logger.info(&format!(
            "Input {}: {}x{} @ {:.3} fps",
            input_path.display(),
            properties.width,
            properties.height,
            properties.fps
        ));

        let output_existed = output_path.exists();
        if let Err(source) = self.writer.open(output_path, &properties) {
            self.reader.close();
            if !output_existed {
                remove_partial_output(output_path);
            }
            return Err(PipelineError::SinkOpen {
                path: output_path.to_path_buf(),
                source,
            });
        }

        let result = self.pump(&properties).and_then(|report| match self.writer.close() {
            Ok(()) => Ok(report),
            Err(source) => Err(PipelineError::Write {
                frame: report.frames_written,
                source,
            }),
        });
        self.reader.close();

        if result.is_err() {
            // Sink may already be closed; a second close is a no-op.
            if let Err(e) = self.writer.close() {
                log::debug!("Ignoring sink close error after failure: {e}");
            }
            remove_partial_output(output_path);
        }
        result
    }

    /// Frame loop. Returns once the source is exhausted or a fatal error
    /// occurs; closing resources is left to the caller.
    fn pump(&mut self, properties: &VideoProperties) -> Result<RunReport, PipelineError> {
        let Self {
            reader,
            writer,
            localizer,
            redactor,
            logger,
            ..
        } = self;

        let total = properties.total_frames;
        let mut frames_written = 0;
        let mut faces_redacted = 0;
        let mut frames = reader.frames();

        loop {
            let t0 = Instant::now();
            let Some(next) = frames.next() else {
                break;
            };
            let mut frame = next.map_err(|source| PipelineError::Read {
                frame: frames_written,
                source,
            })?;
            logger.timing(Stage::Decode, elapsed_ms(t0));

            let t1 = Instant::now();
            let detections = localizer.localize(&frame);
            logger.timing(Stage::Detect, elapsed_ms(t1));
            logger.metric("faces", detections.len() as f64);

            let t2 = Instant::now();
            for bbox in &detections {
                redactor.redact(&mut frame, bbox);
            }
            faces_redacted += detections.len();
            logger.timing(Stage::Redact, elapsed_ms(t2));

            let t3 = Instant::now();
            writer.write(&frame).map_err(|source| PipelineError::Write {
                frame: frame.index(),
                source,
            })?;
            logger.timing(Stage::Encode, elapsed_ms(t3));

            frames_written += 1;
            logger.progress(frames_written, total);
        }

        if localizer.failures() > 0 {
            logger.info(&format!(
                "Detection failed on {} frame(s); they were written unredacted",
                localizer.failures()
            ));
        }

        Ok(RunReport {
            properties: properties.clone(),
            frames_written,
            faces_redacted,
            detection_failures: localizer.failures(),
        })
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::info!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial output {}: {e}", path.display()),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
