use std::fs;
use std::path::Path;

use crate::shared::constants::OUTPUT_FOURCC;
use crate::shared::frame::Frame;
use crate::shared::video_properties::VideoProperties;
use crate::video::domain::video_writer::{check_geometry, VideoWriter};

/// Target bit rate for the encoded stream (bits per second).
pub const DEFAULT_BIT_RATE: usize = 4_000_000;

/// Frame rate used when the source reports none.
const FALLBACK_FPS: i32 = 30;

/// Encodes frames as Windows Media Video 8 (`WMV2`) via ffmpeg-next.
///
/// The container is chosen from the output extension (`.wmv` → ASF). The
/// stream time base is the reciprocal of the source frame rate so output
/// timing matches the input.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    properties: Option<VideoProperties>,
    time_base: ffmpeg_next::Rational,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            properties: None,
            time_base: ffmpeg_next::Rational(1, FALLBACK_FPS),
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Ok(());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }

    /// Flushes the encoder and writes the container trailer.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        encoder.send_eof()?;
        self.drain_packets()?;
        if let Some(octx) = self.octx.as_mut() {
            octx.write_trailer()?;
        }
        Ok(())
    }

    /// Adds the stream, opens the encoder and writes the header.
    fn start(
        &mut self,
        mut octx: ffmpeg_next::format::context::Output,
        codec: ffmpeg_next::Codec,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let frame_rate = frame_rate_rational(properties.fps);
        let time_base = frame_rate.invert();

        encoder_ctx.set_width(properties.width);
        encoder_ctx.set_height(properties.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_bit_rate(DEFAULT_BIT_RATE);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        self.video_stream_index = ost.index();

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            properties.width,
            properties.height,
            ffmpeg_next::format::Pixel::YUV420P,
            properties.width,
            properties.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Encoding {} as {OUTPUT_FOURCC} {}x{} @ {}/{} fps",
            path.display(),
            properties.width,
            properties.height,
            frame_rate.numerator(),
            frame_rate.denominator()
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.properties = Some(properties.clone());
        self.time_base = time_base;
        self.frame_count = 0;

        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        // Opening the output truncates it, so check what we can beforehand.
        if properties.has_zero_dimension() {
            return Err(format!(
                "cannot encode {}x{} frames",
                properties.width, properties.height
            )
            .into());
        }
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::WMV2)
            .ok_or_else(|| format!("{OUTPUT_FOURCC} encoder not found"))?;

        let octx = ffmpeg_next::format::output(path)?;
        if let Err(e) = self.start(octx, codec, path, properties) {
            if let Err(remove_err) = fs::remove_file(path) {
                log::debug!("Could not remove {}: {remove_err}", path.display());
            }
            return Err(e);
        }
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let properties = self.properties.as_ref().ok_or("FfmpegWriter: not opened")?;
        check_geometry(properties, frame)?;

        let width = properties.width;
        let height = properties.height;
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
        );

        // Copy pixel data, respecting stride
        let stride = rgb_frame.stride(0);
        let row_bytes = width as usize * 3;
        let data = rgb_frame.data_mut(0);
        let src = frame.data();
        for row in 0..height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let result = self.finish();

        // Released even when flushing failed, so a retry is a no-op.
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        self.properties = None;

        result
    }
}

/// Rational frame rate for the encoder.
///
/// Integral rates map to `n/1`; fractional rates keep three decimals
/// (29.97 → 2997/100). Non-positive or non-finite rates fall back to 30.
fn frame_rate_rational(fps: f64) -> ffmpeg_next::Rational {
    if !fps.is_finite() || fps <= 0.0 {
        return ffmpeg_next::Rational(FALLBACK_FPS, 1);
    }
    let rounded = fps.round();
    if (fps - rounded).abs() < 1e-6 {
        return ffmpeg_next::Rational(rounded as i32, 1);
    }
    let num = (fps * 1000.0).round() as i32;
    let divisor = gcd(num, 1000);
    ffmpeg_next::Rational(num / divisor, 1000 / divisor)
}

fn gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}
