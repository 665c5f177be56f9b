/// Static properties read once from the source and used verbatim for the sink.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count advertised by the container; 0 when unknown.
    pub total_frames: usize,
}

impl VideoProperties {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames: 0,
        }
    }

    pub fn with_total_frames(mut self, total_frames: usize) -> Self {
        self.total_frames = total_frames;
        self
    }

    pub fn has_zero_dimension(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
