/// Axis-aligned face box in frame pixel coordinates, `[x1, x2) × [y1, y2)`.
///
/// Boxes coming out of a detector may extend past the frame or be empty;
/// [`BoundingBox::clamp`] produces the in-bounds box that redaction works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Maps a normalized `(xmin, ymin, width, height)` box onto a frame.
    ///
    /// Each term is scaled by the frame dimension and truncated, and the far
    /// edge is the truncated origin plus the truncated extent.
    pub fn from_normalized(
        xmin: f64,
        ymin: f64,
        width: f64,
        height: f64,
        frame_w: u32,
        frame_h: u32,
    ) -> Self {
        let x1 = (xmin * frame_w as f64) as i32;
        let y1 = (ymin * frame_h as f64) as i32;
        Self {
            x1,
            y1,
            x2: x1.saturating_add((width * frame_w as f64) as i32),
            y2: y1.saturating_add((height * frame_h as f64) as i32),
        }
    }

    /// Truncates floating-point pixel corners (`[x1, y1, x2, y2]`).
    pub fn from_pixel_corners(corners: [f64; 4]) -> Self {
        Self {
            x1: corners[0] as i32,
            y1: corners[1] as i32,
            x2: corners[2] as i32,
            y2: corners[3] as i32,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Restricts the box to `[0, frame_w) × [0, frame_h)`.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn clamp(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
        let fw = frame_w.min(i32::MAX as u32) as i32;
        let fh = frame_h.min(i32::MAX as u32) as i32;
        let clamped = BoundingBox {
            x1: self.x1.clamp(0, fw),
            y1: self.y1.clamp(0, fh),
            x2: self.x2.clamp(0, fw),
            y2: self.y2.clamp(0, fh),
        };
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }
}
