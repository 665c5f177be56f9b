use crate::blurring::domain::blur_settings::BlurSettings;
use crate::shared::bounding_box::BoundingBox;

/// Kernels at or above this size blur a downscaled copy of the ROI.
const DOWNSCALE_KERNEL_STEP: usize = 50;

/// ROI rectangle within a frame, in unsigned pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl RoiRect {
    /// Converts an already clamped box. Callers must clamp first.
    pub fn from_clamped(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.x1 as usize,
            y: bbox.y1 as usize,
            w: bbox.width() as usize,
            h: bbox.height() as usize,
        }
    }
}

/// 1-D kernels computed once per redactor and reused for every region.
///
/// `small` is the kernel applied to the ROI after downscaling by `scale`.
#[derive(Clone, Debug)]
pub struct PreparedKernel {
    pub full: Vec<f32>,
    pub small: Vec<f32>,
    pub scale: usize,
}

impl PreparedKernel {
    pub fn new(settings: &BlurSettings) -> Self {
        let scale = (settings.kernel_size / DOWNSCALE_KERNEL_STEP).max(1);
        let small_size = (settings.kernel_size / scale) | 1; // ensure odd
        Self {
            full: gaussian_kernel_1d(settings.kernel_size, settings.sigma),
            small: gaussian_kernel_1d(small_size, settings.sigma / scale as f64),
            scale,
        }
    }
}

/// Normalized 1-D Gaussian kernel of odd length `kernel_size`.
///
/// A non-positive `sigma` is derived from the size the way OpenCV does:
/// `0.3 * ((k - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f64) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = (kernel_size / 2) as f64;
    let weights: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|&v| (v / sum) as f32).collect()
}

/// Separable Gaussian blur of a packed `width × height × channels` buffer.
///
/// Samples past the buffer edge replicate the nearest edge pixel, so the
/// blur never reads outside the buffer it was given. `temp` is reused
/// across calls.
pub fn separable_gaussian_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    let kernel_size = kernel.len();
    if kernel_size <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = kernel_size as isize / 2;

    temp.resize(width * height * channels, 0.0);

    // Horizontal pass: data → temp
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half).clamp(0, width as isize - 1) as usize;
                    sum += data[(y * width + sx) * channels + c] as f32 * w;
                }
                temp[(y * width + x) * channels + c] = sum;
            }
        }
    }

    // Vertical pass: temp → data
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy =
                        (y as isize + k as isize - half).clamp(0, height as isize - 1) as usize;
                    sum += temp[(sy * width + x) * channels + c] * w;
                }
                data[(y * width + x) * channels + c] = sum.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Copy a rectangular ROI out of frame data into a reusable buffer.
pub fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    roi: &mut Vec<u8>,
) {
    let row_bytes = rect.w * channels;
    roi.resize(row_bytes * rect.h, 0);
    for row in 0..rect.h {
        let src_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        roi[row * row_bytes..(row + 1) * row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }
}

/// Write an ROI buffer back into frame data at the same coordinates.
pub fn write_roi_back(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
) {
    let row_bytes = rect.w * channels;
    for row in 0..rect.h {
        let dst_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        data[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&roi[row * row_bytes..(row + 1) * row_bytes]);
    }
}

/// Blur an ROI buffer in place, downscaling first for large kernels.
pub fn blur_roi_in_place(
    roi: &mut [u8],
    rw: usize,
    rh: usize,
    channels: usize,
    kernel: &PreparedKernel,
    temp: &mut Vec<f32>,
) {
    let scale = kernel.scale;
    if scale <= 1 || rh < scale * 2 || rw < scale * 2 {
        separable_gaussian_blur(roi, rw, rh, channels, &kernel.full, temp);
    } else {
        let (mut small, sw, sh) = downscale(roi, rw, rh, channels, scale);
        separable_gaussian_blur(&mut small, sw, sh, channels, &kernel.small, temp);
        let upscaled = upscale(&small, sw, sh, channels, rw, rh);
        roi[..rw * rh * channels].copy_from_slice(&upscaled);
    }
}

/// Downscale an image by integer factor using area averaging.
pub fn downscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    scale: usize,
) -> (Vec<u8>, usize, usize) {
    let new_w = width / scale;
    let new_h = height / scale;
    let mut out = vec![0u8; new_w * new_h * channels];

    for y in 0..new_h {
        for x in 0..new_w {
            for c in 0..channels {
                let mut sum = 0u32;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let sy = y * scale + dy;
                        let sx = x * scale + dx;
                        sum += data[(sy * width + sx) * channels + c] as u32;
                    }
                }
                out[(y * new_w + x) * channels + c] = (sum / (scale * scale) as u32) as u8;
            }
        }
    }

    (out, new_w, new_h)
}

/// Upscale an image to `target_w × target_h` using bilinear interpolation.
pub fn upscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];

    for y in 0..target_h {
        for x in 0..target_w {
            let src_x = x as f32 * (width as f32 - 1.0) / (target_w as f32 - 1.0).max(1.0);
            let src_y = y as f32 * (height as f32 - 1.0) / (target_h as f32 - 1.0).max(1.0);

            let x0 = (src_x.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let y0 = (src_y.floor() as usize).min(height - 1);
            let y1 = (y0 + 1).min(height - 1);

            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;

            for c in 0..channels {
                let v00 = data[(y0 * width + x0) * channels + c] as f32;
                let v10 = data[(y0 * width + x1) * channels + c] as f32;
                let v01 = data[(y1 * width + x0) * channels + c] as f32;
                let v11 = data[(y1 * width + x1) * channels + c] as f32;

                let val = v00 * (1.0 - fx) * (1.0 - fy)
                    + v10 * fx * (1.0 - fy)
                    + v01 * (1.0 - fx) * fy
                    + v11 * fx * fy;
                out[(y * target_w + x) * channels + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn blur(data: &mut [u8], w: usize, h: usize, kernel_size: usize, sigma: f64) {
        let kernel = gaussian_kernel_1d(kernel_size, sigma);
        separable_gaussian_blur(data, w, h, 3, &kernel, &mut Vec::new());
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel_1d(51, 30.0);
        let sum: f32 = k.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_kernel_is_symmetric_with_peak_at_center() {
        let k = gaussian_kernel_1d(7, 1.5);
        for i in 0..k.len() / 2 {
            assert_relative_eq!(k[i], k[k.len() - 1 - i], epsilon = 1e-6);
            assert!(k[3] > k[i]);
        }
    }

    #[test]
    fn test_large_sigma_flattens_kernel() {
        let narrow = gaussian_kernel_1d(51, 3.0);
        let wide = gaussian_kernel_1d(51, 30.0);
        assert!(wide[0] > narrow[0]);
        assert!(wide[25] < narrow[25]);
    }

    #[test]
    fn test_non_positive_sigma_uses_size_rule() {
        // k=7: 0.3 * (3 - 1) + 0.8 = 1.4
        assert_eq!(gaussian_kernel_1d(7, 0.0), gaussian_kernel_1d(7, 1.4));
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let mut data = vec![128u8; 10 * 10 * 3];
        blur(&mut data, 10, 10, 5, 0.0);
        assert!(data.iter().all(|&v| (v as i32 - 128).abs() <= 1));
    }

    #[test]
    fn test_blur_spreads_bright_pixel() {
        let mut data = vec![0u8; 10 * 10 * 3];
        let cx = (5 * 10 + 5) * 3;
        data[cx..cx + 3].fill(255);

        blur(&mut data, 10, 10, 5, 0.0);

        assert!(data[cx] < 255);
        assert!(data[(5 * 10 + 6) * 3] > 0);
    }

    #[test]
    fn test_kernel_size_1_is_identity() {
        let mut data: Vec<u8> = (0..75).map(|i| (i * 3) as u8).collect();
        let original = data.clone();
        blur(&mut data, 5, 5, 1, 1.0);
        assert_eq!(data, original);
    }

    #[test]
    fn test_extract_and_write_back_roundtrip() {
        let frame: Vec<u8> = (0..(6 * 4 * 3)).map(|i| i as u8).collect();
        let rect = RoiRect { x: 1, y: 1, w: 3, h: 2 };
        let mut roi = Vec::new();
        extract_roi(&frame, 6, 3, rect, &mut roi);
        assert_eq!(roi.len(), 3 * 2 * 3);
        assert_eq!(&roi[..3], &frame[(6 + 1) * 3..(6 + 1) * 3 + 3]);

        let mut target = vec![0u8; frame.len()];
        write_roi_back(&mut target, &roi, 6, 3, rect);
        // Only the ROI is written
        assert_eq!(target[0], 0);
        assert_eq!(&target[(6 + 1) * 3..(6 + 4) * 3], &frame[(6 + 1) * 3..(6 + 4) * 3]);
    }

    #[test]
    fn test_roi_rect_from_clamped_box() {
        let rect = RoiRect::from_clamped(&BoundingBox::new(10, 20, 30, 25));
        assert_eq!(rect, RoiRect { x: 10, y: 20, w: 20, h: 5 });
    }

    #[test]
    fn test_prepared_kernel_downscales_only_large_kernels() {
        let small = PreparedKernel::new(&BlurSettings::new(51, 30.0).unwrap());
        assert_eq!(small.scale, 1);

        let large = PreparedKernel::new(&BlurSettings::new(201, 60.0).unwrap());
        assert_eq!(large.scale, 4);
        assert!(large.small.len() < large.full.len());
        assert_eq!(large.small.len() % 2, 1);
    }

    #[test]
    fn test_downscale_upscale_uniform_roundtrip() {
        let data = vec![100u8; 8 * 8 * 3];
        let (small, sw, sh) = downscale(&data, 8, 8, 3, 2);
        assert_eq!((sw, sh), (4, 4));
        let big = upscale(&small, sw, sh, 3, 8, 8);
        assert!(big.iter().all(|&v| (v as i32 - 100).abs() <= 1));
    }
}
