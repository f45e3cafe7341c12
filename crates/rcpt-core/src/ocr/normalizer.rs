//! Image normalization before recognition: grayscale, blur, binarize, deskew.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use tracing::debug;

use crate::models::config::NormalizerConfig;

/// Intensity of ink pixels in a binarized image.
pub const INK: u8 = 0;
/// Intensity of background pixels in a binarized image.
pub const PAPER: u8 = 255;

/// Cleaned raster produced by [`ImageNormalizer::normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Binarized, deskewed image.
    pub image: GrayImage,
    /// Rotation applied to the image, in degrees.
    pub skew_degrees: f32,
    /// Otsu threshold, or `None` when the image had no ink.
    pub threshold: Option<u8>,
}

impl NormalizedImage {
    /// True when binarization found no ink at all.
    pub fn is_blank(&self) -> bool {
        self.threshold.is_none()
    }
}

/// Image normalizer for the recognition pipeline.
pub struct ImageNormalizer {
    /// Gaussian blur sigma (0 disables blur).
    blur_sigma: f32,
    /// Whether to estimate and correct skew.
    deskew: bool,
    /// Skew estimates beyond this magnitude are ignored.
    max_skew_degrees: f32,
}

impl ImageNormalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }

    pub fn from_config(config: &NormalizerConfig) -> Self {
        Self {
            blur_sigma: config.blur_sigma,
            deskew: config.deskew,
            max_skew_degrees: config.max_skew_degrees,
        }
    }

    /// Set blur sigma.
    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// Enable or disable skew correction.
    pub fn with_deskew(mut self, deskew: bool) -> Self {
        self.deskew = deskew;
        self
    }

    /// Normalize an image. Never fails; degenerate inputs pass through with
    /// a zero skew.
    pub fn normalize(&self, image: &DynamicImage) -> NormalizedImage {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        if width == 0 || height == 0 {
            debug!("Empty image, skipping normalization");
            return NormalizedImage {
                image: gray,
                skew_degrees: 0.0,
                threshold: None,
            };
        }

        let blurred = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.blur_sigma)
        } else {
            gray
        };

        let (binary, threshold) = binarize(&blurred);
        debug!("Binarized {}x{} image, threshold {:?}", width, height, threshold);

        if !self.deskew || threshold.is_none() {
            return NormalizedImage {
                image: binary,
                skew_degrees: 0.0,
                threshold,
            };
        }

        let skew = estimate_skew(&binary);
        if skew.abs() > self.max_skew_degrees {
            debug!("Skew estimate {:.2} exceeds limit, not applied", skew);
            return NormalizedImage {
                image: binary,
                skew_degrees: 0.0,
                threshold,
            };
        }

        debug!("Correcting skew by {:.2} degrees", skew);

        let image = if skew.abs() < f32::EPSILON {
            binary
        } else {
            rotate_about_center(&binary, skew)
        };

        NormalizedImage {
            image,
            skew_degrees: skew,
            threshold,
        }
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Binarize with Otsu's global threshold: pixels at or below the level become
/// [`INK`], the rest [`PAPER`].
///
/// A uniform image has no foreground; it maps to all paper and `None`.
pub fn binarize(gray: &GrayImage) -> (GrayImage, Option<u8>) {
    let (width, height) = gray.dimensions();
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if min >= max {
        return (GrayImage::from_pixel(width, height, Luma([PAPER])), None);
    }

    let level = otsu_level(gray);
    let binary = GrayImage::from_fn(width, height, |x, y| {
        if gray.get_pixel(x, y)[0] <= level {
            Luma([INK])
        } else {
            Luma([PAPER])
        }
    });

    (binary, Some(level))
}

/// Estimate the rotation (degrees) that makes the ink in a binarized image
/// horizontal. Returns 0 when there is not enough ink to fit a rectangle.
pub fn estimate_skew(binary: &GrayImage) -> f32 {
    let points: Vec<Point<i32>> = binary
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] == INK)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if points.len() < 3 {
        return 0.0;
    }

    let corners = min_area_rect(&points);
    correction_angle(rect_angle(&corners))
}

/// Map a rectangle angle in `[-90, 0)` to the smallest rotation that levels it.
pub fn correction_angle(rect_angle: f32) -> f32 {
    if rect_angle < -45.0 {
        -(90.0 + rect_angle)
    } else {
        -rect_angle
    }
}

/// Angle of a rectangle's sides, folded into `[-90, 0)`.
fn rect_angle(corners: &[Point<i32>; 4]) -> f32 {
    let side = corners
        .iter()
        .zip(corners.iter().cycle().skip(1))
        .map(|(a, b)| (b.x - a.x, b.y - a.y))
        .find(|&(dx, dy)| dx != 0 || dy != 0);

    let Some((dx, dy)) = side else {
        return -90.0;
    };

    let mut angle = (dy as f32).atan2(dx as f32).to_degrees() % 90.0;
    if angle >= 0.0 {
        angle -= 90.0;
    }
    angle
}

/// Rotate about the image center by `degrees` (positive turns content from +x
/// toward +y), with bicubic sampling and replicated borders.
pub fn rotate_about_center(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;
    let (sin, cos) = (-degrees).to_radians().sin_cos();

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cx + dx * cos - dy * sin;
        let sy = cy + dx * sin + dy * cos;
        Luma([sample_bicubic(image, sx, sy)])
    })
}

fn sample_bicubic(image: &GrayImage, x: f32, y: f32) -> u8 {
    let (width, height) = image.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let wx = cubic_weights(x - x0);
    let wy = cubic_weights(y - y0);

    let mut acc = 0.0f32;
    for (j, weight_y) in wy.iter().enumerate() {
        let py = clamp_coord(y0 as i64 - 1 + j as i64, height);
        for (i, weight_x) in wx.iter().enumerate() {
            let px = clamp_coord(x0 as i64 - 1 + i as i64, width);
            acc += weight_x * weight_y * image.get_pixel(px, py)[0] as f32;
        }
    }

    acc.round().clamp(0.0, 255.0) as u8
}

// Keys cubic kernel with a = -0.75.
fn cubic_weights(t: f32) -> [f32; 4] {
    const A: f32 = -0.75;
    let w0 = ((A * (t + 1.0) - 5.0 * A) * (t + 1.0) + 8.0 * A) * (t + 1.0) - 4.0 * A;
    let w1 = ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0;
    let u = 1.0 - t;
    let w2 = ((A + 2.0) * u - (A + 3.0)) * u * u + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

fn clamp_coord(v: i64, len: u32) -> u32 {
    v.clamp(0, len as i64 - 1) as u32
}
