//! Image preparation: everything that happens once per input image before
//! the threshold sweep.
//!
//! Steps run in a fixed order: crop, alpha flattening, grayscale, size
//! limiting, inversion, border padding, despeckle/denoise, contrast
//! expansion and illumination equalization.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::stretch_contrast;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use log::{debug, info};

use crate::config::TraceConfig;
use crate::denoise::{Denoiser, Rof};
use crate::error::TraceError;

/// Border width added around the image so no stroke touches the edge.
pub const BORDER: u32 = 1;

/// Target size of the illumination map, in pixels.
const ILLUMINATION_PIXELS: f64 = 0.01e6;

/// Blur applied to the illumination map.
const ILLUMINATION_SIGMA: f32 = 5.0;

/// Normalized clip rectangle, fractions of the image width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Pixel bounds `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

impl ClipRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Scale to pixels, round each edge half-up, then clamp each edge
    /// into the image independently.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Result<PixelBounds, TraceError> {
        let edge = |fraction: f64, size: u32| -> u32 {
            let px = (fraction * size as f64 + 0.5).floor();
            px.clamp(0.0, size as f64) as u32
        };
        let x0 = edge(self.x, width);
        let y0 = edge(self.y, height);
        let x1 = edge(self.x + self.w, width);
        let y1 = edge(self.y + self.h, height);
        if x1 <= x0 || y1 <= y0 {
            return Err(TraceError::NoOverlap);
        }
        Ok(PixelBounds { x0, y0, x1, y1 })
    }
}

/// Output of [`prepare`].
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Grayscale image handed to the sweep, border included.
    pub image: GrayImage,
    /// Size of the uncropped input in the traced image's pixel units.
    pub reference_size: (f64, f64),
    /// Border pixels added on each side.
    pub padding: u32,
}

/// Run the preparation pipeline on one image.
///
/// The input is not modified; the same input and configuration always give
/// the same output.
pub fn prepare(
    image: &DynamicImage,
    config: &TraceConfig,
    clip: Option<&ClipRect>,
) -> Result<Prepared, TraceError> {
    let (orig_w, orig_h) = (image.width(), image.height());
    if orig_w == 0 || orig_h == 0 {
        return Err(TraceError::ImageLoad("image has no pixels".to_string()));
    }

    // Crop
    let cropped;
    let source = match clip {
        Some(rect) => {
            let b = rect.pixel_bounds(orig_w, orig_h)?;
            info!("prepare: crop to {}x{} at ({}, {})", b.width(), b.height(), b.x0, b.y0);
            cropped = image.crop_imm(b.x0, b.y0, b.width(), b.height());
            &cropped
        }
        None => image,
    };

    // Alpha + grayscale
    let mut gray = if source.color().has_alpha() {
        let background = if config.invert { 0 } else { 255 };
        debug!("prepare: flatten alpha over {}", background);
        flatten_alpha(source, background).to_luma8()
    } else {
        source.to_luma8()
    };

    // Size limit
    let (crop_w, crop_h) = gray.dimensions();
    if let Some((w, h)) = limited_size(crop_w, crop_h, config.megapixels) {
        info!("prepare: downscale {}x{} to {}x{}", crop_w, crop_h, w, h);
        gray = imageops::resize(&gray, w, h, FilterType::Triangle);
    }
    let (w, h) = gray.dimensions();
    let reference_size = (
        orig_w as f64 * w as f64 / crop_w as f64,
        orig_h as f64 * h as f64 / crop_h as f64,
    );

    if config.invert {
        imageops::invert(&mut gray);
    }

    gray = pad(&gray, BORDER, 255);

    if let Some(window) = config.median_window() {
        debug!("prepare: median {}x{}", window, window);
        let radius = window / 2;
        gray = median_filter(&gray, radius, radius);
    }
    if config.denoise_weight > 0.0 {
        debug!("prepare: ROF denoise, weight {}", config.denoise_weight);
        gray = Rof::new(config.denoise_weight as f32).denoise(&gray);
    }

    gray = autocontrast(&gray);

    if config.equal_light > 0.0 {
        debug!("prepare: equalize light, strength {}", config.equal_light);
        gray = equalize_light(&gray, config.equal_light);
    }

    info!(
        "prepare: {}x{} ready (reference {:.1}x{:.1})",
        gray.width(),
        gray.height(),
        reference_size.0,
        reference_size.1
    );
    Ok(Prepared {
        image: gray,
        reference_size,
        padding: BORDER,
    })
}

/// Composite over a solid gray level and drop the alpha channel.
fn flatten_alpha(image: &DynamicImage, background: u8) -> DynamicImage {
    let rgba = image.to_rgba8();
    let bg = background as f32;
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as f32 / 255.0;
        let mix = |c: u8| (c as f32 * alpha + bg * (1.0 - alpha)).round() as u8;
        Rgb([mix(r), mix(g), mix(b)])
    });
    DynamicImage::ImageRgb8(rgb)
}

/// New dimensions when `width * height` exceeds the megapixel limit.
pub fn limited_size(width: u32, height: u32, megapixels: f64) -> Option<(u32, u32)> {
    let pixels = width as f64 * height as f64;
    if pixels / 1e6 <= megapixels {
        return None;
    }
    let factor = (pixels / (megapixels * 1e6)).sqrt();
    let w = ((width as f64 / factor).floor() as u32).max(1);
    let h = ((height as f64 / factor).floor() as u32).max(1);
    Some((w, h))
}

fn pad(gray: &GrayImage, border: u32, value: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut canvas = GrayImage::from_pixel(w + 2 * border, h + 2 * border, Luma([value]));
    imageops::replace(&mut canvas, gray, border as i64, border as i64);
    canvas
}

/// Stretch the histogram to the full 0-255 range without clipping.
/// A flat image is returned unchanged.
pub fn autocontrast(gray: &GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if hi <= lo {
        return gray.clone();
    }
    stretch_contrast(gray, lo, hi, 0, 255)
}

/// Blend in an inverted, blurred low-resolution copy to flatten uneven
/// lighting, then re-expand contrast.
fn equalize_light(gray: &GrayImage, strength: f64) -> GrayImage {
    let (w, h) = gray.dimensions();
    let factor = (ILLUMINATION_PIXELS / (w as f64 * h as f64)).sqrt();
    let small_w = ((w as f64 * factor) as u32).max(1);
    let small_h = ((h as f64 * factor) as u32).max(1);

    let mut small = imageops::resize(gray, small_w, small_h, FilterType::Triangle);
    imageops::invert(&mut small);
    let small = gaussian_blur_f32(&small, ILLUMINATION_SIGMA);
    let light = imageops::resize(&small, w, h, FilterType::Triangle);

    let alpha = strength * 0.5;
    let mut blended = gray.clone();
    for (out, lit) in blended.pixels_mut().zip(light.pixels()) {
        let v = out.0[0] as f64 * (1.0 - alpha) + lit.0[0] as f64 * alpha;
        out.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    autocontrast(&blended)
}
