//! Deterministic tracers for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TraceError;
use crate::tracer::Tracer;

/// Returns the same markup for every bitmap.
pub struct FixedTracer {
    markup: String,
    calls: AtomicUsize,
}

impl FixedTracer {
    pub fn new(markup: &str) -> Self {
        Self { markup: markup.to_string(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Tracer for FixedTracer {
    fn trace(&self, _pbm: &[u8]) -> Result<String, TraceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markup.clone())
    }
}

/// Behaves like a tracer that prints nothing.
pub struct NoOutputTracer;

impl Tracer for NoOutputTracer {
    fn trace(&self, _pbm: &[u8]) -> Result<String, TraceError> {
        Err(TraceError::MalformedOutput("tracer produced no output".to_string()))
    }
}

/// Fails its probe.
#[derive(Default)]
pub struct UnavailableTracer {
    calls: AtomicUsize,
}

impl UnavailableTracer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Tracer for UnavailableTracer {
    fn probe(&self) -> Result<(), TraceError> {
        Err(TraceError::TracerUnavailable("not installed".to_string()))
    }

    fn trace(&self, _pbm: &[u8]) -> Result<String, TraceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

/// Traces the bounding box of the black pixels as one closed rectangle.
/// Blank or solid bitmaps produce no output.
pub struct BoundingBoxTracer;

impl Tracer for BoundingBoxTracer {
    fn trace(&self, pbm: &[u8]) -> Result<String, TraceError> {
        let bitmap = image::load_from_memory(pbm)
            .map_err(|e| TraceError::MalformedOutput(format!("bad P4 input: {}", e)))?
            .to_luma8();
        let (width, height) = bitmap.dimensions();
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        let mut black = 0;
        for (x, y, pixel) in bitmap.enumerate_pixels() {
            // Decoded ink is 0.
            if pixel.0[0] == 0 {
                black += 1;
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        match bounds {
            Some((x0, y0, x1, y1)) if black < width * height => Ok(format!(
                r#"<svg width="{w}" height="{h}"><path style="stroke:#000000; fill:none;" d="M{x0} {y0}L{x1} {y0}L{x1} {y1}L{x0} {y1}Z"/></svg>"#,
                w = width,
                h = height,
            )),
            _ => Err(TraceError::MalformedOutput("tracer produced no output".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::encode_pbm;
    use image::{GrayImage, Luma};

    #[test]
    fn bounding_box_of_encoded_ink() {
        let mut binary = GrayImage::new(12, 6);
        binary.put_pixel(2, 1, Luma([255]));
        binary.put_pixel(9, 4, Luma([255]));
        let markup = BoundingBoxTracer.trace(&encode_pbm(&binary)).unwrap();
        assert!(markup.contains(r#"d="M2 1L9 1L9 4L2 4Z""#), "{markup}");
    }

    #[test]
    fn blank_bitmap_has_no_box() {
        let blank = GrayImage::new(8, 8);
        let result = BoundingBoxTracer.trace(&encode_pbm(&blank));
        assert!(matches!(result, Err(TraceError::MalformedOutput(_))));
    }
}
