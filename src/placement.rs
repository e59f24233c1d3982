//! Mapping traced pixel coordinates back into document space.

use kurbo::{Affine, BezPath, Point, Rect, Vec2};

use crate::config::TraceConfig;
use crate::error::TraceError;
use crate::prepare::ClipRect;
use crate::TraceResult;

/// Pixel-to-document mapping for one traced image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentTransform {
    pub affine: Affine,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl DocumentTransform {
    /// `translate(origin) * scale(sx, sy) * translate(-padding)`.
    ///
    /// `image` is where the whole source image is drawn. With a clip, the
    /// origin is the clip's own corner, clamped so it never precedes the
    /// image's.
    pub fn new(reference_size: (f64, f64), padding: u32, image: Rect, clip: Option<Rect>) -> Self {
        let scale_x = image.width() / reference_size.0;
        let scale_y = image.height() / reference_size.1;
        let origin = match clip {
            Some(c) => Point::new(c.x0.max(image.x0), c.y0.max(image.y0)),
            None => image.origin(),
        };
        let pad = -(padding as f64);
        let affine = Affine::translate(origin.to_vec2())
            * Affine::scale_non_uniform(scale_x, scale_y)
            * Affine::translate(Vec2::new(pad, pad));
        Self { affine, scale_x, scale_y }
    }

    /// Convert an estimated pixel stroke width to document units, unless a
    /// hairline width is configured.
    pub fn stroke_width(&self, estimated: f64, config: &TraceConfig) -> f64 {
        if config.hairline {
            config.hairline_width
        } else {
            estimated * (self.scale_x.abs() + self.scale_y.abs()) / 2.0
        }
    }
}

impl ClipRect {
    /// Express a document-space clip rectangle relative to the image it clips.
    pub fn from_document(clip: Rect, image: Rect) -> Self {
        Self {
            x: (clip.x0 - image.x0) / image.width(),
            y: (clip.y0 - image.y0) / image.height(),
            w: clip.width() / image.width(),
            h: clip.height() / image.height(),
        }
    }
}

/// A traced path ready for the document layer.
#[derive(Debug, Clone)]
pub struct PlacedPath {
    /// Path data in document coordinates.
    pub d: String,
    /// Stroke width in document units.
    pub stroke_width: f64,
    pub transform: DocumentTransform,
    /// Whether the document layer should remove the source image.
    pub replace_original: bool,
}

/// Map a sweep result onto the document.
pub fn place(
    result: &TraceResult,
    image: Rect,
    clip: Option<Rect>,
    config: &TraceConfig,
) -> Result<PlacedPath, TraceError> {
    let transform = DocumentTransform::new(result.reference_size, result.padding, image, clip);
    let mut path =
        BezPath::from_svg(&result.path_data).map_err(|e| TraceError::InvalidPath(e.to_string()))?;
    path.apply_affine(transform.affine);
    Ok(PlacedPath {
        d: path.to_svg(),
        stroke_width: transform.stroke_width(result.stroke_width, config),
        transform,
        replace_original: config.replace_original,
    })
}
