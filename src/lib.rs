//! centerline-trace: raster line-art → single-path centerline vectors.
//!
//! A bi-level centerline tracer (autotrace) is only as good as the
//! black/white threshold it is fed. This crate prepares the image once,
//! traces it at a sweep of thresholds, scores every result by its path
//! geometry and keeps the best one.
//!
//! # Example
//!
//! ```no_run
//! use centerline_trace::{trace_file, TraceConfig};
//! use std::path::Path;
//!
//! let config = TraceConfig::default();
//! let result = trace_file(Path::new("sketch.png"), &config)?;
//! println!("{} (stroke {:.2}px)", result.path_data, result.stroke_width);
//! # Ok::<(), centerline_trace::TraceError>(())
//! ```

#![forbid(unsafe_code)]

mod bitmap;
mod config;

pub mod denoise;
pub mod error;
pub mod markup;
pub mod pathstats;
pub mod placement;
pub mod prepare;
pub mod score;
pub mod source;
pub mod svg;
pub mod sweep;
pub mod tracer;

#[cfg(test)]
mod testing;

// Re-export kurbo so callers build placements with the same version.
pub use kurbo;

pub use config::{TraceConfig, EQUAL_LIGHT_MAX, MAX_CANDIDATES};
pub use error::TraceError;
pub use markup::{MarkupParser, SvgMarkup};
pub use pathstats::PathStats;
pub use placement::{place, DocumentTransform, PlacedPath};
pub use prepare::{prepare, ClipRect, Prepared};
pub use source::ImageSource;
pub use sweep::SweepEngine;
pub use tracer::{Autotrace, Tracer};

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use kurbo::Rect;
use log::info;

/// The winning candidate of a sweep, in traced-image pixel coordinates.
#[derive(Debug, Clone)]
pub struct TraceResult {
    /// Path data of every traced path, space separated.
    pub path_data: String,
    /// Raw tracer markup (or the empty placeholder).
    pub markup: String,
    /// Estimated stroke width in pixels.
    pub stroke_width: f64,
    /// Uncropped source size in traced pixel units.
    pub reference_size: (f64, f64),
    /// Border added around the traced image.
    pub padding: u32,
    pub threshold: u8,
    /// Position of the winner in the sweep.
    pub index: usize,
    /// Number of candidates tried.
    pub attempts: usize,
    pub stats: PathStats,
}

impl TraceResult {
    /// True when the winning path draws at least one segment.
    pub fn is_usable(&self) -> bool {
        self.stats.segments > 0
    }

    /// Turn an empty winner into [`TraceError::NoUsablePath`].
    pub fn ensure_usable(self) -> Result<Self, TraceError> {
        if self.is_usable() {
            Ok(self)
        } else {
            Err(TraceError::NoUsablePath)
        }
    }
}

/// Full pipeline on a decoded image: prepare → sweep → usable winner.
///
/// `clip` is required when `config.clip` is set and ignored otherwise.
pub fn trace(
    image: &DynamicImage,
    config: &TraceConfig,
    clip: Option<&ClipRect>,
    tracer: &dyn Tracer,
) -> Result<TraceResult, TraceError> {
    config.validate()?;
    let clip = if config.clip {
        Some(clip.ok_or_else(|| {
            TraceError::InvalidConfig("clip requested without a clip rectangle".to_string())
        })?)
    } else {
        None
    };

    let t_start = Instant::now();
    let prepared = prepare(image, config, clip)?;
    let result = SweepEngine::new(tracer, &SvgMarkup).run(&prepared, config)?;
    info!(
        "trace: threshold {} ({}/{}), {} segments, {} points, length {:.1}, stroke {:.2}px ({}ms)",
        result.threshold,
        result.index,
        result.attempts,
        result.stats.segments,
        result.stats.points,
        result.stats.length,
        result.stroke_width,
        t_start.elapsed().as_millis()
    );
    result.ensure_usable()
}

/// Trace an image file with the configured autotrace binary.
pub fn trace_file(image_path: &Path, config: &TraceConfig) -> Result<TraceResult, TraceError> {
    let image = ImageSource::File(image_path.to_path_buf()).load()?;
    trace(&image, config, None, &Autotrace::new(config))
}

/// Document-layer entry point: resolve an image reference, trace it and
/// map the result onto the image's placement.
///
/// `image_rect` is where the image is drawn in document units; `clip`, if
/// given, is a document-space rectangle restricting the trace.
pub fn trace_href(
    href: &str,
    image_rect: Rect,
    clip: Option<Rect>,
    config: &TraceConfig,
    tracer: &dyn Tracer,
) -> Result<PlacedPath, TraceError> {
    let image = ImageSource::from_href(href)?.load()?;
    let clip = if config.clip { clip } else { None };
    let normalized = clip.map(|c| ClipRect::from_document(c, image_rect));
    let result = trace(&image, config, normalized.as_ref(), tracer)?;
    place(&result, image_rect, clip, config)
}
