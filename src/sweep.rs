//! Threshold sweep: trace the prepared image at evenly spaced thresholds
//! and keep the best-scoring candidate.

use image::GrayImage;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::bitmap::{binarize, encode_pbm};
use crate::config::TraceConfig;
use crate::error::TraceError;
use crate::markup::{MarkupParser, EMPTY_PATH_SVG};
use crate::pathstats::total_stats;
use crate::prepare::Prepared;
use crate::score::{select_best, weight, Candidate};
use crate::tracer::Tracer;
use crate::TraceResult;

/// `round(256 * (i+1) / (n+1))` for `i in 0..n`: strictly increasing and
/// strictly inside `(0, 256)` for `n` up to 255.
pub fn thresholds(attempts: usize) -> Vec<u8> {
    (0..attempts)
        .map(|i| (256.0 * (i + 1) as f64 / (attempts + 1) as f64).round() as u8)
        .collect()
}

/// Mean intensity, reflected so the result describes the darker minority.
pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let n = gray.width() as u64 * gray.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = sum as f64 / n as f64;
    if mean > 127.0 {
        255.0 - mean
    } else {
        mean
    }
}

/// Ink area divided by centerline length.
///
/// Length is floored at 1.0, an approximation that keeps degenerate
/// candidates finite; a thick blob with almost no centerline still yields
/// an oversized width.
pub fn stroke_width(width: u32, height: u32, mean_intensity: f64, length: f64) -> f64 {
    let ink = width as f64 * height as f64 * mean_intensity / 255.0;
    ink / length.max(1.0)
}

/// Runs one tracer invocation per threshold and selects the winner.
pub struct SweepEngine<'a> {
    tracer: &'a dyn Tracer,
    parser: &'a dyn MarkupParser,
}

impl<'a> SweepEngine<'a> {
    pub fn new(tracer: &'a dyn Tracer, parser: &'a dyn MarkupParser) -> Self {
        Self { tracer, parser }
    }

    /// Sweep `config.candidates` thresholds over the prepared image.
    ///
    /// Only an unavailable tracer is an error. Failed candidates degrade to
    /// the empty placeholder, so an all-degenerate sweep still returns its
    /// best (empty) candidate; check [`TraceResult::is_usable`].
    pub fn run(&self, prepared: &Prepared, config: &TraceConfig) -> Result<TraceResult, TraceError> {
        self.tracer.probe()?;

        let gray = &prepared.image;
        let mean = mean_intensity(gray);
        let levels = thresholds(config.candidates as usize);
        info!(
            "sweep: {} candidates over {}x{}, mean {:.1}",
            levels.len(),
            gray.width(),
            gray.height(),
            mean
        );

        let candidates: Vec<Candidate> = levels
            .par_iter()
            .enumerate()
            .map(|(index, &threshold)| self.candidate(gray, index, threshold, mean))
            .collect();

        let total = candidates.len();
        for c in &candidates {
            debug!(
                "sweep: #{:<3} t={:<3} len={:.1} seg={} pts={} width={:.2} weight={:.1}",
                c.index,
                c.threshold,
                c.length(),
                c.stats.segments,
                c.stats.points,
                c.stroke_width,
                weight(c, c.index, total)
            );
        }

        let best = select_best(&candidates)
            .ok_or_else(|| TraceError::InvalidConfig("no candidates to sweep".to_string()))?;
        let usable = candidates.iter().filter(|c| c.is_usable()).count();
        info!(
            "sweep: best {}/{} at threshold {} ({} usable)",
            best.index, total, best.threshold, usable
        );

        Ok(TraceResult {
            path_data: best.path_data.clone(),
            markup: best.vector_svg.clone(),
            stroke_width: best.stroke_width,
            reference_size: prepared.reference_size,
            padding: prepared.padding,
            threshold: best.threshold,
            index: best.index,
            attempts: total,
            stats: best.stats,
        })
    }

    fn candidate(&self, gray: &GrayImage, index: usize, threshold: u8, mean: f64) -> Candidate {
        let pbm = encode_pbm(&binarize(gray, threshold));
        let (vector_svg, paths) = self.trace_markup(&pbm, threshold);
        let stats = total_stats(paths.iter().map(String::as_str));
        let (image_width, image_height) = gray.dimensions();
        Candidate {
            index,
            threshold,
            image_width,
            image_height,
            mean_intensity: mean,
            vector_svg,
            path_data: paths.join(" "),
            stats,
            stroke_width: stroke_width(image_width, image_height, mean, stats.length),
        }
    }

    /// Markup and its path descriptions, or the placeholder on any failure.
    fn trace_markup(&self, pbm: &[u8], threshold: u8) -> (String, Vec<String>) {
        let markup = match self.tracer.trace(pbm) {
            Ok(markup) => markup,
            Err(e) => {
                warn!("sweep: threshold {}: {}; using empty path", threshold, e);
                return placeholder();
            }
        };
        match self.parser.path_data(&markup) {
            Ok(paths) => (markup, paths),
            Err(e) => {
                warn!("sweep: threshold {}: {}; using empty path", threshold, e);
                placeholder()
            }
        }
    }
}

fn placeholder() -> (String, Vec<String>) {
    (EMPTY_PATH_SVG.to_string(), vec![String::new()])
}
