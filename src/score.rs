//! Candidate weighting and winner selection.

use crate::pathstats::PathStats;

/// One sweep attempt at a single threshold.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the sweep.
    pub index: usize,
    pub threshold: u8,
    /// Dimensions of the traced (preprocessed) image.
    pub image_width: u32,
    pub image_height: u32,
    /// Mean intensity of the grayscale source, reflected into `[0, 127.5]`.
    pub mean_intensity: f64,
    /// Raw tracer markup, or the empty placeholder.
    pub vector_svg: String,
    /// All `d` attributes of the markup, space separated.
    pub path_data: String,
    pub stats: PathStats,
    /// Estimated ink thickness in pixels.
    pub stroke_width: f64,
}

impl Candidate {
    pub fn length(&self) -> f64 {
        self.stats.length
    }

    /// True when the path draws at least one segment.
    pub fn is_usable(&self) -> bool {
        self.stats.segments > 0
    }
}

/// Scalar quality of a candidate; higher is better.
///
/// Rewards long strokes, penalizes point density, fragmentation and
/// distance from the middle of the sweep.
pub fn weight(candidate: &Candidate, index: usize, total_attempts: usize) -> f64 {
    let from_center = total_attempts as f64 / 2.0 - index as f64;
    let offset =
        from_center * from_center * (candidate.image_width as f64 + candidate.image_height as f64);
    candidate.stats.length * 5.0
        - offset * 0.005
        - candidate.stats.points as f64 * 0.2
        - candidate.stats.segments as f64 * 20.0
}

/// Highest-weight candidate; the earliest wins a tie.
///
/// Each candidate's own `index` feeds the offset term.
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let total = candidates.len();
    candidates
        .iter()
        .map(|c| (c, weight(c, c.index, total)))
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map(|(c, _)| c)
}
