//! Aggregate geometry of SVG path data.
//!
//! Curves are not integrated: every coordinate pair after a subpath's start
//! point is treated as a line-to, so control points count as vertices and
//! the length runs straight through the handles.

use std::ops::AddAssign;

use log::debug;

/// Length, vertex count and disjoint-subpath count of one or more paths.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathStats {
    /// Sum of Euclidean distances between consecutive vertices.
    pub length: f64,
    /// All vertices, duplicates and implicit closing vertices included.
    pub points: usize,
    /// Subpaths with at least one vertex after the start point.
    pub segments: usize,
}

impl AddAssign for PathStats {
    fn add_assign(&mut self, other: Self) {
        self.length += other.length;
        self.points += other.points;
        self.segments += other.segments;
    }
}

/// Compute [`PathStats`] for a path's `d` attribute.
///
/// Malformed subpaths (fewer than two numbers, or a token that is not a
/// number) contribute nothing.
pub fn path_stats(d: &str) -> PathStats {
    let lower = d.to_lowercase();
    let mut stats = PathStats::default();
    for chunk in lower.split('m') {
        stats += subpath_stats(chunk);
    }
    stats
}

/// Sum [`path_stats`] over several path descriptions.
pub fn total_stats<'a>(paths: impl IntoIterator<Item = &'a str>) -> PathStats {
    let mut total = PathStats::default();
    for d in paths {
        total += path_stats(d);
    }
    total
}

fn subpath_stats(chunk: &str) -> PathStats {
    let cleaned: String = chunk
        .chars()
        .map(|c| if matches!(c, 'c' | 'l' | ',') { ' ' } else { c })
        .collect();
    let trimmed = cleaned.trim_end();
    let (body, closed) = match trimmed.strip_suffix('z') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 2 {
        return PathStats::default();
    }
    let numbers: Vec<f64> = match tokens.iter().map(|t| t.parse::<f64>()).collect() {
        Ok(numbers) => numbers,
        Err(_) => {
            debug!("skipping malformed subpath {:?}", chunk.trim());
            return PathStats::default();
        }
    };

    let start = (numbers[0], numbers[1]);
    let mut vertices: Vec<(f64, f64)> = numbers[2..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    let mut stats = PathStats { points: 1, ..PathStats::default() };
    if vertices.is_empty() {
        return stats;
    }
    stats.segments = 1;
    if closed {
        vertices.push(start);
    }

    let mut prev = start;
    for &(x, y) in &vertices {
        let dx = x - prev.0;
        let dy = y - prev.1;
        stats.length += (dx * dx + dy * dy).sqrt();
        stats.points += 1;
        prev = (x, y);
    }
    stats
}
