//! Minimal SVG output for a traced centerline.

/// Style of the emitted path.
pub fn stroke_style(stroke_width: f64) -> String {
    format!(
        "stroke-width:{:.2}; fill:none; stroke-linecap:round; stroke:#000000;",
        stroke_width
    )
}

/// A standalone SVG document holding one stroked path.
pub fn document(d: &str, stroke_width: f64, width: f64, height: f64) -> String {
    format!(
        "<?xml version=\"1.0\" standalone=\"yes\"?>\n\
         <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
         <path style=\"{style}\" d=\"{d}\"/>\n\
         </svg>\n",
        w = width,
        h = height,
        style = stroke_style(stroke_width),
        d = escape_attr(d),
    )
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
