//! Path extraction from tracer markup.

use crate::error::TraceError;

/// Markup substituted when a candidate's output is missing or unreadable.
pub const EMPTY_PATH_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><path d=""/></svg>"#;

/// Pulls path descriptions out of tracer output.
pub trait MarkupParser: Sync {
    /// The `d` attribute of every path element, in document order.
    fn path_data(&self, markup: &str) -> Result<Vec<String>, TraceError>;
}

/// SVG parsing with `roxmltree`. Namespaces are ignored; a path without
/// a `d` attribute yields an empty description.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgMarkup;

impl MarkupParser for SvgMarkup {
    fn path_data(&self, markup: &str) -> Result<Vec<String>, TraceError> {
        let doc = roxmltree::Document::parse(markup)
            .map_err(|e| TraceError::MalformedOutput(e.to_string()))?;
        Ok(doc
            .descendants()
            .filter(|node| node.is_element() && node.tag_name().name() == "path")
            .map(|node| node.attribute("d").unwrap_or_default().to_string())
            .collect())
    }
}
