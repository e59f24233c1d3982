//! Resolving image references (`file://` URIs, paths, `data:` URIs).

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::error::TraceError;

/// Where an image's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Embedded(Vec<u8>),
}

impl ImageSource {
    /// Interpret an image reference as found in an `href`.
    ///
    /// Accepts `file://` URIs, base64 `data:image/...` URIs and plain
    /// paths. Other URI schemes are rejected.
    pub fn from_href(href: &str) -> Result<Self, TraceError> {
        let href = href.trim();
        if let Some(path) = href.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some(rest) = href.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| unsupported(href))?;
            if !meta.starts_with("image/") || !meta.ends_with(";base64") {
                return Err(unsupported(href));
            }
            let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| TraceError::ImageLoad(format!("bad base64 image data: {}", e)))?;
            return Ok(Self::Embedded(bytes));
        }
        if href.is_empty() || has_scheme(href) {
            return Err(unsupported(href));
        }
        Ok(Self::File(PathBuf::from(href)))
    }

    /// Decode the referenced image.
    pub fn load(&self) -> Result<DynamicImage, TraceError> {
        match self {
            Self::File(path) => image::open(path)
                .map_err(|e| TraceError::ImageLoad(format!("{}: {}", path.display(), e))),
            Self::Embedded(bytes) => {
                image::load_from_memory(bytes).map_err(|e| TraceError::ImageLoad(e.to_string()))
            }
        }
    }
}

/// `scheme:` prefix per RFC 3986, excluding single-letter drive names.
fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn unsupported(href: &str) -> TraceError {
    let shown: String = href.chars().take(40).collect();
    TraceError::UnsupportedImageSource(shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let gray = GrayImage::from_pixel(3, 2, Luma([40]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn file_uri_and_plain_path() {
        assert_eq!(
            ImageSource::from_href("file:///tmp/sheep.png").unwrap(),
            ImageSource::File(PathBuf::from("/tmp/sheep.png"))
        );
        assert_eq!(
            ImageSource::from_href("scans/sheep.png").unwrap(),
            ImageSource::File(PathBuf::from("scans/sheep.png"))
        );
        assert_eq!(
            ImageSource::from_href("C:\\scans\\sheep.png").unwrap(),
            ImageSource::File(PathBuf::from("C:\\scans\\sheep.png"))
        );
    }

    #[test]
    fn embedded_png_round_trips() {
        let bytes = png_bytes();
        let href = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let source = ImageSource::from_href(&href).unwrap();
        assert_eq!(source, ImageSource::Embedded(bytes));
        let image = source.load().unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn unknown_forms_are_unsupported() {
        for href in ["http://example.com/a.png", "data:text/plain;base64,AAAA", "data:image/png,raw", ""] {
            assert!(
                matches!(ImageSource::from_href(href), Err(TraceError::UnsupportedImageSource(_))),
                "{href}"
            );
        }
    }

    #[test]
    fn missing_file_fails_to_load() {
        let source = ImageSource::File(PathBuf::from("/nonexistent/centerline.png"));
        assert!(matches!(source.load(), Err(TraceError::ImageLoad(_))));
    }
}
