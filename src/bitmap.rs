//! Bi-level conversion and P4 (binary PBM) serialization.

use image::GrayImage;
use imageproc::contrast::ThresholdType;

/// Binarize a grayscale image at `threshold`: `[0, threshold)` becomes 255
/// and `[threshold, 256)` becomes 0. The source is not modified.
///
/// Dark input becomes 255, which the P4 writer emits as black ink.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    match threshold.checked_sub(1) {
        Some(level) => imageproc::contrast::threshold(gray, level, ThresholdType::BinaryInverted),
        None => GrayImage::new(gray.width(), gray.height()),
    }
}

/// Serialize a binarized image as P4.
///
/// Header `P4\n<w> <h>\n`, then `ceil(w/8)` bytes per row, MSB first.
/// Nonzero pixels are written as 1 (black).
pub fn encode_pbm(binary: &GrayImage) -> Vec<u8> {
    let (width, height) = binary.dimensions();
    let row_bytes = (width as usize).div_ceil(8);
    let header = format!("P4\n{} {}\n", width, height);

    let mut out = Vec::with_capacity(header.len() + row_bytes * height as usize);
    out.extend_from_slice(header.as_bytes());
    for row in binary.rows() {
        let mut packed = vec![0u8; row_bytes];
        for (x, pixel) in row.enumerate() {
            if pixel.0[0] != 0 {
                packed[x / 8] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&packed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn binarize_inverts_polarity() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0u8, 99, 100, 255][x as usize]]));
        let binary = binarize(&gray, 100);
        let values: Vec<u8> = binary.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![255, 255, 0, 0]);
        // Source untouched.
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn binarize_edges_of_range() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0u8, 1, 255][x as usize]]));
        let values = |t| binarize(&gray, t).pixels().map(|p| p.0[0]).collect::<Vec<u8>>();
        assert_eq!(values(0), vec![0, 0, 0]);
        assert_eq!(values(1), vec![255, 0, 0]);
        assert_eq!(values(255), vec![255, 255, 0]);
    }

    #[test]
    fn pbm_rows_are_byte_aligned_msb_first() {
        // 10 px wide: two bytes per row.
        let mut binary = GrayImage::new(10, 2);
        binary.put_pixel(0, 0, Luma([255]));
        binary.put_pixel(9, 0, Luma([255]));
        binary.put_pixel(7, 1, Luma([255]));
        let bytes = encode_pbm(&binary);
        let header = b"P4\n10 2\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(&bytes[header.len()..], &[0b1000_0000, 0b0100_0000, 0b0000_0001, 0b0000_0000]);
    }

    #[test]
    fn pbm_decodes_back_to_same_ink() {
        let mut binary = GrayImage::new(11, 3);
        binary.put_pixel(0, 0, Luma([255]));
        binary.put_pixel(10, 2, Luma([255]));
        let decoded = image::load_from_memory(&encode_pbm(&binary)).unwrap().to_luma8();
        assert_eq!(decoded.dimensions(), (11, 3));
        for (x, y, pixel) in decoded.enumerate_pixels() {
            let ink = binary.get_pixel(x, y).0[0] != 0;
            assert_eq!(pixel.0[0] == 0, ink, "({x}, {y})");
        }
    }
}
