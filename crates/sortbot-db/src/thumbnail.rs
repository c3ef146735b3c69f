use std::io::Cursor;

use image::{ImageFormat, imageops::FilterType};

use crate::error::{Result, StoreError};

/// Thumbnails are a fixed 100x100 downscale, generated exactly once when
/// the image is stored. Aspect ratio is not preserved; the dashboard
/// renders them in square cells.
pub const THUMBNAIL_SIZE: u32 = 100;

pub fn make_thumbnail(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| StoreError::validation("store_image", format!("cannot decode image: {e}")))?;

    let thumb = img.resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| StoreError::validation("store_image", format!("cannot encode thumbnail: {e}")))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_thumbnail_is_fixed_size_png() {
        let thumb = make_thumbnail(&test_png(400, 300)).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.width(), THUMBNAIL_SIZE);
        assert_eq!(decoded.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn test_garbage_bytes_are_a_validation_error() {
        let err = make_thumbnail(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }
}
