//! Coarse color statistics for inbound images.
//!
//! Not a classifier. Mostly-red images (casino banners) and very bright
//! images (neon scam ads) are flagged, nothing more.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RED_THRESHOLD: f64 = 180.0;
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 200.0;

/// Mean channel values on a 0-255 scale above which an image is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageThresholds {
    pub red: f64,
    pub brightness: f64,
}

impl Default for ImageThresholds {
    fn default() -> Self {
        Self {
            red: DEFAULT_RED_THRESHOLD,
            brightness: DEFAULT_BRIGHTNESS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    /// Mean of the red channel
    pub mean_red: f64,
    /// Mean over all RGB channels
    pub mean: f64,
}

/// Decode `data` and compute channel means. `Ok(None)` for an empty image.
pub fn analyze(data: &[u8]) -> Result<Option<ImageStats>, image::ImageError> {
    let rgb = image::load_from_memory(data)?.to_rgb8();
    let pixels = u64::from(rgb.width()) * u64::from(rgb.height());
    if pixels == 0 {
        return Ok(None);
    }

    let (mut red, mut total) = (0u64, 0u64);
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        red += u64::from(r);
        total += u64::from(r) + u64::from(g) + u64::from(b);
    }

    Ok(Some(ImageStats {
        mean_red: red as f64 / pixels as f64,
        mean: total as f64 / (pixels * 3) as f64,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    pub(crate) fn solid_png(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb(color));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_solid_red_stats() {
        let stats = analyze(&solid_png([250, 0, 0])).unwrap().unwrap();
        assert_eq!(stats.mean_red, 250.0);
        assert!((stats.mean - 250.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_undecodable_data_is_an_error() {
        assert!(analyze(&[0u8, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_filter_uses_thresholds() {
        use crate::moderation::filter::{ContentFilter, FlagReason};

        let filter = ContentFilter::default();
        assert!(matches!(
            filter.check_image(&solid_png([230, 10, 10])),
            Some(FlagReason::RedDominant { .. })
        ));
        assert!(matches!(
            filter.check_image(&solid_png([160, 240, 250])),
            Some(FlagReason::Bright { .. })
        ));
        assert_eq!(filter.check_image(&solid_png([40, 90, 60])), None);
    }
}
