//! Encoded page snapshots
//!
//! A snapshot is a lossy JPEG copy of a rendered page surface. It only has to
//! look right for the few hundred milliseconds a re-render takes, so it is
//! flattened onto white and stored compressed.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use pageview_layout::Rotation;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Default JPEG quality for snapshots (0-100).
pub const DEFAULT_SNAPSHOT_QUALITY: u8 = 80;

/// Errors from encoding or decoding a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("surface has no pixels ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Compressed bitmap plus its pixel size. Clones share the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotImage {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl SnapshotImage {
    /// Encode an RGBA surface as JPEG. `quality` is clamped to `1..=100`.
    pub fn encode(surface: &RgbaImage, quality: u8) -> Result<Self, SnapshotError> {
        let (width, height) = surface.dimensions();
        if width == 0 || height == 0 {
            return Err(SnapshotError::EmptySurface { width, height });
        }

        let flattened = flatten_on_white(surface);
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&flattened)?;

        Ok(Self { bytes: Arc::from(buf), width, height })
    }

    /// Decode back to an RGBA surface.
    pub fn decode(&self) -> Result<RgbaImage, SnapshotError> {
        let image = image::load_from_memory_with_format(&self.bytes, ImageFormat::Jpeg)?;
        Ok(image.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the encoded data in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

fn flatten_on_white(surface: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
        let [r, g, b, a] = surface.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// A page snapshot tagged with the parameters it was rendered at.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub image: SnapshotImage,
    pub scale: f32,
    pub rotation: Rotation,
    pub captured_at: Instant,
}

impl CachedSnapshot {
    /// Transform that makes this snapshot approximate a render at
    /// `target_scale` / `target_rotation`.
    pub fn transform_to(&self, target_scale: f32, target_rotation: Rotation) -> SnapshotTransform {
        SnapshotTransform {
            rotate: self.rotation.delta_to(target_rotation),
            scale: target_scale / self.scale,
        }
    }
}

/// Compensating transform applied when painting a stand-in image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotTransform {
    /// Extra clockwise rotation.
    pub rotate: Rotation,
    /// Scale factor relative to the image's native size.
    pub scale: f32,
}

impl SnapshotTransform {
    pub const IDENTITY: SnapshotTransform = SnapshotTransform { rotate: Rotation::Deg0, scale: 1.0 };

    pub fn is_identity(&self) -> bool {
        self.rotate == Rotation::Deg0 && (self.scale - 1.0).abs() <= f32::EPSILON
    }
}

impl Default for SnapshotTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_decode_keeps_dimensions() {
        let surface = RgbaImage::from_pixel(40, 24, Rgba([200, 30, 30, 255]));
        let snapshot = SnapshotImage::encode(&surface, DEFAULT_SNAPSHOT_QUALITY).unwrap();

        assert_eq!((snapshot.width(), snapshot.height()), (40, 24));
        assert!(snapshot.byte_len() > 0);
        assert_eq!(&snapshot.as_bytes()[..2], &[0xFF, 0xD8]);

        let decoded = snapshot.decode().unwrap();
        assert_eq!(decoded.dimensions(), (40, 24));
        let px = decoded.get_pixel(20, 12).0;
        assert!(px[0] > 150 && px[1] < 80 && px[2] < 80, "unexpected pixel {px:?}");
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let surface = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let flat = flatten_on_white(&surface);
        assert_eq!(flat.get_pixel(3, 3).0, [255, 255, 255]);
    }

    #[test]
    fn empty_surface_is_rejected() {
        let surface = RgbaImage::new(0, 10);
        assert!(matches!(
            SnapshotImage::encode(&surface, 80),
            Err(SnapshotError::EmptySurface { width: 0, height: 10 })
        ));
    }

    #[test]
    fn transform_compensates_scale_and_rotation() {
        let surface = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let snapshot = CachedSnapshot {
            image: SnapshotImage::encode(&surface, 80).unwrap(),
            scale: 1.0,
            rotation: Rotation::Deg270,
            captured_at: Instant::now(),
        };

        let transform = snapshot.transform_to(2.0, Rotation::Deg90);
        assert_eq!(transform.rotate, Rotation::Deg180);
        assert_eq!(transform.scale, 2.0);
        assert!(snapshot.transform_to(1.0, Rotation::Deg270).is_identity());
    }
}
