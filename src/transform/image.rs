// src/transform/image.rs

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageFormat;
use tracing::debug;

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "optimize-images";

/// Lossless PNG recompression.
///
/// Disabled by default (`[images] optimize = false`), in which case every
/// file passes through untouched. When enabled, a recompressed PNG replaces
/// the original only if it is smaller; other formats are copied as-is.
#[derive(Debug, Clone, Default)]
pub struct OptimizeImages {
    enabled: bool,
}

impl OptimizeImages {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

fn is_png(file: &AssetFile) -> bool {
    file.relative
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Re-encode a PNG with maximum compression.
pub fn recompress_png(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| e.to_string())?;
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

impl Transform for OptimizeImages {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        if !self.enabled {
            return Ok(files);
        }

        files
            .into_iter()
            .map(|mut file| {
                if !is_png(&file) {
                    return Ok(file);
                }
                let smaller = recompress_png(&file.contents)
                    .map_err(|msg| TransformError::rejected(STAGE, &file.source, msg))?;
                if smaller.len() < file.contents.len() {
                    debug!(
                        path = ?file.source,
                        before = file.contents.len(),
                        after = smaller.len(),
                        "recompressed png"
                    );
                    file.contents = smaller;
                }
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use image::{ImageEncoder, Rgba, RgbaImage};

    fn loose_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
            .write_image(img.as_raw(), 64, 64, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn disabled_passes_through() {
        let fs = MockFileSystem::new();
        let ctx = TransformContext { fs: &fs };
        let file = AssetFile::new("a.png", "a.png", b"not really a png".to_vec());
        let out = OptimizeImages::new(false).apply(vec![file.clone()], &ctx).unwrap();
        assert_eq!(out, vec![file]);
    }

    #[test]
    fn enabled_shrinks_png_losslessly() {
        let fs = MockFileSystem::new();
        let ctx = TransformContext { fs: &fs };
        let original = loose_png();
        let file = AssetFile::new("a.png", "a.png", original.clone());

        let out = OptimizeImages::new(true).apply(vec![file], &ctx).unwrap();
        assert!(out[0].contents.len() <= original.len());

        let before = image::load_from_memory(&original).unwrap().to_rgba8();
        let after = image::load_from_memory(&out[0].contents).unwrap().to_rgba8();
        assert_eq!(before, after);
    }

    #[test]
    fn enabled_rejects_corrupt_png_and_skips_other_formats() {
        let fs = MockFileSystem::new();
        let ctx = TransformContext { fs: &fs };
        let jpg = AssetFile::new("a.jpg", "a.jpg", b"jpeg bytes".to_vec());
        assert_eq!(OptimizeImages::new(true).apply(vec![jpg.clone()], &ctx).unwrap(), vec![jpg]);

        let png = AssetFile::new("b.png", "b.png", b"garbage".to_vec());
        assert!(OptimizeImages::new(true).apply(vec![png], &ctx).is_err());
    }
}
