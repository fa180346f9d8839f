//! Image codec collaborator: open, fit, save.
//!
//! The resolver only talks to [`ImageCodec`]; [`ImageCrateCodec`] is the
//! default implementation on top of the `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, ImageResult};
use std::path::Path;

/// Load, resize and persist images.
///
/// Implementations run on a blocking worker thread.
pub trait ImageCodec: Send + Sync {
    /// Open and decode an image. Fails on missing or corrupt files.
    fn open(&self, path: &Path) -> ImageResult<DynamicImage>;

    /// Shrink to fit within `width` x `height`, preserving aspect ratio.
    fn fit(&self, image: DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Encode `image` as `format` and write it to `path`.
    fn save(&self, image: &DynamicImage, path: &Path, format: ImageFormat) -> ImageResult<()>;
}

/// [`ImageCodec`] backed by the `image` crate with Lanczos3 resampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn open(&self, path: &Path) -> ImageResult<DynamicImage> {
        // Sniff content so a misnamed file still decodes.
        ImageReader::open(path)?.with_guessed_format()?.decode()
    }

    fn fit(&self, image: DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (src_w, src_h) = image.dimensions();
        let (w, h) = fit_within(src_w, src_h, width, height);
        if (w, h) == (src_w, src_h) {
            return image;
        }
        image.resize_exact(w, h, FilterType::Lanczos3)
    }

    fn save(&self, image: &DynamicImage, path: &Path, format: ImageFormat) -> ImageResult<()> {
        // JPEG has no alpha channel.
        if format == ImageFormat::Jpeg && image.color().has_alpha() {
            return DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format);
        }
        image.save_with_format(path, format)
    }
}

/// Dimensions of a `src_w` x `src_h` image shrunk to fit the box.
///
/// Never upscales: an image already inside the box keeps its size.
/// Each side is at least 1 pixel.
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }
    let ratio = f64::min(
        f64::from(max_w) / f64::from(src_w),
        f64::from(max_h) / f64::from(src_h),
    );
    let scale = |side: u32, max: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max);
    (scale(src_w, max_w), scale(src_h, max_h))
}

/// Output format for a requested extension, if the codec can write it.
pub fn format_for_extension(extension: &str) -> Option<ImageFormat> {
    ImageFormat::from_extension(extension).filter(|f| f.writing_enabled())
}
