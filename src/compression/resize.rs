//! # 尺寸限制
//!
//! ## 设计思路
//!
//! 只缩不放：宽高都不超过 `max_dimension` 时原样返回，不引入任何重采样痕迹。
//!
//! ## 实现思路
//!
//! `scale = min(max / w, max / h, 1.0)`。为避免浮点误差把 2048 算成 2047，
//! 目标尺寸用整数比例计算：长边恰好等于 `max_dimension`，短边向下取整（至少 1 像素）。

use super::{CompressionError, DecodedImage, ImageBackend};

/// 计算降采样目标尺寸；无需缩放时返回 `None`。
///
/// # 示例
/// ```rust
/// use vestite_imaging::compression::target_dimensions;
///
/// assert_eq!(target_dimensions(4000, 3000, 2048), Some((2048, 1536)));
/// assert_eq!(target_dimensions(800, 600, 2048), None);
/// ```
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    let max = max_dimension as u64;
    let (width, height) = (width as u64, height as u64);

    let (target_width, target_height) = if width >= height {
        (max, height * max / width)
    } else {
        (width * max / height, max)
    };

    Some(((target_width as u32).max(1), (target_height as u32).max(1)))
}

/// 保证输出宽高都不超过 `max_dimension`。
pub fn limit_dimensions<B: ImageBackend + ?Sized>(
    backend: &B,
    image: DecodedImage,
    max_dimension: u32,
) -> Result<DecodedImage, CompressionError> {
    let (width, height) = image.dimensions();

    let Some((target_width, target_height)) = target_dimensions(width, height, max_dimension) else {
        return Ok(image);
    };

    log::info!(
        "🧩 降采样：{}x{} -> {}x{}（filter=Lanczos3）",
        width,
        height,
        target_width,
        target_height
    );

    backend.resize(image, target_width, target_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::RasterBackend;
    use image::RgbImage;

    #[test]
    fn landscape_scenario_scales_by_0_512() {
        assert_eq!(target_dimensions(4000, 3000, 2048), Some((2048, 1536)));
    }

    #[test]
    fn portrait_uses_height_as_limiting_side() {
        assert_eq!(target_dimensions(3000, 4000, 2048), Some((1536, 2048)));
    }

    #[test]
    fn square_and_boundary_sizes() {
        assert_eq!(target_dimensions(4096, 4096, 2048), Some((2048, 2048)));
        assert_eq!(target_dimensions(2048, 2048, 2048), None);
        assert_eq!(target_dimensions(2049, 1, 2048), Some((2048, 1)));
    }

    #[test]
    fn extreme_aspect_ratio_keeps_one_pixel() {
        assert_eq!(target_dimensions(10_000, 1, 100), Some((100, 1)));
    }

    #[test]
    fn small_image_is_not_resampled() {
        let image = DecodedImage::new(RgbImage::new(640, 480)).expect("valid image");

        let limited = limit_dimensions(&RasterBackend, image, 2048).expect("limit failed");

        assert_eq!(limited.dimensions(), (640, 480));
    }

    #[test]
    fn large_image_is_downscaled() {
        let image = DecodedImage::new(RgbImage::new(300, 150)).expect("valid image");

        let limited = limit_dimensions(&RasterBackend, image, 100).expect("limit failed");

        assert_eq!(limited.dimensions(), (100, 50));
    }
}
