//! # 图片能力接口（backend）
//!
//! ## 设计思路
//!
//! 流水线只依赖 `ImageBackend` 这一组能力：解码、读方向、旋转翻转、缩放、JPEG 编码。
//! 编排逻辑只写一次（见 `handler.rs`），各平台只需提供自己的实现。
//!
//! ## 实现思路
//!
//! 默认实现 `RasterBackend`：
//! 1. `infer` 按文件签名拒绝非图片输入
//! 2. 读取 header 尺寸，按像素上限快速拒绝
//! 3. `image` 完整解码并统一为 RGB8
//! 4. `kamadak-exif` 读取方向标签
//! 5. `fast_image_resize` 做 Lanczos3 降采样
//! 6. `image` 的 `JpegEncoder` 编码

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader, RgbImage, imageops};

use super::{CompressionError, DecodedImage, OrientationHint};

/// 流水线所需的图片能力。
pub trait ImageBackend: Send + Sync {
    /// 解码为 RGB 像素；像素数超过 `max_decoded_pixels` 时拒绝。
    fn decode(&self, bytes: &[u8], max_decoded_pixels: u64) -> Result<DecodedImage, CompressionError>;

    /// 从原始字节读取方向标签；没有标签时返回 `Normal`。
    fn read_orientation(&self, bytes: &[u8]) -> Result<OrientationHint, CompressionError>;

    /// 按方向提示旋转/翻转。
    fn orient(&self, image: DecodedImage, hint: OrientationHint) -> DecodedImage;

    /// 缩放到精确尺寸。
    fn resize(&self, image: DecodedImage, width: u32, height: u32) -> Result<DecodedImage, CompressionError>;

    /// 以给定质量（0–100）编码为 JPEG。
    fn encode_jpeg(&self, image: &DecodedImage, quality: u8) -> Result<Vec<u8>, CompressionError>;
}

/// 基于 `image` / `fast_image_resize` / `kamadak-exif` 的默认实现。
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterBackend;

impl RasterBackend {
    pub fn new() -> Self {
        Self
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片，返回 MIME。
    fn sniff_image_mime(bytes: &[u8]) -> Result<&'static str, CompressionError> {
        if bytes.is_empty() {
            return Err(CompressionError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| CompressionError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(CompressionError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(kind.mime_type())
    }

    /// 仅通过图片头信息读取宽高，用于完整解码前的像素检查。
    fn inspect_dimensions(bytes: &[u8], mime: &str) -> Result<(u32, u32), CompressionError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompressionError::Decode(format!("无法识别图片格式（{}）：{}", mime, e)))?;

        reader
            .into_dimensions()
            .map_err(|e| CompressionError::Decode(format!("无法读取图片尺寸（{}）：{}", mime, e)))
    }

    fn validate_pixel_limit(width: u32, height: u32, max_decoded_pixels: u64) -> Result<(), CompressionError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| CompressionError::Decode("图片像素数溢出".to_string()))?;

        if pixels > max_decoded_pixels {
            return Err(CompressionError::Decode(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, max_decoded_pixels
            )));
        }

        Ok(())
    }
}

impl ImageBackend for RasterBackend {
    fn decode(&self, bytes: &[u8], max_decoded_pixels: u64) -> Result<DecodedImage, CompressionError> {
        let mime = Self::sniff_image_mime(bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions(bytes, mime)?;
        Self::validate_pixel_limit(header_width, header_height, max_decoded_pixels)?;

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CompressionError::Decode(format!("图片解码失败（{}）：{}", mime, e)))?;

        log::debug!(
            "🖼️ 解码完成 - 格式: {} 尺寸: {}x{}",
            mime,
            decoded.width(),
            decoded.height()
        );

        DecodedImage::new(decoded.into_rgb8())
    }

    fn read_orientation(&self, bytes: &[u8]) -> Result<OrientationHint, CompressionError> {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(OrientationHint::Normal),
            Err(e) => {
                return Err(CompressionError::Decode(format!("读取 EXIF 失败：{}", e)));
            }
        };

        let hint = exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(OrientationHint::from_exif)
            .unwrap_or_default();

        Ok(hint)
    }

    fn orient(&self, image: DecodedImage, hint: OrientationHint) -> DecodedImage {
        match hint {
            OrientationHint::Normal => image,
            OrientationHint::Rotate90 => image.map_pixels(|pixels| imageops::rotate90(&pixels)),
            OrientationHint::Rotate180 => image.map_pixels(|mut pixels| {
                imageops::rotate180_in_place(&mut pixels);
                pixels
            }),
            OrientationHint::Rotate270 => image.map_pixels(|pixels| imageops::rotate270(&pixels)),
            OrientationHint::FlipHorizontal => image.map_pixels(|mut pixels| {
                imageops::flip_horizontal_in_place(&mut pixels);
                pixels
            }),
            OrientationHint::FlipVertical => image.map_pixels(|mut pixels| {
                imageops::flip_vertical_in_place(&mut pixels);
                pixels
            }),
        }
    }

    fn resize(&self, image: DecodedImage, width: u32, height: u32) -> Result<DecodedImage, CompressionError> {
        let src = image.into_pixels();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| CompressionError::Resampling(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| CompressionError::Resampling(format!("fast_image_resize 执行失败：{}", e)))?;
        drop(src_image);

        let rgb = RgbImage::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
            CompressionError::Resampling("fast_image_resize 输出缓冲长度异常".to_string())
        })?;

        DecodedImage::new(rgb).map_err(|e| CompressionError::Resampling(e.to_string()))
    }

    fn encode_jpeg(&self, image: &DecodedImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
        let pixels = image.pixels();
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);

        encoder
            .encode(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CompressionError::Resampling(format!("JPEG 编码失败（质量 {}）：{}", quality, e)))?;

        Ok(buf)
    }
}
