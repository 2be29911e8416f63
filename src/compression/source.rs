//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”“流水线中间结果”“最终产物”解耦：
//! - `RawCapture` 表示相机/相册交来的原始字节
//! - `DecodedImage` 表示解码后的 RGB 像素（宽高恒为正）
//! - `CompressionResult` 表示满足字节预算的 JPEG
//! - `CompressedUpload` 额外携带上传用的文件名

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use chrono::Utc;
use image::RgbImage;

use super::CompressionError;

/// 方向提示（EXIF 方向标签的子集）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationHint {
    #[default]
    Normal,
    /// 顺时针 90°。
    Rotate90,
    Rotate180,
    /// 顺时针 270°（即逆时针 90°）。
    Rotate270,
    /// 沿竖直轴镜像（左右翻转）。
    FlipHorizontal,
    /// 沿水平轴镜像（上下翻转）。
    FlipVertical,
}

impl OrientationHint {
    /// 由 EXIF 方向值映射。
    ///
    /// 5 / 7（转置类）与未知值一律视为 `Normal`。
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            6 => Self::Rotate90,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// 是否会交换宽高。
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }
}

/// 图片来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// 相册选取，可能带有原始文件名。
    Gallery { file_name: Option<String> },
    /// 相机拍摄。
    Camera,
}

/// 相册图片缺少文件名时使用的默认名。
pub const DEFAULT_GALLERY_FILE_NAME: &str = "gallery_image.jpg";

impl CaptureSource {
    /// 上传用文件名，使用当前时间。
    pub fn upload_file_name(&self) -> String {
        self.upload_file_name_at(Utc::now().timestamp_millis())
    }

    /// 上传用文件名，输出恒为 JPEG，因此扩展名统一为 `.jpg`。
    ///
    /// - 相册：保留原文件名主干（去掉目录部分）
    /// - 相机：`camera_<毫秒时间戳>.jpg`
    pub fn upload_file_name_at(&self, unix_millis: i64) -> String {
        match self {
            Self::Camera => format!("camera_{}.jpg", unix_millis),
            Self::Gallery { file_name } => file_name
                .as_deref()
                .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name).trim())
                .filter(|name| !name.is_empty())
                .map(|name| match name.rsplit_once('.') {
                    Some((stem, _ext)) if !stem.is_empty() => format!("{}.jpg", stem),
                    _ => format!("{}.jpg", name),
                })
                .unwrap_or_else(|| DEFAULT_GALLERY_FILE_NAME.to_string()),
        }
    }
}

/// 输入：原始字节与可选的方向提示。
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    /// `None` 表示从字节中的 EXIF 读取。
    pub orientation: Option<OrientationHint>,
    pub source: CaptureSource,
}

impl RawCapture {
    pub fn gallery(bytes: Vec<u8>, file_name: Option<String>) -> Self {
        Self {
            bytes,
            orientation: None,
            source: CaptureSource::Gallery { file_name },
        }
    }

    pub fn camera(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            orientation: None,
            source: CaptureSource::Camera,
        }
    }

    pub fn with_orientation(mut self, hint: OrientationHint) -> Self {
        self.orientation = Some(hint);
        self
    }
}

/// 解码后的 RGB 像素缓冲。
///
/// 构造时保证 `width > 0 && height > 0`。各阶段按值消费前一个缓冲，
/// 同一时刻最多存活两份像素数据。
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbImage) -> Result<Self, CompressionError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(CompressionError::Decode(format!(
                "图片尺寸无效：{}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// 应用不改变“宽高为正”这一性质的像素变换（旋转、翻转）。
    pub(crate) fn map_pixels(self, transform: impl FnOnce(RgbImage) -> RgbImage) -> Self {
        Self {
            pixels: transform(self.pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }
}

/// 输出：满足预算的 JPEG 字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub bytes: Bytes,
    /// 达成预算时使用的质量（0–100）。
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    /// 实际编码次数。
    pub attempts: u32,
}

impl CompressionResult {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    /// 标准 Base64，用于视觉接口的 inline data。
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// 交给上传/识别协作方的最终产物。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedUpload {
    pub file_name: String,
    pub result: CompressionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exif_values_map_to_hints() {
        assert_eq!(OrientationHint::from_exif(1), OrientationHint::Normal);
        assert_eq!(OrientationHint::from_exif(2), OrientationHint::FlipHorizontal);
        assert_eq!(OrientationHint::from_exif(3), OrientationHint::Rotate180);
        assert_eq!(OrientationHint::from_exif(4), OrientationHint::FlipVertical);
        assert_eq!(OrientationHint::from_exif(6), OrientationHint::Rotate90);
        assert_eq!(OrientationHint::from_exif(8), OrientationHint::Rotate270);
    }

    #[test]
    fn transpose_and_unknown_values_pass_through() {
        for value in [0, 5, 7, 9, 255] {
            assert_eq!(OrientationHint::from_exif(value), OrientationHint::Normal);
        }
    }

    #[test]
    fn only_quarter_turns_swap_dimensions() {
        assert!(OrientationHint::Rotate90.swaps_dimensions());
        assert!(OrientationHint::Rotate270.swaps_dimensions());
        for hint in [
            OrientationHint::Normal,
            OrientationHint::Rotate180,
            OrientationHint::FlipHorizontal,
            OrientationHint::FlipVertical,
        ] {
            assert!(!hint.swaps_dimensions(), "{:?}", hint);
        }
    }

    #[test]
    fn gallery_names_are_normalised_to_jpg() {
        let named = |name: &str| CaptureSource::Gallery {
            file_name: Some(name.to_string()),
        };

        assert_eq!(named("IMG_0042.HEIC").upload_file_name_at(0), "IMG_0042.jpg");
        assert_eq!(named("shirt.blue.png").upload_file_name_at(0), "shirt.blue.jpg");
        assert_eq!(named("/sdcard/DCIM/jacket.jpeg").upload_file_name_at(0), "jacket.jpg");
        assert_eq!(named("C:\\photos\\coat.webp").upload_file_name_at(0), "coat.jpg");
        assert_eq!(named("no_extension").upload_file_name_at(0), "no_extension.jpg");
        assert_eq!(named(".hidden").upload_file_name_at(0), ".hidden.jpg");
    }

    #[test]
    fn blank_gallery_names_use_default() {
        for file_name in [None, Some(String::new()), Some("   ".to_string()), Some("dir/".to_string())] {
            let source = CaptureSource::Gallery { file_name };
            assert_eq!(source.upload_file_name_at(0), DEFAULT_GALLERY_FILE_NAME);
        }
    }

    #[test]
    fn camera_names_carry_timestamp() {
        assert_eq!(
            CaptureSource::Camera.upload_file_name_at(1_700_000_000_123),
            "camera_1700000000123.jpg"
        );
        assert!(CaptureSource::Camera.upload_file_name().starts_with("camera_"));
    }

    #[test]
    fn decoded_image_rejects_empty_buffers() {
        let empty = RgbImage::new(0, 10);
        assert!(matches!(
            DecodedImage::new(empty),
            Err(CompressionError::Decode(_))
        ));
    }

    #[test]
    fn result_exposes_base64_and_mime() {
        let result = CompressionResult {
            bytes: Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
            quality: 90,
            width: 1,
            height: 1,
            attempts: 1,
        };

        assert_eq!(result.to_base64(), "/9j/");
        assert_eq!(result.mime_type(), "image/jpeg");
        assert_eq!(result.len(), 3);
    }
}
