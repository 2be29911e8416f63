//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageCompressor` 只负责流程编排，具体图片能力由 `ImageBackend` 提供。
//! 处理链路是线性的，不回退：
//!
//! ```text
//! Start → Decoded → Oriented → Resized → Encoded → Done
//!   └──────────┴─────────┴─────────┴──────────┴──→ Failed(reason)
//! ```
//!
//! ## 实现思路
//!
//! - 每个阶段按值消费上一阶段的像素缓冲，旧缓冲随即释放。
//! - 记录 `decode/transform/encode/total` 阶段耗时，便于性能诊断。
//! - 不做任何自动重试，失败直接交给调用方提示用户换图。

use std::time::Instant;

use super::encoder::encode_within_budget;
use super::orientation::{normalize_orientation, resolve_orientation};
use super::resize::limit_dimensions;
use super::{
    CompressionError, CompressionResult, ImageBackend, OrientationHint, PipelineConfig,
    QualityLadder, RasterBackend,
};

/// 图片压缩编排器。
#[derive(Debug, Clone, Default)]
pub struct ImageCompressor<B = RasterBackend> {
    backend: B,
}

impl ImageCompressor<RasterBackend> {
    pub fn new() -> Self {
        Self::with_backend(RasterBackend::new())
    }
}

impl<B: ImageBackend> ImageCompressor<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 压缩主入口。
    ///
    /// `orientation` 为 `None` 时从原始字节读取 EXIF。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use vestite_imaging::compression::{ImageCompressor, PipelineConfig};
    ///
    /// let bytes = std::fs::read("photo.jpg").expect("read photo");
    /// let result = ImageCompressor::new().compress(&bytes, None, &PipelineConfig::default())?;
    /// assert!(result.len() <= 5 * 1024 * 1024);
    /// # Ok::<(), vestite_imaging::compression::CompressionError>(())
    /// ```
    pub fn compress(
        &self,
        bytes: &[u8],
        orientation: Option<OrientationHint>,
        config: &PipelineConfig,
    ) -> Result<CompressionResult, CompressionError> {
        self.compress_with_cancel(bytes, orientation, config, &|| false)
    }

    /// 同 [`compress`](Self::compress)，但在每次编码前检查 `is_cancelled`。
    pub fn compress_with_cancel(
        &self,
        bytes: &[u8],
        orientation: Option<OrientationHint>,
        config: &PipelineConfig,
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<CompressionResult, CompressionError> {
        config.validate()?;
        let ladder = QualityLadder::from_config(config)?;
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let decoded = self.backend.decode(bytes, config.max_decoded_pixels)?;
        let (raw_width, raw_height) = decoded.dimensions();
        let decode_elapsed = decode_start.elapsed();

        let transform_start = Instant::now();
        let hint = resolve_orientation(&self.backend, bytes, orientation);
        let oriented = normalize_orientation(&self.backend, decoded, hint);
        let resized = limit_dimensions(&self.backend, oriented, config.max_dimension)?;
        let transform_elapsed = transform_start.elapsed();

        let encode_start = Instant::now();
        let result = encode_within_budget(
            &self.backend,
            &resized,
            &ladder,
            config.byte_budget,
            is_cancelled,
        );
        drop(resized);
        let encode_elapsed = encode_start.elapsed();

        match &result {
            Ok(compressed) => log::info!(
                "✅ 压缩完成 - 原始: {}x{} ({:.2} MB) 输出: {}x{} 质量: {} 大小: {:.2} MB 方向: {:?} | decode={}ms transform={}ms encode={}ms total={}ms",
                raw_width,
                raw_height,
                bytes.len() as f64 / 1024.0 / 1024.0,
                compressed.width,
                compressed.height,
                compressed.quality,
                compressed.len() as f64 / 1024.0 / 1024.0,
                hint,
                decode_elapsed.as_millis(),
                transform_elapsed.as_millis(),
                encode_elapsed.as_millis(),
                total_start.elapsed().as_millis()
            ),
            Err(err) => log::warn!(
                "❌ 压缩失败 - 原始: {}x{} 原因: {} | total={}ms",
                raw_width,
                raw_height,
                err,
                total_start.elapsed().as_millis()
            ),
        }

        result
    }
}
