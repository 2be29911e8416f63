//! # 配置模块
//!
//! ## 设计思路
//!
//! 所有可调策略集中在 `PipelineConfig`，单次调用只读，不会被流水线修改。
//! 默认值对齐下游视觉接口的输入上限（5 MB）与常见的 2048 边长。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置。
//! - `#[serde(default)]` 允许 JSON 只写需要覆盖的字段。
//! - `validate` 在进入流水线前拒绝无法构成质量阶梯的参数组合。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CompressionError;

/// 默认单边最大尺寸（像素）。
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;
/// 默认字节预算：5 MiB。
pub const DEFAULT_BYTE_BUDGET: usize = 5 * 1024 * 1024;
pub const DEFAULT_START_QUALITY: u8 = 90;
pub const DEFAULT_QUALITY_STEP: u8 = 10;
pub const DEFAULT_QUALITY_FLOOR: u8 = 50;
/// 解码前的像素上限，拦截“解码炸弹”。
pub const DEFAULT_MAX_DECODED_PIXELS: u64 = 100_000_000;

/// 图片压缩配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 缩放后宽/高单边最大值。
    pub max_dimension: u32,
    /// 编码输出允许的最大字节数。
    pub byte_budget: usize,
    /// 首次尝试的 JPEG 质量（0–100）。
    pub start_quality: u8,
    /// 每次重试降低的质量值。
    pub quality_step: u8,
    /// 最低尝试质量，低于此值放弃。
    pub quality_floor: u8,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            byte_budget: DEFAULT_BYTE_BUDGET,
            start_quality: DEFAULT_START_QUALITY,
            quality_step: DEFAULT_QUALITY_STEP,
            quality_floor: DEFAULT_QUALITY_FLOOR,
            max_decoded_pixels: DEFAULT_MAX_DECODED_PIXELS,
        }
    }
}

impl PipelineConfig {
    /// 校验参数组合。
    ///
    /// # 示例
    /// ```rust
    /// use vestite_imaging::compression::PipelineConfig;
    ///
    /// let mut config = PipelineConfig::default();
    /// config.quality_floor = 95;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CompressionError> {
        if self.max_dimension == 0 {
            return Err(CompressionError::InvalidConfig("max_dimension 必须大于 0".to_string()));
        }
        if self.byte_budget == 0 {
            return Err(CompressionError::InvalidConfig("byte_budget 必须大于 0".to_string()));
        }
        if self.quality_step == 0 {
            return Err(CompressionError::InvalidConfig("quality_step 必须大于 0".to_string()));
        }
        if !(1..=100).contains(&self.start_quality) {
            return Err(CompressionError::InvalidConfig(
                "start_quality 必须在 1~100 之间".to_string(),
            ));
        }
        if self.quality_floor == 0 || self.quality_floor > self.start_quality {
            return Err(CompressionError::InvalidConfig(format!(
                "quality_floor 必须在 1~{} 之间",
                self.start_quality
            )));
        }
        if self.max_decoded_pixels == 0 {
            return Err(CompressionError::InvalidConfig(
                "max_decoded_pixels 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 从 JSON 文件读取配置，缺省字段使用默认值。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CompressionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CompressionError::InvalidConfig(format!("读取配置文件失败 {}：{}", path.display(), e))
        })?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CompressionError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| CompressionError::InvalidConfig(format!("解析配置失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }
}
