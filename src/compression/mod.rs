//! # 图片压缩模块（compression）
//!
//! ## 设计思路
//!
//! 用户从相册或相机选图后，图片在交给视觉识别接口与对象存储之前必须经过这里：
//! 方向校正 → 尺寸限制 → 按字节预算逐级压缩。
//!
//! - `backend`：图片能力接口 `ImageBackend` 与默认实现 `RasterBackend`
//! - `orientation`：读取 EXIF 方向并校正（失败降级为 Normal）
//! - `resize`：只缩不放的尺寸限制
//! - `encoder`：不可变质量阶梯 + 字节预算编码
//! - `handler`：编排整条流水线（只写一次，对任意 backend 通用）
//! - `service`：异步调度、串行化与取消
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 调用方（上传界面 / CLI）
//!    ↓
//! service.rs（配置快照、取消标志、单槽队列、spawn_blocking）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ backend.rs::decode（签名校验 + 像素上限 + 解码）
//!    ├─ orientation.rs（EXIF → 旋转/翻转）
//!    ├─ resize.rs（≤ max_dimension）
//!    └─ encoder.rs（90 → 80 → … → 50，直到 ≤ byte_budget）
//!    ↓
//! CompressedUpload { file_name, result } 交给上传 / 识别协作方
//! ```
//!
//! 调用视觉接口时，图片 part 放在文本 part 之前。

mod backend;
mod config;
mod encoder;
mod error;
mod handler;
mod orientation;
mod resize;
mod service;
mod source;

pub use backend::{ImageBackend, RasterBackend};
pub use config::{
    DEFAULT_BYTE_BUDGET, DEFAULT_MAX_DECODED_PIXELS, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY_FLOOR,
    DEFAULT_QUALITY_STEP, DEFAULT_START_QUALITY, PipelineConfig,
};
pub use encoder::{QualityLadder, encode_within_budget};
pub use error::CompressionError;
pub use handler::ImageCompressor;
pub use orientation::{normalize_orientation, resolve_orientation};
pub use resize::{limit_dimensions, target_dimensions};
pub use service::CompressionService;
pub use source::{
    CaptureSource, CompressedUpload, CompressionResult, DEFAULT_GALLERY_FILE_NAME, DecodedImage,
    OrientationHint, RawCapture,
};

/// 使用默认图片能力执行一次压缩。
///
/// `orientation` 为 `None` 时从字节中读取 EXIF 方向。
pub fn compress(
    raw_bytes: &[u8],
    orientation: Option<OrientationHint>,
    config: &PipelineConfig,
) -> Result<CompressionResult, CompressionError> {
    ImageCompressor::new().compress(raw_bytes, orientation, config)
}
