//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，命令行入口统一返回 `Result<T, AppError>`，
//! 替代分散的 `.map_err(|e| e.to_string())` 与 `expect()`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `CompressionError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于输出 JSON 报告。

use serde::Serialize;

use crate::compression::CompressionError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 压缩流水线错误（解码 / 预算 / 处理）
    #[error("{0}")]
    Compression(#[from] CompressionError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件或命令行覆盖项无效
    #[error("配置错误: {0}")]
    Config(String),

    /// 命令行参数错误
    #[error("参数错误: {0}")]
    Usage(String),
}

impl AppError {
    /// 稳定错误码，压缩错误沿用流水线的错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compression(err) => err.code(),
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Usage(_) => "usage",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
