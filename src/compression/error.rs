//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 压缩链路的所有失败都收敛到 `CompressionError`，调用侧按分支匹配即可决定提示文案。
//! 通过 `thiserror` 保持人类可读错误，同时提供稳定的 `code()` 供前端/日志使用。
//!
//! 只有“读取方向元数据失败”是可恢复的，它不会出现在这里（降级为 Normal）。

/// 图片压缩统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// 输入字节不是可解码的图片。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 图片有效，但在质量下限仍无法满足字节预算。
    #[error(
        "压缩失败：质量 {quality_floor} 时最小仍为 {best_size} 字节（预算 {byte_budget} 字节）"
    )]
    BudgetExceeded {
        best_size: usize,
        byte_budget: usize,
        quality_floor: u8,
    },

    /// 底层图片操作（缩放 / 编码 / 工作线程）异常。
    #[error("图片处理错误：{0}")]
    Resampling(String),

    #[error("配置错误：{0}")]
    InvalidConfig(String),

    /// 调用方已取消，未开始下一次编码。
    #[error("压缩已取消")]
    Cancelled,

    /// 同一请求 ID 已有压缩在途。
    #[error("请求正在处理中：{0}")]
    DuplicateRequest(String),
}

impl CompressionError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::Resampling(_) => "resampling",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Cancelled => "cancelled",
            Self::DuplicateRequest(_) => "duplicate_request",
        }
    }

    /// 面向用户的提示文案。
    ///
    /// 解码与处理异常都提示“无法读取”，预算超限提示换一张更小的照片。
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::Resampling(_) => "无法读取这张图片，请选择其他照片",
            Self::BudgetExceeded { .. } => "图片过大，请尝试更小的照片",
            Self::InvalidConfig(_) => "图片压缩配置无效",
            Self::Cancelled => "已取消",
            Self::DuplicateRequest(_) => "这张图片正在处理中，请稍候",
        }
    }
}
