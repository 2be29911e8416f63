//! # VESTITE 图片压缩 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           衣橱客户端（相册 / 相机选图 → 上传界面）        │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ RawCapture（原始字节 + 方向提示 + 来源）
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  └─ compression                                          │
//! │      ├─ service        异步调度·串行化·取消               │
//! │      ├─ handler        解码→方向→缩放→编码               │
//! │      └─ backend        image / fast_image_resize / exif  │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ CompressedUpload（≤ 5 MB JPEG + 文件名）
//!   对象存储上传 · 视觉识别接口（不在本仓库）
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用级错误 `AppError`，CLI 的返回类型 |
//! | [`compression`] | 图片压缩流水线、配置、异步服务 |

pub mod compression;
pub mod error;
