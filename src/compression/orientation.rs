//! # 方向校正
//!
//! 方向读取失败是整条链路里唯一可恢复的错误：降级为 `Normal` 并继续，
//! 最坏结果是图片方向不对，而不是整次上传失败。

use super::{DecodedImage, ImageBackend, OrientationHint};

/// 决定本次使用的方向提示。
///
/// 调用方显式给出的提示优先；否则读取原始字节中的 EXIF，读不到或读取失败都视为 `Normal`。
pub fn resolve_orientation<B: ImageBackend + ?Sized>(
    backend: &B,
    bytes: &[u8],
    explicit: Option<OrientationHint>,
) -> OrientationHint {
    if let Some(hint) = explicit {
        return hint;
    }

    match backend.read_orientation(bytes) {
        Ok(hint) => hint,
        Err(err) => {
            log::warn!("⚠️ 读取方向信息失败，按 Normal 处理：{}", err);
            OrientationHint::Normal
        }
    }
}

/// 产出无需再做方向校正的像素。`Normal` 时原样返回，不复制。
pub fn normalize_orientation<B: ImageBackend + ?Sized>(
    backend: &B,
    image: DecodedImage,
    hint: OrientationHint,
) -> DecodedImage {
    if hint == OrientationHint::Normal {
        return image;
    }

    let (width, height) = image.dimensions();
    let oriented = backend.orient(image, hint);

    log::debug!(
        "🔄 方向校正：{:?} {}x{} -> {}x{}{}",
        hint,
        width,
        height,
        oriented.width(),
        oriented.height(),
        if hint.swaps_dimensions() { "（宽高互换）" } else { "" }
    );

    oriented
}
