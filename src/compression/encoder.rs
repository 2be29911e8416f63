//! # 字节预算编码
//!
//! ## 设计思路
//!
//! 质量值构成一个固定、不可变的阶梯（默认 90, 80, 70, 60, 50），
//! 按顺序取第一个满足预算的结果。不做二分或更细粒度搜索，编码次数可预期且有上界。
//!
//! 质量下限是有意的取舍：宁可失败让用户换图，也不产出明显劣化的图片。

use bytes::Bytes;

use super::{CompressionError, CompressionResult, DecodedImage, ImageBackend, PipelineConfig};

/// 不可变质量阶梯：`start, start - step, …`，不低于 `floor`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityLadder {
    start: u8,
    step: u8,
    floor: u8,
}

impl QualityLadder {
    pub fn new(start: u8, step: u8, floor: u8) -> Result<Self, CompressionError> {
        if step == 0 {
            return Err(CompressionError::InvalidConfig("quality_step 必须大于 0".to_string()));
        }
        if start > 100 || floor == 0 || floor > start {
            return Err(CompressionError::InvalidConfig(format!(
                "质量阶梯无效：start={} floor={}",
                start, floor
            )));
        }

        Ok(Self { start, step, floor })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, CompressionError> {
        Self::new(config.start_quality, config.quality_step, config.quality_floor)
    }

    /// 依次产出每一级质量。
    ///
    /// # 示例
    /// ```rust
    /// use vestite_imaging::compression::QualityLadder;
    ///
    /// let ladder = QualityLadder::new(90, 10, 50)?;
    /// assert_eq!(ladder.rungs().collect::<Vec<_>>(), vec![90, 80, 70, 60, 50]);
    /// # Ok::<(), vestite_imaging::compression::CompressionError>(())
    /// ```
    pub fn rungs(&self) -> impl Iterator<Item = u8> + use<> {
        let (step, floor) = (self.step, self.floor);
        std::iter::successors(Some(self.start), move |&quality| {
            quality.checked_sub(step).filter(|&next| next >= floor)
        })
    }

    /// 最大编码次数：`(start - floor) / step + 1`。
    pub fn len(&self) -> usize {
        ((self.start - self.floor) / self.step) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn floor(&self) -> u8 {
        self.floor
    }
}

/// 逐级降低质量编码，返回第一个不超过 `byte_budget` 的结果。
///
/// 每一级开始前检查 `is_cancelled`，取消只发生在两次编码之间。
pub fn encode_within_budget<B: ImageBackend + ?Sized>(
    backend: &B,
    image: &DecodedImage,
    ladder: &QualityLadder,
    byte_budget: usize,
    is_cancelled: &dyn Fn() -> bool,
) -> Result<CompressionResult, CompressionError> {
    let mut best_size: Option<usize> = None;
    let mut attempts = 0u32;

    for quality in ladder.rungs() {
        if is_cancelled() {
            log::info!("⏹️ 压缩已取消（已编码 {} 次）", attempts);
            return Err(CompressionError::Cancelled);
        }

        let encoded = backend.encode_jpeg(image, quality)?;
        attempts += 1;

        log::debug!(
            "📦 质量 {} 编码结果：{:.2} MB（预算 {:.2} MB）",
            quality,
            encoded.len() as f64 / 1024.0 / 1024.0,
            byte_budget as f64 / 1024.0 / 1024.0
        );

        if encoded.len() <= byte_budget {
            return Ok(CompressionResult {
                bytes: Bytes::from(encoded),
                quality,
                width: image.width(),
                height: image.height(),
                attempts,
            });
        }

        best_size = Some(best_size.map_or(encoded.len(), |best| best.min(encoded.len())));
    }

    Err(CompressionError::BudgetExceeded {
        best_size: best_size.unwrap_or(0),
        byte_budget,
        quality_floor: ladder.floor(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::OrientationHint;
    use image::RgbImage;
    use std::sync::Mutex;

    /// 编码结果大小 = `quality * bytes_per_quality`，并记录每次尝试的质量。
    struct SizedBackend {
        bytes_per_quality: usize,
        attempts: Mutex<Vec<u8>>,
    }

    impl SizedBackend {
        fn new(bytes_per_quality: usize) -> Self {
            Self {
                bytes_per_quality,
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempted(&self) -> Vec<u8> {
            self.attempts.lock().expect("attempts lock poisoned").clone()
        }
    }

    impl ImageBackend for SizedBackend {
        fn decode(&self, _bytes: &[u8], _max: u64) -> Result<DecodedImage, CompressionError> {
            unreachable!("encoder tests never decode")
        }

        fn read_orientation(&self, _bytes: &[u8]) -> Result<OrientationHint, CompressionError> {
            Ok(OrientationHint::Normal)
        }

        fn orient(&self, image: DecodedImage, _hint: OrientationHint) -> DecodedImage {
            image
        }

        fn resize(&self, image: DecodedImage, _w: u32, _h: u32) -> Result<DecodedImage, CompressionError> {
            Ok(image)
        }

        fn encode_jpeg(&self, _image: &DecodedImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
            self.attempts.lock().expect("attempts lock poisoned").push(quality);
            Ok(vec![0; quality as usize * self.bytes_per_quality])
        }
    }

    /// 编码器直接报错的假实现。
    struct FailingEncoder;

    impl ImageBackend for FailingEncoder {
        fn decode(&self, _bytes: &[u8], _max: u64) -> Result<DecodedImage, CompressionError> {
            unreachable!("encoder tests never decode")
        }

        fn read_orientation(&self, _bytes: &[u8]) -> Result<OrientationHint, CompressionError> {
            Ok(OrientationHint::Normal)
        }

        fn orient(&self, image: DecodedImage, _hint: OrientationHint) -> DecodedImage {
            image
        }

        fn resize(&self, image: DecodedImage, _w: u32, _h: u32) -> Result<DecodedImage, CompressionError> {
            Ok(image)
        }

        fn encode_jpeg(&self, _image: &DecodedImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
            Err(CompressionError::Resampling(format!("JPEG 编码失败（质量 {}）", quality)))
        }
    }

    fn tiny_image() -> DecodedImage {
        DecodedImage::new(RgbImage::new(4, 4)).expect("valid image")
    }

    fn default_ladder() -> QualityLadder {
        QualityLadder::new(90, 10, 50).expect("valid ladder")
    }

    #[test]
    fn ladder_stops_at_floor() {
        assert_eq!(default_ladder().rungs().collect::<Vec<_>>(), vec![90, 80, 70, 60, 50]);
        assert_eq!(default_ladder().len(), 5);
    }

    #[test]
    fn ladder_with_uneven_step_never_goes_below_floor() {
        let ladder = QualityLadder::new(90, 15, 50).expect("valid ladder");

        assert_eq!(ladder.rungs().collect::<Vec<_>>(), vec![90, 75, 60]);
        assert_eq!(ladder.len(), 3);
    }

    #[test]
    fn ladder_near_zero_does_not_underflow() {
        let ladder = QualityLadder::new(5, 10, 1).expect("valid ladder");
        assert_eq!(ladder.rungs().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn ladder_rejects_invalid_parameters() {
        assert!(QualityLadder::new(90, 0, 50).is_err());
        assert!(QualityLadder::new(40, 10, 50).is_err());
        assert!(QualityLadder::new(120, 10, 50).is_err());
        assert!(QualityLadder::new(90, 10, 0).is_err());
    }

    #[test]
    fn first_rung_within_budget_wins() {
        let backend = SizedBackend::new(1);

        let result = encode_within_budget(&backend, &tiny_image(), &default_ladder(), 100, &|| false)
            .expect("first attempt fits");

        assert_eq!(result.quality, 90);
        assert_eq!(result.attempts, 1);
        assert_eq!(backend.attempted(), vec![90]);
    }

    #[test]
    fn walks_down_until_budget_met() {
        let backend = SizedBackend::new(10);

        let result = encode_within_budget(&backend, &tiny_image(), &default_ladder(), 700, &|| false)
            .expect("quality 70 fits");

        assert_eq!(result.quality, 70);
        assert_eq!(result.len(), 700);
        assert_eq!(backend.attempted(), vec![90, 80, 70]);
    }

    #[test]
    fn budget_exceeded_after_floor_reports_best_size() {
        let backend = SizedBackend::new(10);

        let result = encode_within_budget(&backend, &tiny_image(), &default_ladder(), 100, &|| false);

        match result {
            Err(CompressionError::BudgetExceeded { best_size, byte_budget, quality_floor }) => {
                assert_eq!(best_size, 500);
                assert_eq!(byte_budget, 100);
                assert_eq!(quality_floor, 50);
            }
            other => panic!("expected BudgetExceeded, got {:?}", other),
        }
        assert_eq!(backend.attempted().len(), 5);
    }

    #[test]
    fn encoder_failure_stops_the_ladder() {
        let result = encode_within_budget(&FailingEncoder, &tiny_image(), &default_ladder(), 100, &|| false);

        match result {
            Err(CompressionError::Resampling(msg)) => assert!(msg.contains("90")),
            other => panic!("expected Resampling, got {:?}", other),
        }
    }

    #[test]
    fn cancelled_before_first_rung_encodes_nothing() {
        let backend = SizedBackend::new(1);

        let result = encode_within_budget(&backend, &tiny_image(), &default_ladder(), 100, &|| true);

        assert!(matches!(result, Err(CompressionError::Cancelled)));
        assert!(backend.attempted().is_empty());
    }

    #[test]
    fn cancellation_skips_next_encode() {
        let backend = SizedBackend::new(10);

        let result = encode_within_budget(&backend, &tiny_image(), &default_ladder(), 100, &|| {
            backend.attempted().len() >= 2
        });

        assert!(matches!(result, Err(CompressionError::Cancelled)));
        assert_eq!(backend.attempted(), vec![90, 80]);
    }
}
