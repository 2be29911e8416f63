//! # 服务层（异步调度）
//!
//! ## 设计思路
//!
//! 压缩是纯 CPU 的同步计算，不能阻塞调用方所在的异步运行时：
//! 1. 整条流水线通过 `spawn_blocking` 放到阻塞线程执行
//! 2. 可选的单槽队列（`Semaphore(1)`）串行化多次调用，限制多张大图同时解码的峰值内存
//! 3. 每个请求登记一个取消标志，取消只在两次编码之间生效
//! 4. 登记由 `InFlightGuard` 持有：调用方丢弃 future（超时、`select!`、abort）时
//!    自动置位取消标志并注销，后台线程在下一级质量前停止
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `compress_capture`：执行完整压缩并生成上传文件名
//! - `cancel`：取消进行中的请求
//! - `config_snapshot` / `set_config`：读取、替换配置

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Semaphore;

use super::{
    CompressedUpload, CompressionError, ImageBackend, ImageCompressor, PipelineConfig,
    RasterBackend, RawCapture,
};

/// 图片压缩服务。
pub struct CompressionService<B = RasterBackend> {
    compressor: Arc<ImageCompressor<B>>,
    config: RwLock<PipelineConfig>,
    slot: Option<Arc<Semaphore>>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl CompressionService<RasterBackend> {
    /// 使用默认图片能力创建服务，调用串行执行。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use vestite_imaging::compression::{CompressionService, PipelineConfig, RawCapture};
    ///
    /// # async fn demo() -> Result<(), vestite_imaging::compression::CompressionError> {
    /// let service = CompressionService::new(PipelineConfig::default())?;
    /// let bytes = std::fs::read("photo.jpg").expect("read photo");
    /// let upload = service.compress_capture("req-1", RawCapture::camera(bytes)).await?;
    /// println!("{} {} bytes", upload.file_name, upload.result.len());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: PipelineConfig) -> Result<Self, CompressionError> {
        Self::with_backend(RasterBackend::new(), config, true)
    }
}

impl<B: ImageBackend + 'static> CompressionService<B> {
    /// 使用自定义图片能力创建服务。
    ///
    /// `serialize` 为 `true` 时同一时刻只运行一次压缩。
    pub fn with_backend(
        backend: B,
        config: PipelineConfig,
        serialize: bool,
    ) -> Result<Self, CompressionError> {
        config.validate()?;

        Ok(Self {
            compressor: Arc::new(ImageCompressor::with_backend(backend)),
            config: RwLock::new(config),
            slot: serialize.then(|| Arc::new(Semaphore::new(1))),
            cancel_flags: Mutex::new(HashMap::new()),
        })
    }

    /// 获取配置快照，保证单次请求使用一致参数。
    pub fn config_snapshot(&self) -> Result<PipelineConfig, CompressionError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| CompressionError::InvalidConfig("配置读取锁已中毒".to_string()))
    }

    /// 替换配置；进行中的请求继续使用旧快照。
    pub fn set_config(&self, config: PipelineConfig) -> Result<(), CompressionError> {
        config.validate()?;

        let mut guard = self
            .config
            .write()
            .map_err(|_| CompressionError::InvalidConfig("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已更新压缩配置（max_dim={}, budget={}, quality={}→{} step {}）",
            config.max_dimension,
            config.byte_budget,
            config.start_quality,
            config.quality_floor,
            config.quality_step
        );
        *guard = config;

        Ok(())
    }

    /// 取消进行中的请求；请求不存在时返回 `false`。
    pub fn cancel(&self, request_id: &str) -> Result<bool, CompressionError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| CompressionError::Resampling("取消标志锁已中毒".to_string()))?;

        match guard.get(request_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                log::info!("⏹️ 已请求取消压缩：{}", request_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 是否有该请求正在排队或执行。
    pub fn is_in_flight(&self, request_id: &str) -> bool {
        self.cancel_flags
            .lock()
            .map(|guard| guard.contains_key(request_id))
            .unwrap_or(false)
    }

    /// 执行完整压缩流程，并生成交给上传协作方的文件名。
    ///
    /// 同一 `request_id` 同时只能有一个请求在途，重复登记返回 `DuplicateRequest`。
    pub async fn compress_capture(
        &self,
        request_id: &str,
        capture: RawCapture,
    ) -> Result<CompressedUpload, CompressionError> {
        let config = self.config_snapshot()?;
        let guard = InFlightGuard::register(&self.cancel_flags, request_id)?;

        self.run_capture(capture, config, Arc::clone(&guard.flag)).await
    }

    async fn run_capture(
        &self,
        capture: RawCapture,
        config: PipelineConfig,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<CompressedUpload, CompressionError> {
        let permit = match &self.slot {
            Some(slot) => Some(
                Arc::clone(slot)
                    .acquire_owned()
                    .await
                    .map_err(|_| CompressionError::Resampling("压缩队列已关闭".to_string()))?,
            ),
            None => None,
        };

        if cancel_flag.load(Ordering::SeqCst) {
            return Err(CompressionError::Cancelled);
        }

        let file_name = capture.source.upload_file_name();
        let compressor = Arc::clone(&self.compressor);

        // 许可随工作线程一起释放，调用方提前放弃时队列仍保持串行。
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let RawCapture { bytes, orientation, .. } = capture;
            compressor.compress_with_cancel(&bytes, orientation, &config, &|| {
                cancel_flag.load(Ordering::SeqCst)
            })
        })
        .await
        .map_err(|e| CompressionError::Resampling(format!("压缩工作线程异常：{}", e)))??;

        Ok(CompressedUpload { file_name, result })
    }
}

/// 在途请求登记。
///
/// 析构时置位取消标志并注销，仅移除属于自己的那一项。
struct InFlightGuard<'a> {
    flags: &'a Mutex<HashMap<String, Arc<AtomicBool>>>,
    request_id: String,
    flag: Arc<AtomicBool>,
}

impl<'a> InFlightGuard<'a> {
    fn register(
        flags: &'a Mutex<HashMap<String, Arc<AtomicBool>>>,
        request_id: &str,
    ) -> Result<Self, CompressionError> {
        let mut guard = flags
            .lock()
            .map_err(|_| CompressionError::Resampling("取消标志锁已中毒".to_string()))?;

        if guard.contains_key(request_id) {
            return Err(CompressionError::DuplicateRequest(request_id.to_string()));
        }

        let flag = Arc::new(AtomicBool::new(false));
        guard.insert(request_id.to_string(), Arc::clone(&flag));

        Ok(Self {
            flags,
            request_id: request_id.to_string(),
            flag,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::SeqCst);

        match self.flags.lock() {
            Ok(mut guard) => {
                if guard
                    .get(&self.request_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &self.flag))
                {
                    guard.remove(&self.request_id);
                }
            }
            Err(_) => log::warn!("⚠️ 取消标志锁已中毒，未能清理请求：{}", self.request_id),
        }
    }
}
