//! # VESTITE 图片压缩 — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与结果输出。
//! 压缩流程见 `compression` 模块。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use vestite_imaging::compression::{
    CompressedUpload, CompressionService, OrientationHint, PipelineConfig, RawCapture,
};
use vestite_imaging::error::AppError;

const USAGE: &str = "\
用法: vestite-compress <INPUT> [选项]

选项:
  -o, --output <FILE>       输出路径（默认 <输入文件名>.compressed.jpg）
      --config <FILE>       JSON 配置文件
      --max-dimension <N>   最长边上限（像素）
      --byte-budget <N>     输出字节上限
      --orientation <1-8>   EXIF 方向值，覆盖图片自带方向
      --camera              按相机拍摄命名（camera_<毫秒>.jpg）
  -h, --help                显示帮助";

/// 命令行参数
#[derive(Debug)]
struct CliArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    max_dimension: Option<u32>,
    byte_budget: Option<usize>,
    orientation: Option<u32>,
    camera: bool,
}

/// 成功时输出到 stdout 的报告
#[derive(Debug, Serialize)]
struct Report<'a> {
    file_name: &'a str,
    output: String,
    width: u32,
    height: u32,
    quality: u8,
    attempts: u32,
    bytes: usize,
}

/// 失败时输出到 stdout 的报告
#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    error: &'a AppError,
    code: &'static str,
}

fn parse_args() -> Result<Option<CliArgs>, AppError> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let usage = |err: pico_args::Error| AppError::Usage(err.to_string());
    let output = args
        .opt_value_from_os_str(["-o", "--output"], |s| Ok::<_, String>(PathBuf::from(s)))
        .map_err(usage)?;
    let config = args
        .opt_value_from_os_str("--config", |s| Ok::<_, String>(PathBuf::from(s)))
        .map_err(usage)?;
    let max_dimension = args.opt_value_from_str("--max-dimension").map_err(usage)?;
    let byte_budget = args.opt_value_from_str("--byte-budget").map_err(usage)?;
    let orientation = args.opt_value_from_str("--orientation").map_err(usage)?;
    let camera = args.contains("--camera");

    let mut free = args.finish().into_iter();
    let input = free
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| AppError::Usage("缺少输入文件".into()))?;
    if let Some(extra) = free.next() {
        return Err(AppError::Usage(format!("多余的参数: {}", extra.to_string_lossy())));
    }

    Ok(Some(CliArgs {
        input,
        output,
        config,
        max_dimension,
        byte_budget,
        orientation,
        camera,
    }))
}

fn load_config(args: &CliArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(max_dimension) = args.max_dimension {
        config.max_dimension = max_dimension;
    }
    if let Some(byte_budget) = args.byte_budget {
        config.byte_budget = byte_budget;
    }
    config.validate()?;
    Ok(config)
}

fn orientation_hint(value: Option<u32>) -> Result<Option<OrientationHint>, AppError> {
    match value {
        None => Ok(None),
        Some(v @ 1..=8) => Ok(Some(OrientationHint::from_exif(v))),
        Some(v) => Err(AppError::Usage(format!("方向值必须在 1-8 之间，实际为 {v}"))),
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}.compressed.jpg"))
}

fn run(args: CliArgs) -> Result<(CompressedUpload, PathBuf), AppError> {
    let config = load_config(&args)?;
    let hint = orientation_hint(args.orientation)?;
    let bytes = std::fs::read(&args.input)?;
    log::info!(
        "读取输入: {} ({:.2} MB)",
        args.input.display(),
        bytes.len() as f64 / 1024.0 / 1024.0
    );

    let mut capture = if args.camera {
        RawCapture::camera(bytes)
    } else {
        let file_name = args
            .input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned());
        RawCapture::gallery(bytes, file_name)
    };
    if let Some(hint) = hint {
        capture = capture.with_orientation(hint);
    }

    let service = CompressionService::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let upload = runtime.block_on(service.compress_capture("cli", capture))?;

    let output = args.output.unwrap_or_else(|| default_output(&args.input));
    std::fs::write(&output, &upload.result.bytes)?;
    Ok((upload, output))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            print_error(&err);
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok((upload, output)) => {
            let report = Report {
                file_name: &upload.file_name,
                output: output.display().to_string(),
                width: upload.result.width,
                height: upload.result.height,
                quality: upload.result.quality,
                attempts: upload.result.attempts,
                bytes: upload.result.len(),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => log::error!("报告序列化失败: {err}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("压缩失败: {err}");
            if let AppError::Compression(inner) = &err {
                eprintln!("{}", inner.user_message());
            }
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &AppError) {
    let report = ErrorReport {
        error: err,
        code: err.code(),
    };
    if let Ok(json) = serde_json::to_string(&report) {
        println!("{json}");
    }
}
