use crate::{
    converter::{convert_region_file, ConvertOptions},
    error::ConvertError,
    types::{BatchStatus, FileReport, Outcome, Report},
    world::{is_region_file, is_world_dir, list_region_files, region_dirs},
    RegionFormat, DEFAULT_COMPRESSION_LEVEL,
};
use log::{info, warn};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// 批量转换配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub target: RegionFormat,
    pub threads: usize,
    pub compression_level: i32,
    pub overwrite: bool,
}

impl BatchConfig {
    /// 默认线程数为物理核心数
    pub fn new(target: RegionFormat) -> Self {
        Self {
            target,
            threads: num_cpus::get_physical().max(1),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            overwrite: false,
        }
    }

    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            compression_level: self.compression_level,
            overwrite: self.overwrite,
        }
    }
}

/// 取消标志，工作线程在每个文件开始前检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Job {
    source: PathBuf,
    destination_dir: PathBuf,
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Job {
    fn file_name(&self) -> String {
        file_name_lossy(&self.source)
    }

    fn run(&self, target: RegionFormat, options: &ConvertOptions, cancel: &CancelToken) -> FileReport {
        let outcome = if cancel.is_cancelled() {
            Outcome::Cancelled
        } else {
            convert_region_file(&self.source, &self.destination_dir, target, options)
        };

        FileReport {
            file_name: self.file_name(),
            outcome,
        }
    }

    fn cancelled(&self) -> FileReport {
        FileReport {
            file_name: self.file_name(),
            outcome: Outcome::Cancelled,
        }
    }
}

/// 转换单个区域文件或整个世界。
///
/// `destination` 为空时就地转换。配置错误（路径无效、没有区域文件夹）
/// 在开始前直接返回；单个文件的失败记录在报告中。
pub fn convert_world(
    source: &Path,
    destination: Option<&Path>,
    config: &BatchConfig,
    cancel: &CancelToken,
) -> Result<Report, ConvertError> {
    let source_format = config.target.opposite();

    if is_region_file(source) {
        if RegionFormat::from_file_name(&file_name_lossy(source)) != Some(source_format) {
            return Err(ConvertError::InvalidSource(source.to_path_buf()));
        }

        let destination_dir = match destination {
            Some(dir) => dir.to_path_buf(),
            None => source.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        };
        let job = Job {
            source: source.to_path_buf(),
            destination_dir,
        };

        let mut report = Report::new(config.target);
        report.push(job.run(config.target, &config.options(), cancel));
        return Ok(finish(report, cancel));
    }

    if !is_world_dir(source) {
        return Err(ConvertError::InvalidSource(source.to_path_buf()));
    }

    let mut jobs = Vec::new();
    for relative in region_dirs(source)? {
        let source_dir = source.join(&relative);
        let destination_dir = match destination {
            Some(dir) => dir.join(&relative),
            None => source_dir.clone(),
        };
        fs::create_dir_all(&destination_dir)?;

        for file in list_region_files(&source_dir, source_format)? {
            jobs.push(Job {
                source: file,
                destination_dir: destination_dir.clone(),
            });
        }
    }

    run_jobs(&jobs, config, cancel)
}

fn run_jobs(jobs: &[Job], config: &BatchConfig, cancel: &CancelToken) -> Result<Report, ConvertError> {
    let threads = config.threads.max(1);
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("region-worker-{}", index))
        .build()
        .map_err(|e| ConvertError::ThreadPool(e.to_string()))?;

    info!(
        "开始转换 {} 个区域文件到 {} 格式, 线程数 {}",
        jobs.len(),
        config.target,
        threads
    );

    let options = config.options();
    let target = config.target;
    // 接收端活到作用域结束之后，发送不会失败
    let (sender, receiver) = mpsc::channel();

    pool.scope(|scope| {
        for job in jobs {
            // 取消后不再派发新任务
            if cancel.is_cancelled() {
                let _ = sender.send(job.cancelled());
                continue;
            }

            let sender = sender.clone();
            scope.spawn(move |_| {
                let _ = sender.send(job.run(target, &options, cancel));
            });
        }
    });
    drop(sender);

    let mut report = Report::new(target);
    for file in receiver {
        report.push(file);
    }

    Ok(finish(report, cancel))
}

fn finish(mut report: Report, cancel: &CancelToken) -> Report {
    if cancel.is_cancelled() {
        warn!(
            "转换已取消: 完成 {} 个, 取消 {} 个",
            report.converted() + report.skipped(),
            report.cancelled()
        );
        report.status = BatchStatus::Cancelled;
    }

    if let Some(ratio) = report.compression_ratio() {
        info!(
            "总计 {} 字节 -> {} 字节, 压缩率 {:.2}%",
            report.total_source_bytes,
            report.total_destination_bytes,
            ratio * 100.0
        );
    }

    report
}
