use clap::{ArgAction, Parser, Subcommand};
use linear_region::{
    convert_world, linear, BatchConfig, CancelToken, ConvertError, RegionFormat,
    DEFAULT_COMPRESSION_LEVEL,
};
use log::LevelFilter;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

/// Linear区域格式工具 - Minecraft世界在Anvil与Linear格式之间转换
#[derive(Parser)]
#[command(name = "linear-tools", author, version, about, long_about = None)]
struct Cli {
    /// 输出详细程度（可重复）
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 转换区域文件或整个世界
    Convert {
        /// 目标格式: mca, linear
        format: String,

        /// 世界目录或单个区域文件
        path: PathBuf,

        /// 输出目录（默认就地转换）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 线程数，0表示物理核心数
        #[arg(short, long, default_value_t = 0)]
        threads: usize,

        /// 压缩等级（zlib 0-9, zstd 1-22）
        #[arg(short, long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        compression_level: i32,

        /// 覆盖已存在的目标文件
        #[arg(long)]
        overwrite: bool,

        /// 将转换报告写入JSON文件
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// 完整校验Linear文件
    Verify {
        /// Linear文件路径
        file: PathBuf,
    },

    /// 查看区域文件信息
    Info {
        /// 区域文件路径（.mca 或 .linear）
        file: PathBuf,
    },
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), ConvertError> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Convert {
            format,
            path,
            output,
            threads,
            compression_level,
            overwrite,
            report,
        } => {
            let target: RegionFormat = format.parse()?;

            if !path.exists() {
                return Err(ConvertError::InvalidSource(path));
            }
            if let Some(output) = &output {
                fs::create_dir_all(output)?;
            }

            let mut config = BatchConfig::new(target);
            if threads > 0 {
                config.threads = threads;
            }
            config.compression_level = compression_level;
            config.overwrite = overwrite;

            let summary = convert_world(&path, output.as_deref(), &config, &CancelToken::new())?;

            println!(
                "转换完成: 成功 {}, 跳过 {}, 失败 {}",
                summary.converted(),
                summary.skipped(),
                summary.failed()
            );
            if let Some(ratio) = summary.compression_ratio() {
                println!(
                    "总大小: {} -> {} 字节 ({:.2}%)",
                    summary.total_source_bytes,
                    summary.total_destination_bytes,
                    ratio * 100.0
                );
            }
            for file in summary.files.iter().filter(|file| !file.outcome.is_success()) {
                eprintln!("  {}: {:?}", file.file_name, file.outcome);
            }

            if let Some(report) = report {
                let writer = BufWriter::new(File::create(&report)?);
                serde_json::to_writer_pretty(writer, &summary)
                    .map_err(|e| ConvertError::Io(e.into()))?;
                println!("报告已写入: {}", report.display());
            }

            Ok(())
        }

        Commands::Verify { file } => {
            let data = fs::read(&file)?;
            match linear::verify(&data) {
                Ok(header) => {
                    println!("{}: 校验通过", file.display());
                    println!("  区块数量: {}", header.chunk_count);
                    println!("  压缩等级: {}", header.compression_level);
                    println!("  内容哈希: {:#018x}", header.content_hash);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{}: 校验失败: {}", file.display(), e);
                    Err(e)
                }
            }
        }

        Commands::Info { file } => {
            let region = RegionFormat::open(&file)?;

            println!("=== 区域文件信息 ===");
            println!("文件: {}", file.display());
            println!("区域坐标: ({}, {})", region.x, region.z);
            println!("区块数量: {}", region.chunk_count());
            println!("最新时间戳: {}", region.newest_timestamp());

            let total: usize = region.iter().map(|(_, chunk, _)| chunk.payload.len()).sum();
            println!("区块数据总大小: {} 字节", total);

            Ok(())
        }
    }
}
