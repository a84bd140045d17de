use thiserror::Error;
use std::io;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("无效的文件签名")]
    InvalidSignature,

    #[error("无效的尾部签名")]
    InvalidFooter,

    #[error("不支持的版本: {0}")]
    UnsupportedVersion(u8),

    #[error("解压后大小无效: 期望 {expected} 字节, 实际 {actual} 字节")]
    InvalidDecompressedSize { expected: usize, actual: usize },

    #[error("区块数量无效: 头部记录 {expected}, 实际 {actual}")]
    InvalidChunkCount { expected: u16, actual: u16 },

    #[error("内容哈希不匹配: 期望 {expected:#018x}, 实际 {actual:#018x}")]
    HashMismatch { expected: u64, actual: u64 },

    #[error("数据被截断: {0}")]
    Truncated(String),

    #[error("无效的区域文件名: {0}")]
    InvalidFileName(String),

    #[error("源文件为空")]
    EmptySource,

    #[error("不支持的压缩类型: {0}")]
    UnsupportedCompression(u8),

    #[error("外部区块文件缺失: {}", .path.display())]
    ExternalFileMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("压缩错误: {0}")]
    Compression(String),

    #[error("解压错误: {0}")]
    Decompression(String),

    #[error("无效的源路径: {}", .0.display())]
    InvalidSource(PathBuf),

    #[error("未找到区域文件夹: {}", .0.display())]
    RegionFolderNotFound(PathBuf),

    #[error("线程池创建失败: {0}")]
    ThreadPool(String),

    #[error("未知的区域格式: {0}")]
    UnknownFormat(String),
}

impl ConvertError {
    /// 容器本身损坏或不兼容
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidSignature
                | ConvertError::InvalidFooter
                | ConvertError::UnsupportedVersion(_)
                | ConvertError::InvalidDecompressedSize { .. }
                | ConvertError::InvalidChunkCount { .. }
                | ConvertError::HashMismatch { .. }
                | ConvertError::Truncated(_)
                | ConvertError::InvalidFileName(_)
                | ConvertError::EmptySource
        )
    }

    /// 整批转换无法开始的配置错误
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidSource(_)
                | ConvertError::RegionFolderNotFound(_)
                | ConvertError::ThreadPool(_)
                | ConvertError::UnknownFormat(_)
        )
    }
}
