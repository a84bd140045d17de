pub mod anvil;
pub mod compression;
pub mod converter;
pub mod error;
pub mod header;
pub mod linear;
pub mod scheduler;
pub mod types;
pub mod utils;
pub mod world;

pub use crate::converter::{convert_region_file, ConvertOptions};
pub use crate::error::ConvertError;
pub use crate::scheduler::{convert_world, BatchConfig, CancelToken};
pub use crate::types::{BatchStatus, Chunk, FileReport, Outcome, Region, Report};

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 区域边长（区块数）
pub const REGION_DIMENSION: usize = 32;

/// 每个区域的区块槽位数
pub const REGION_CHUNKS: usize = REGION_DIMENSION * REGION_DIMENSION;

/// Linear魔数常量，同时出现在文件头和文件尾
pub const LINEAR_SIGNATURE: u64 = 0xc3ff_1318_3cca_9d9a;

/// Linear格式版本号
pub const LINEAR_VERSION: u8 = 1;

/// 默认压缩等级
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

/// 区域文件格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionFormat {
    /// 扇区式的Anvil格式（.mca）
    Anvil,
    /// 整体压缩的Linear格式（.linear）
    Linear,
}

impl RegionFormat {
    /// 文件扩展名（不含点）
    pub fn extension(self) -> &'static str {
        match self {
            RegionFormat::Anvil => "mca",
            RegionFormat::Linear => "linear",
        }
    }

    /// 转换方向上的另一种格式
    pub fn opposite(self) -> Self {
        match self {
            RegionFormat::Anvil => RegionFormat::Linear,
            RegionFormat::Linear => RegionFormat::Anvil,
        }
    }

    /// 根据文件名的扩展名判断格式
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        [RegionFormat::Anvil, RegionFormat::Linear]
            .into_iter()
            .find(|format| format.extension() == extension)
    }
}

impl FromStr for RegionFormat {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "mca" | "anvil" => Ok(RegionFormat::Anvil),
            "linear" => Ok(RegionFormat::Linear),
            _ => Err(ConvertError::UnknownFormat(value.to_string())),
        }
    }
}

impl fmt::Display for RegionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(RegionFormat::from_file_name("r.0.-1.mca"), Some(RegionFormat::Anvil));
        assert_eq!(RegionFormat::from_file_name("r.3.4.linear"), Some(RegionFormat::Linear));
        assert_eq!(RegionFormat::from_file_name("level.dat"), None);
        assert_eq!(RegionFormat::from_file_name("noext"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("MCA".parse::<RegionFormat>().unwrap(), RegionFormat::Anvil);
        assert_eq!(RegionFormat::Anvil.opposite(), RegionFormat::Linear);
        assert!(matches!(
            "zip".parse::<RegionFormat>(),
            Err(ConvertError::UnknownFormat(_))
        ));
    }
}
