use crate::{
    anvil,
    error::ConvertError,
    linear,
    types::{Outcome, Region},
    utils::{destination_file_name, file_name_of, modified_time, write_atomic},
    RegionFormat, DEFAULT_COMPRESSION_LEVEL,
};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

/// 单个文件的转换参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub compression_level: i32,
    /// 为真时先删除已存在的目标文件
    pub overwrite: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            overwrite: false,
        }
    }
}

impl RegionFormat {
    /// 解码该格式的区域数据，Anvil的外部区块从 `source_dir` 读取
    pub fn decode(
        self,
        data: &[u8],
        file_name: &str,
        source_dir: &Path,
    ) -> Result<Region, ConvertError> {
        match self {
            RegionFormat::Anvil => anvil::decode(data, file_name, source_dir),
            RegionFormat::Linear => linear::decode(data, file_name),
        }
    }

    /// 编码并原子写入 `destination`，返回写入的区域文件字节数
    pub fn write(
        self,
        region: &Region,
        destination: &Path,
        compression_level: i32,
    ) -> Result<u64, ConvertError> {
        match self {
            RegionFormat::Anvil => {
                let encoded = anvil::encode(region, compression_level)?;
                let directory = destination.parent().unwrap_or_else(|| Path::new("."));
                // 外部区块先于区域文件落盘，区域文件可见时引用的 .mcc 一定已存在
                encoded.write_external_chunks(directory, region.modified)?;

                if let Err(e) = write_atomic(destination, &encoded.data, region.modified) {
                    if !encoded.external_chunks.is_empty() {
                        warn!(
                            "区域文件 {} 写入失败, 已写入的 {} 个外部区块文件留在 {}",
                            destination.display(),
                            encoded.external_chunks.len(),
                            directory.display()
                        );
                    }
                    return Err(e);
                }
                Ok(encoded.data.len() as u64)
            }
            RegionFormat::Linear => {
                let data = linear::encode(region, compression_level)?;
                write_atomic(destination, &data, region.modified)?;
                Ok(data.len() as u64)
            }
        }
    }

    /// 按扩展名打开区域文件
    pub fn open(path: &Path) -> Result<Region, ConvertError> {
        let file_name = file_name_of(path)?;
        let format = RegionFormat::from_file_name(file_name)
            .ok_or_else(|| ConvertError::InvalidFileName(file_name.to_string()))?;
        let source_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let data = fs::read(path)?;
        let mut region = format.decode(&data, file_name, source_dir)?;
        region.modified = Some(modified_time(path)?);
        Ok(region)
    }
}

/// 将单个区域文件转换为 `target` 格式写入 `destination_dir`。
///
/// 任何错误都在此处记录并转为 [`Outcome::Failed`]，不会影响同批的其他文件。
pub fn convert_region_file(
    source: &Path,
    destination_dir: &Path,
    target: RegionFormat,
    options: &ConvertOptions,
) -> Outcome {
    match try_convert(source, destination_dir, target, options) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("区域文件 {} 转换失败: {}", source.display(), e);
            Outcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn try_convert(
    source: &Path,
    destination_dir: &Path,
    target: RegionFormat,
    options: &ConvertOptions,
) -> Result<Outcome, ConvertError> {
    let file_name = file_name_of(source)?;
    let destination = destination_dir.join(destination_file_name(file_name, target)?);

    if options.overwrite && destination.exists() {
        debug!("删除已存在的目标文件: {}", destination.display());
        fs::remove_file(&destination)?;
    }

    let metadata = fs::metadata(source)?;
    let source_bytes = metadata.len();
    let source_modified = metadata.modified()?;

    if source_bytes == 0 {
        return Err(ConvertError::EmptySource);
    }

    if destination.exists() && modified_time(&destination)? == source_modified {
        debug!("{} 未变化，跳过", file_name);
        return Ok(Outcome::Skipped);
    }

    let data = fs::read(source)?;
    let source_dir = source.parent().unwrap_or_else(|| Path::new("."));

    let mut region = target.opposite().decode(&data, file_name, source_dir)?;
    region.modified = Some(source_modified);

    let destination_bytes = target.write(&region, &destination, options.compression_level)?;

    info!(
        "{} 转换完成, 压缩率 {:.2}%",
        file_name,
        100.0 * destination_bytes as f64 / source_bytes as f64
    );

    Ok(Outcome::Converted {
        source_bytes,
        destination_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk_index;
    use crate::utils::wip_path;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn write_anvil_source(dir: &Path, name: &str) -> std::path::PathBuf {
        let mut region = Region::new(0, 0);
        region.insert(chunk_index(0, 0), vec![1, 2, 3], 1000);
        region.insert(chunk_index(1, 0), vec![5; 2048], 1001);
        region.modified = Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_650_000_000));

        let path = dir.join(name);
        RegionFormat::Anvil.write(&region, &path, 6).unwrap();
        path
    }

    #[test]
    fn test_convert_then_skip_when_unchanged() {
        let source_dir = tempdir().unwrap();
        let destination_dir = tempdir().unwrap();
        let source = write_anvil_source(source_dir.path(), "r.0.0.mca");
        let options = ConvertOptions::default();

        let first = convert_region_file(&source, destination_dir.path(), RegionFormat::Linear, &options);
        assert!(matches!(first, Outcome::Converted { .. }));

        let destination = destination_dir.path().join("r.0.0.linear");
        assert_eq!(
            modified_time(&destination).unwrap(),
            modified_time(&source).unwrap()
        );
        assert!(!wip_path(&destination).exists());

        let second = convert_region_file(&source, destination_dir.path(), RegionFormat::Linear, &options);
        assert_eq!(second, Outcome::Skipped);
    }

    #[test]
    fn test_overwrite_always_rewrites() {
        let source_dir = tempdir().unwrap();
        let destination_dir = tempdir().unwrap();
        let source = write_anvil_source(source_dir.path(), "r.0.0.mca");
        let options = ConvertOptions {
            overwrite: true,
            ..ConvertOptions::default()
        };

        for _ in 0..2 {
            let outcome =
                convert_region_file(&source, destination_dir.path(), RegionFormat::Linear, &options);
            assert!(matches!(outcome, Outcome::Converted { .. }));
        }
    }

    #[test]
    fn test_linear_back_to_anvil() {
        let dir = tempdir().unwrap();
        let source = write_anvil_source(dir.path(), "r.0.0.mca");
        let original = RegionFormat::open(&source).unwrap();

        let options = ConvertOptions::default();
        let linear_dir = tempdir().unwrap();
        convert_region_file(&source, linear_dir.path(), RegionFormat::Linear, &options);

        let anvil_dir = tempdir().unwrap();
        let outcome = convert_region_file(
            &linear_dir.path().join("r.0.0.linear"),
            anvil_dir.path(),
            RegionFormat::Anvil,
            &options,
        );
        assert!(matches!(outcome, Outcome::Converted { .. }));

        let restored = RegionFormat::open(&anvil_dir.path().join("r.0.0.mca")).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_empty_source_fails() {
        let source_dir = tempdir().unwrap();
        let destination_dir = tempdir().unwrap();
        let source = source_dir.path().join("r.0.0.mca");
        fs::write(&source, b"").unwrap();

        let outcome = convert_region_file(
            &source,
            destination_dir.path(),
            RegionFormat::Linear,
            &ConvertOptions::default(),
        );
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert!(!destination_dir.path().join("r.0.0.linear").exists());
    }

    #[test]
    fn test_corrupted_source_leaves_no_destination() {
        let source_dir = tempdir().unwrap();
        let destination_dir = tempdir().unwrap();
        let source = source_dir.path().join("r.0.0.linear");
        fs::write(&source, vec![0xAB; 256]).unwrap();

        let outcome = convert_region_file(
            &source,
            destination_dir.path(),
            RegionFormat::Anvil,
            &ConvertOptions::default(),
        );
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert!(fs::read_dir(destination_dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_failed_region_write_keeps_external_chunks() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("r.0.0.mca");
        // 目标路径被目录占用，重命名必然失败
        fs::create_dir(&destination).unwrap();

        let mut region = Region::new(0, 0);
        region.insert(chunk_index(1, 1), vec![3u8; 1_100_000], 5);

        let result = RegionFormat::Anvil.write(&region, &destination, 0);
        assert!(matches!(result, Err(ConvertError::Io(_))));
        assert!(destination.is_dir());
        assert!(dir.path().join("c.1.1.mcc").exists());
    }

    #[test]
    fn test_wrong_source_extension_fails() {
        let dir = tempdir().unwrap();
        let source = write_anvil_source(dir.path(), "r.0.0.mca");

        let outcome =
            convert_region_file(&source, dir.path(), RegionFormat::Anvil, &ConvertOptions::default());
        assert!(matches!(outcome, Outcome::Failed { .. }));
    }
}
