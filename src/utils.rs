use crate::{error::ConvertError, RegionFormat};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 写入中的临时文件后缀
pub const WIP_SUFFIX: &str = ".wip";

/// 从 r.<rx>.<rz>.<ext> 形式的文件名中解析区域坐标
pub fn parse_region_coords(file_name: &str) -> Result<(i32, i32), ConvertError> {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() < 4 {
        return Err(ConvertError::InvalidFileName(file_name.to_string()));
    }

    let x = parts[1]
        .parse::<i32>()
        .map_err(|_| ConvertError::InvalidFileName(file_name.to_string()))?;
    let z = parts[2]
        .parse::<i32>()
        .map_err(|_| ConvertError::InvalidFileName(file_name.to_string()))?;

    Ok((x, z))
}

/// 将源文件名的扩展名替换为目标格式的扩展名
pub fn destination_file_name(file_name: &str, target: RegionFormat) -> Result<String, ConvertError> {
    let source_extension = format!(".{}", target.opposite().extension());
    let stem = file_name
        .strip_suffix(&source_extension)
        .ok_or_else(|| ConvertError::InvalidFileName(file_name.to_string()))?;

    Ok(format!("{}.{}", stem, target.extension()))
}

/// 外部区块文件名
pub fn external_chunk_file_name(x: i32, z: i32) -> String {
    format!("c.{}.{}.mcc", x, z)
}

/// 获取路径的文件名
pub fn file_name_of(path: &Path) -> Result<&str, ConvertError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ConvertError::InvalidFileName(path.display().to_string()))
}

/// 目标文件旁的临时文件路径
pub fn wip_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(WIP_SUFFIX);
    PathBuf::from(name)
}

/// 文件修改时间
pub fn modified_time(path: &Path) -> Result<SystemTime, ConvertError> {
    Ok(fs::metadata(path)?.modified()?)
}

/// 先写入 <path>.wip，设置修改时间后再重命名到最终路径，
/// 目标路径上不会出现写了一半的文件
pub fn write_atomic(
    path: &Path,
    data: &[u8],
    modified: Option<SystemTime>,
) -> Result<(), ConvertError> {
    let wip = wip_path(path);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&wip)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    if let Some(modified) = modified {
        file.set_modified(modified)?;
    }
    file.sync_all()?;
    drop(file);

    fs::rename(&wip, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_parse_region_coords() {
        assert_eq!(parse_region_coords("r.0.0.mca").unwrap(), (0, 0));
        assert_eq!(parse_region_coords("r.-3.12.linear").unwrap(), (-3, 12));
        assert!(matches!(
            parse_region_coords("r.a.0.mca"),
            Err(ConvertError::InvalidFileName(_))
        ));
        assert!(parse_region_coords("r.0.mca").is_err());
    }

    #[test]
    fn test_destination_file_name() {
        assert_eq!(
            destination_file_name("r.1.-2.mca", RegionFormat::Linear).unwrap(),
            "r.1.-2.linear"
        );
        assert_eq!(
            destination_file_name("r.1.-2.linear", RegionFormat::Anvil).unwrap(),
            "r.1.-2.mca"
        );
        assert!(destination_file_name("r.1.-2.linear", RegionFormat::Linear).is_err());
    }

    #[test]
    fn test_write_atomic_sets_mtime_and_leaves_no_wip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.0.0.linear");
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);

        write_atomic(&path, b"region", Some(modified)).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"region");
        assert_eq!(modified_time(&path).unwrap(), modified);
        assert!(!wip_path(&path).exists());
    }
}
