use crate::{error::ConvertError, RegionFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// 世界目录的标志文件
pub const WORLD_MARKER: &str = "level.dat";

/// 各维度的区域文件夹（相对世界目录）
pub const DIMENSION_REGION_DIRS: [&str; 3] = ["region", "DIM-1/region", "DIM1/region"];

pub fn is_world_dir(path: &Path) -> bool {
    path.is_dir() && path.join(WORLD_MARKER).exists()
}

pub fn is_region_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(RegionFormat::from_file_name)
            .is_some()
}

/// 世界中存在的区域文件夹（相对路径），一个都没有时报错
pub fn region_dirs(world: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let dirs: Vec<PathBuf> = DIMENSION_REGION_DIRS
        .iter()
        .map(|dir| PathBuf::from(*dir))
        .filter(|relative| world.join(relative).is_dir())
        .collect();

    if dirs.is_empty() {
        return Err(ConvertError::RegionFolderNotFound(world.join("region")));
    }

    Ok(dirs)
}

/// 列出目录中指定格式的区域文件，按文件名排序
pub fn list_region_files(dir: &Path, format: RegionFormat) -> Result<Vec<PathBuf>, ConvertError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(RegionFormat::from_file_name)
            == Some(format);
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_region_dirs() {
        let world = tempdir().unwrap();
        fs::write(world.path().join(WORLD_MARKER), b"").unwrap();
        assert!(is_world_dir(world.path()));
        assert!(matches!(
            region_dirs(world.path()),
            Err(ConvertError::RegionFolderNotFound(_))
        ));

        fs::create_dir_all(world.path().join("region")).unwrap();
        fs::create_dir_all(world.path().join("DIM1/region")).unwrap();
        assert_eq!(
            region_dirs(world.path()).unwrap(),
            vec![PathBuf::from("region"), PathBuf::from("DIM1/region")]
        );
    }

    #[test]
    fn test_list_region_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["r.1.0.mca", "r.0.0.mca", "r.0.0.linear", "c.1.2.mcc", "r.2.0.mca.wip"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = list_region_files(dir.path(), RegionFormat::Anvil).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["r.0.0.mca", "r.1.0.mca"]);

        assert!(is_region_file(&dir.path().join("r.0.0.linear")));
        assert!(!is_region_file(&dir.path().join("c.1.2.mcc")));
    }
}
