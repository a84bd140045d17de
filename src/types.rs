use crate::{RegionFormat, REGION_CHUNKS, REGION_DIMENSION};
use serde::Serialize;
use std::time::SystemTime;

/// 区块数据（序列化后的原始字节，不做解析）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub x: i32,
    pub z: i32,
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn new(x: i32, z: i32, payload: Vec<u8>) -> Self {
        Self { x, z, payload }
    }
}

/// 区域内的槽位索引
pub fn chunk_index(local_x: usize, local_z: usize) -> usize {
    debug_assert!(local_x < REGION_DIMENSION, "区域内x坐标越界");
    debug_assert!(local_z < REGION_DIMENSION, "区域内z坐标越界");

    local_x + local_z * REGION_DIMENSION
}

/// 32x32的区块网格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub z: i32,
    chunks: Vec<Option<Chunk>>,
    timestamps: Vec<u32>,
    /// 源文件的修改时间，写入目标文件时沿用
    pub modified: Option<SystemTime>,
}

impl Region {
    pub fn new(x: i32, z: i32) -> Self {
        Self {
            x,
            z,
            chunks: vec![None; REGION_CHUNKS],
            timestamps: vec![0; REGION_CHUNKS],
            modified: None,
        }
    }

    /// 在指定槽位放入区块，绝对坐标由区域坐标推算。
    ///
    /// `index` 必须小于 [`REGION_CHUNKS`]，越界会panic。
    pub fn insert(&mut self, index: usize, payload: Vec<u8>, timestamp: u32) {
        debug_assert!(index < REGION_CHUNKS, "槽位索引越界: {}", index);

        let local_x = (index % REGION_DIMENSION) as i32;
        let local_z = (index / REGION_DIMENSION) as i32;
        let chunk = Chunk::new(
            self.x * REGION_DIMENSION as i32 + local_x,
            self.z * REGION_DIMENSION as i32 + local_z,
            payload,
        );
        self.chunks[index] = Some(chunk);
        self.timestamps[index] = timestamp;
    }

    pub fn remove(&mut self, index: usize) -> Option<Chunk> {
        self.timestamps[index] = 0;
        self.chunks[index].take()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index).and_then(Option::as_ref)
    }

    /// 空槽位的时间戳恒为0
    pub fn timestamp(&self, index: usize) -> u32 {
        self.timestamps[index]
    }

    /// 按槽位升序遍历已占用的区块
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Chunk, u32)> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(move |(index, chunk)| {
                chunk.as_ref().map(|chunk| (index, chunk, self.timestamps[index]))
            })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_some()).count()
    }

    pub fn newest_timestamp(&self) -> u32 {
        self.iter().map(|(_, _, timestamp)| timestamp).max().unwrap_or(0)
    }
}

/// 单个文件的转换结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Converted { source_bytes: u64, destination_bytes: u64 },
    Skipped,
    Failed { reason: String },
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Converted { .. } | Outcome::Skipped)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Cancelled,
}

/// 整批转换的汇总
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub target: RegionFormat,
    pub status: BatchStatus,
    pub files: Vec<FileReport>,
    pub total_source_bytes: u64,
    pub total_destination_bytes: u64,
}

impl Report {
    pub fn new(target: RegionFormat) -> Self {
        Self {
            target,
            status: BatchStatus::Completed,
            files: Vec::new(),
            total_source_bytes: 0,
            total_destination_bytes: 0,
        }
    }

    /// 记录一个结果，字节数只累加实际转换的文件
    pub fn push(&mut self, file: FileReport) {
        if let Outcome::Converted { source_bytes, destination_bytes } = file.outcome {
            self.total_source_bytes += source_bytes;
            self.total_destination_bytes += destination_bytes;
        }
        self.files.push(file);
    }

    pub fn converted(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Converted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Cancelled))
    }

    /// 目标为Linear时的整体压缩比（目标字节 / 源字节）
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.target != RegionFormat::Linear || self.total_source_bytes == 0 {
            return None;
        }
        Some(self.total_destination_bytes as f64 / self.total_source_bytes as f64)
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.files.iter().filter(|file| predicate(&file.outcome)).count()
    }
}
