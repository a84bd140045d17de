//! Anvil（.mca）区域格式。
//!
//! 文件由4096字节的扇区组成：第0扇区是1024项的位置表，每项4字节，
//! 高24位为起始扇区、低8位为扇区数；第1扇区是1024项大端时间戳。
//! 之后每个区块占用连续的扇区，块头为 `长度(u32) + 压缩类型(u8)`，
//! 长度包含压缩类型字节。超过255个扇区的区块存放在同目录的
//! `c.<x>.<z>.mcc` 文件中，区域内只保留一个占位块。

use crate::{
    compression::{chunk_compression_from_u8, zlib_compress, zlib_decompress, ChunkCompression},
    error::ConvertError,
    types::Region,
    utils::{external_chunk_file_name, parse_region_coords, write_atomic},
    REGION_CHUNKS, REGION_DIMENSION,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

/// 扇区长度
pub const SECTOR_LENGTH: usize = 4096;
/// 位置表与时间戳表占用的扇区数
const HEADER_SECTORS: usize = 2;
/// 位置表中扇区数字段的上限
const MAX_INLINE_SECTORS: usize = 255;
/// 区块块头长度
const CHUNK_HEADER_LENGTH: usize = 5;

/// 位置表中的一项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkLocation {
    pub sector_offset: u32,
    pub sector_count: u8,
}

impl ChunkLocation {
    fn from_raw(value: u32) -> Self {
        Self {
            sector_offset: value >> 8,
            sector_count: (value & 0xFF) as u8,
        }
    }

    fn to_raw(self) -> u32 {
        (self.sector_offset << 8) | self.sector_count as u32
    }

    pub fn is_empty(&self) -> bool {
        self.sector_offset == 0 || self.sector_count == 0
    }
}

/// 需要写到区域文件之外的区块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChunk {
    pub x: i32,
    pub z: i32,
    /// zlib压缩后的数据，无块头
    pub data: Vec<u8>,
}

/// 编码结果
#[derive(Debug, Clone)]
pub struct EncodedRegion {
    pub data: Vec<u8>,
    pub external_chunks: Vec<ExternalChunk>,
}

impl EncodedRegion {
    /// 将外部区块逐个原子写入目标目录
    pub fn write_external_chunks(
        &self,
        directory: &Path,
        modified: Option<SystemTime>,
    ) -> Result<(), ConvertError> {
        for chunk in &self.external_chunks {
            let path = directory.join(external_chunk_file_name(chunk.x, chunk.z));
            debug!("写入外部区块文件: {}", path.display());
            write_atomic(&path, &chunk.data, modified)?;
        }
        Ok(())
    }
}

/// 读取位置表和时间戳表
pub fn read_tables(data: &[u8]) -> Result<(Vec<ChunkLocation>, Vec<u32>), ConvertError> {
    if data.len() < HEADER_SECTORS * SECTOR_LENGTH {
        return Err(ConvertError::Truncated(format!(
            "Anvil文件头需要 {} 字节, 实际 {} 字节",
            HEADER_SECTORS * SECTOR_LENGTH,
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);

    let mut locations = Vec::with_capacity(REGION_CHUNKS);
    for _ in 0..REGION_CHUNKS {
        locations.push(ChunkLocation::from_raw(cursor.read_u32::<BigEndian>()?));
    }

    let mut timestamps = Vec::with_capacity(REGION_CHUNKS);
    for _ in 0..REGION_CHUNKS {
        timestamps.push(cursor.read_u32::<BigEndian>()?);
    }

    Ok((locations, timestamps))
}

/// 解码Anvil区域，外部区块从 `source_dir` 读取
pub fn decode(data: &[u8], file_name: &str, source_dir: &Path) -> Result<Region, ConvertError> {
    let (region_x, region_z) = parse_region_coords(file_name)?;
    let (locations, timestamps) = read_tables(data)?;

    let mut region = Region::new(region_x, region_z);

    for (index, location) in locations.iter().enumerate() {
        if location.is_empty() {
            continue;
        }

        let x = region_x * REGION_DIMENSION as i32 + (index % REGION_DIMENSION) as i32;
        let z = region_z * REGION_DIMENSION as i32 + (index / REGION_DIMENSION) as i32;

        let payload = read_chunk(data, *location, x, z, source_dir)?;
        region.insert(index, payload, timestamps[index]);
    }

    Ok(region)
}

fn read_chunk(
    data: &[u8],
    location: ChunkLocation,
    x: i32,
    z: i32,
    source_dir: &Path,
) -> Result<Vec<u8>, ConvertError> {
    if (location.sector_offset as usize) < HEADER_SECTORS {
        return Err(ConvertError::Truncated(format!(
            "区块 ({}, {}) 的起始扇区 {} 落在文件头内",
            x, z, location.sector_offset
        )));
    }

    let start = location.sector_offset as usize * SECTOR_LENGTH;
    if start + CHUNK_HEADER_LENGTH > data.len() {
        return Err(ConvertError::Truncated(format!(
            "区块 ({}, {}) 的起始扇区 {} 超出文件范围",
            x, z, location.sector_offset
        )));
    }

    let mut cursor = Cursor::new(&data[start..]);
    let length = cursor.read_u32::<BigEndian>()? as usize;
    let compression = chunk_compression_from_u8(cursor.read_u8()?)?;

    match compression {
        ChunkCompression::Zlib => {
            let end = start + 4 + length;
            if length == 0 || end > data.len() {
                return Err(ConvertError::Truncated(format!(
                    "区块 ({}, {}) 声明长度 {} 超出文件范围",
                    x, z, length
                )));
            }
            zlib_decompress(&data[start + CHUNK_HEADER_LENGTH..end])
        }
        ChunkCompression::ZlibExternal => {
            let path = source_dir.join(external_chunk_file_name(x, z));
            debug!("读取外部区块文件: {}", path.display());
            let compressed = fs::read(&path)
                .map_err(|source| ConvertError::ExternalFileMissing { path, source })?;
            zlib_decompress(&compressed)
        }
    }
}

fn pad_to_sector(block: &mut Vec<u8>) {
    let remainder = block.len() % SECTOR_LENGTH;
    if remainder != 0 {
        block.resize(block.len() + SECTOR_LENGTH - remainder, 0);
    }
}

fn chunk_block(compression: ChunkCompression, compressed: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut block = Vec::with_capacity(compressed.len() + CHUNK_HEADER_LENGTH + SECTOR_LENGTH);
    block.write_u32::<BigEndian>(compressed.len() as u32 + 1)?;
    block.write_u8(compression as u8)?;
    block.extend_from_slice(compressed);
    pad_to_sector(&mut block);
    Ok(block)
}

/// 编码Anvil区域。
///
/// 扇区按槽位升序从第2扇区开始依次分配，不做碎片查找。
pub fn encode(region: &Region, compression_level: i32) -> Result<EncodedRegion, ConvertError> {
    let mut locations = vec![ChunkLocation::default(); REGION_CHUNKS];
    let mut body = Vec::new();
    let mut external_chunks = Vec::new();
    let mut free_sector = HEADER_SECTORS;

    for (index, chunk, _) in region.iter() {
        let compressed = zlib_compress(&chunk.payload, compression_level)?;
        let mut block = chunk_block(ChunkCompression::Zlib, &compressed)?;

        if block.len() / SECTOR_LENGTH > MAX_INLINE_SECTORS {
            debug!(
                "区块 ({}, {}) 占用 {} 个扇区，写入外部文件",
                chunk.x,
                chunk.z,
                block.len() / SECTOR_LENGTH
            );
            block = chunk_block(ChunkCompression::ZlibExternal, &[])?;
            external_chunks.push(ExternalChunk {
                x: chunk.x,
                z: chunk.z,
                data: compressed,
            });
        }

        let sector_count = block.len() / SECTOR_LENGTH;
        locations[index] = ChunkLocation {
            sector_offset: free_sector as u32,
            sector_count: sector_count as u8,
        };
        free_sector += sector_count;
        body.extend_from_slice(&block);
    }

    let mut data = Vec::with_capacity(HEADER_SECTORS * SECTOR_LENGTH + body.len());
    for location in &locations {
        data.write_u32::<BigEndian>(location.to_raw())?;
    }
    for index in 0..REGION_CHUNKS {
        data.write_u32::<BigEndian>(region.timestamp(index))?;
    }
    data.extend_from_slice(&body);

    Ok(EncodedRegion {
        data,
        external_chunks,
    })
}
