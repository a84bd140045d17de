//! Linear（.linear）区域格式。
//!
//! 文件布局：`头部(32) || zstd压缩数据 || 魔数(8)`。解压后的数据为
//! 1024项 `大小(u32) + 时间戳(u32)` 的内部头部，后接按槽位升序
//! 拼接的区块数据。

use crate::{
    compression::{clamp_zstd_level, zstd_compress, zstd_decompress},
    error::ConvertError,
    header::{
        read_footer, read_header, write_footer, write_header, LinearHeader,
        LINEAR_FOOTER_LENGTH, LINEAR_HEADER_LENGTH,
    },
    types::Region,
    utils::parse_region_coords,
    LINEAR_VERSION, REGION_CHUNKS,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::io::Cursor;
use xxhash_rust::xxh64::xxh64;

/// 内部头部长度
pub const INNER_HEADER_LENGTH: usize = REGION_CHUNKS * 8;

/// 内部头部中的一项
#[derive(Debug, Clone, Copy, Default)]
struct SlotEntry {
    size: u32,
    timestamp: u32,
}

fn split_file(data: &[u8]) -> Result<(LinearHeader, &[u8]), ConvertError> {
    if data.len() < LINEAR_HEADER_LENGTH + LINEAR_FOOTER_LENGTH {
        return Err(ConvertError::Truncated(format!(
            "Linear文件至少需要 {} 字节, 实际 {} 字节",
            LINEAR_HEADER_LENGTH + LINEAR_FOOTER_LENGTH,
            data.len()
        )));
    }

    let header = read_header(&mut Cursor::new(data))?;

    let footer_start = data.len() - LINEAR_FOOTER_LENGTH;
    read_footer(&mut Cursor::new(&data[footer_start..]))?;

    Ok((header, &data[LINEAR_HEADER_LENGTH..footer_start]))
}

/// 读取内部头部并校验总大小与区块数量
fn read_inner_header(
    decompressed: &[u8],
    chunk_count: u16,
) -> Result<Vec<SlotEntry>, ConvertError> {
    if decompressed.len() < INNER_HEADER_LENGTH {
        return Err(ConvertError::InvalidDecompressedSize {
            expected: INNER_HEADER_LENGTH,
            actual: decompressed.len(),
        });
    }

    let mut cursor = Cursor::new(decompressed);
    let mut entries = Vec::with_capacity(REGION_CHUNKS);
    let mut total_size = 0usize;
    let mut real_chunk_count = 0u16;

    for _ in 0..REGION_CHUNKS {
        let entry = SlotEntry {
            size: cursor.read_u32::<BigEndian>()?,
            timestamp: cursor.read_u32::<BigEndian>()?,
        };
        total_size += entry.size as usize;
        if entry.size != 0 {
            real_chunk_count += 1;
        }
        entries.push(entry);
    }

    if total_size + INNER_HEADER_LENGTH != decompressed.len() {
        return Err(ConvertError::InvalidDecompressedSize {
            expected: total_size + INNER_HEADER_LENGTH,
            actual: decompressed.len(),
        });
    }

    if real_chunk_count != chunk_count {
        return Err(ConvertError::InvalidChunkCount {
            expected: chunk_count,
            actual: real_chunk_count,
        });
    }

    Ok(entries)
}

/// 解码Linear区域
pub fn decode(data: &[u8], file_name: &str) -> Result<Region, ConvertError> {
    let (region_x, region_z) = parse_region_coords(file_name)?;
    let (header, compressed) = split_file(data)?;

    let decompressed = zstd_decompress(compressed)?;
    let entries = read_inner_header(&decompressed, header.chunk_count)?;

    let mut region = Region::new(region_x, region_z);
    let mut offset = INNER_HEADER_LENGTH;

    for (index, entry) in entries.iter().enumerate() {
        let size = entry.size as usize;
        if size > 0 {
            region.insert(
                index,
                decompressed[offset..offset + size].to_vec(),
                entry.timestamp,
            );
        }
        offset += size;
    }

    Ok(region)
}

/// 编码Linear区域。空载荷的区块无法用大小0表示，按空槽位处理。
pub fn encode(region: &Region, compression_level: i32) -> Result<Vec<u8>, ConvertError> {
    let mut body = Vec::with_capacity(INNER_HEADER_LENGTH);
    let mut newest_timestamp = 0u32;
    let mut chunk_count = 0u16;

    for index in 0..REGION_CHUNKS {
        match region.get(index) {
            Some(chunk) if !chunk.payload.is_empty() => {
                let timestamp = region.timestamp(index);
                body.write_u32::<BigEndian>(chunk.payload.len() as u32)?;
                body.write_u32::<BigEndian>(timestamp)?;
                newest_timestamp = newest_timestamp.max(timestamp);
                chunk_count += 1;
            }
            Some(chunk) => {
                debug!("区块 ({}, {}) 数据为空，按空槽位写入", chunk.x, chunk.z);
                body.write_u64::<BigEndian>(0)?;
            }
            None => body.write_u64::<BigEndian>(0)?,
        }
    }

    for (_, chunk, _) in region.iter() {
        body.extend_from_slice(&chunk.payload);
    }

    let content_hash = xxh64(&body, 0);
    let level = clamp_zstd_level(compression_level);
    let compressed = zstd_compress(&body, level)?;

    let header = LinearHeader {
        version: LINEAR_VERSION,
        newest_timestamp: newest_timestamp as u64,
        compression_level: level as i8,
        chunk_count,
        compressed_length: compressed.len() as u32,
        content_hash,
    };

    let mut data =
        Vec::with_capacity(LINEAR_HEADER_LENGTH + compressed.len() + LINEAR_FOOTER_LENGTH);
    write_header(&mut data, &header)?;
    data.extend_from_slice(&compressed);
    write_footer(&mut data)?;

    Ok(data)
}

/// 完整校验Linear文件：魔数、版本、压缩长度、大小与数量、内容哈希
pub fn verify(data: &[u8]) -> Result<LinearHeader, ConvertError> {
    let (header, compressed) = split_file(data)?;

    if header.compressed_length as usize != compressed.len() {
        return Err(ConvertError::Truncated(format!(
            "头部记录压缩数据 {} 字节, 实际 {} 字节",
            header.compressed_length,
            compressed.len()
        )));
    }

    let decompressed = zstd_decompress(compressed)?;
    read_inner_header(&decompressed, header.chunk_count)?;

    let actual = xxh64(&decompressed, 0);
    if actual != header.content_hash {
        return Err(ConvertError::HashMismatch {
            expected: header.content_hash,
            actual,
        });
    }

    Ok(header)
}

/// 只检查头部与尾部魔数，不解压
pub fn quick_verify(data: &[u8]) -> bool {
    split_file(data).is_ok()
}
