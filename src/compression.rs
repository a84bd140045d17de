use crate::error::ConvertError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// zstd支持的压缩等级范围
const ZSTD_MIN_LEVEL: i32 = 1;
const ZSTD_MAX_LEVEL: i32 = 22;

/// Anvil区块块头中的压缩类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkCompression {
    /// 数据紧跟块头，zlib压缩
    Zlib = 2,
    /// 数据存放在同目录的 c.<x>.<z>.mcc 文件中（128 + zlib）
    ZlibExternal = 130,
}

/// 将压缩类型值转换为枚举
pub fn chunk_compression_from_u8(value: u8) -> Result<ChunkCompression, ConvertError> {
    match value {
        2 => Ok(ChunkCompression::Zlib),
        130 => Ok(ChunkCompression::ZlibExternal),
        _ => Err(ConvertError::UnsupportedCompression(value)),
    }
}

pub fn clamp_zlib_level(level: i32) -> u32 {
    level.clamp(0, 9) as u32
}

pub fn clamp_zstd_level(level: i32) -> i32 {
    level.clamp(ZSTD_MIN_LEVEL, ZSTD_MAX_LEVEL)
}

/// zlib压缩
pub fn zlib_compress(data: &[u8], level: i32) -> Result<Vec<u8>, ConvertError> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(clamp_zlib_level(level)),
    );
    encoder
        .write_all(data)
        .map_err(|e| ConvertError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ConvertError::Compression(e.to_string()))
}

/// zlib解压
pub fn zlib_decompress(compressed_data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut decompressed = Vec::new();
    ZlibDecoder::new(compressed_data)
        .read_to_end(&mut decompressed)
        .map_err(|e| ConvertError::Decompression(e.to_string()))?;
    Ok(decompressed)
}

/// zstd压缩，帧内附带校验和
pub fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>, ConvertError> {
    let mut compressed = Vec::new();
    let mut encoder = zstd::Encoder::new(&mut compressed, clamp_zstd_level(level))
        .map_err(|e| ConvertError::Compression(e.to_string()))?;
    encoder
        .include_checksum(true)
        .map_err(|e| ConvertError::Compression(e.to_string()))?;
    encoder
        .write_all(data)
        .map_err(|e| ConvertError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ConvertError::Compression(e.to_string()))?;
    Ok(compressed)
}

/// zstd解压
pub fn zstd_decompress(compressed_data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut decompressed = Vec::new();
    let mut decoder = zstd::Decoder::new(compressed_data)
        .map_err(|e| ConvertError::Decompression(e.to_string()))?;
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| ConvertError::Decompression(e.to_string()))?;
    Ok(decompressed)
}
