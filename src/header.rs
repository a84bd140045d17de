use crate::{error::ConvertError, LINEAR_SIGNATURE, LINEAR_VERSION};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// 文件头长度：24字节字段 + 8字节内容哈希
pub const LINEAR_HEADER_LENGTH: usize = 32;

/// 文件尾长度（重复的魔数）
pub const LINEAR_FOOTER_LENGTH: usize = 8;

/// Linear格式头部
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearHeader {
    pub version: u8,
    pub newest_timestamp: u64,
    pub compression_level: i8,
    pub chunk_count: u16,
    /// 压缩后区域数据的长度
    pub compressed_length: u32,
    /// 未压缩数据的XXH64
    pub content_hash: u64,
}

/// 写入Linear文件头部
pub fn write_header<W: Write>(writer: &mut W, header: &LinearHeader) -> Result<(), ConvertError> {
    writer.write_u64::<BigEndian>(LINEAR_SIGNATURE)?;
    writer.write_u8(header.version)?;
    writer.write_u64::<BigEndian>(header.newest_timestamp)?;
    writer.write_i8(header.compression_level)?;
    writer.write_u16::<BigEndian>(header.chunk_count)?;
    writer.write_u32::<BigEndian>(header.compressed_length)?;
    writer.write_u64::<BigEndian>(header.content_hash)?;

    Ok(())
}

/// 读取Linear文件头部，魔数或版本不符时直接拒绝
pub fn read_header<R: Read>(reader: &mut R) -> Result<LinearHeader, ConvertError> {
    let signature = reader.read_u64::<BigEndian>()?;
    if signature != LINEAR_SIGNATURE {
        return Err(ConvertError::InvalidSignature);
    }

    let version = reader.read_u8()?;
    if version != LINEAR_VERSION {
        return Err(ConvertError::UnsupportedVersion(version));
    }

    Ok(LinearHeader {
        version,
        newest_timestamp: reader.read_u64::<BigEndian>()?,
        compression_level: reader.read_i8()?,
        chunk_count: reader.read_u16::<BigEndian>()?,
        compressed_length: reader.read_u32::<BigEndian>()?,
        content_hash: reader.read_u64::<BigEndian>()?,
    })
}

/// 写入文件尾
pub fn write_footer<W: Write>(writer: &mut W) -> Result<(), ConvertError> {
    writer.write_u64::<BigEndian>(LINEAR_SIGNATURE)?;
    Ok(())
}

/// 校验文件尾的魔数
pub fn read_footer<R: Read>(reader: &mut R) -> Result<(), ConvertError> {
    if reader.read_u64::<BigEndian>()? != LINEAR_SIGNATURE {
        return Err(ConvertError::InvalidFooter);
    }
    Ok(())
}
