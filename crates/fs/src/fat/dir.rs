//! FAT 目录项

use core::ops::ControlFlow;

use bitflags::bitflags;

use super::layout::FatType;

/// 目录项大小
pub const DIR_ENTRY_SIZE: usize = 32;

const ENTRY_END: u8 = 0x00;
const ENTRY_DELETED: u8 = 0xE5;

bitflags! {
    /// 目录项属性
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FatAttr: u8 {
        /// 只读
        const READ_ONLY = 0x01;
        /// 隐藏
        const HIDDEN = 0x02;
        /// 系统
        const SYSTEM = 0x04;
        /// 卷标
        const VOLUME_ID = 0x08;
        /// 目录
        const DIRECTORY = 0x10;
        /// 归档
        const ARCHIVE = 0x20;
        /// 长文件名项
        const LONG_NAME = 0x0F;
    }
}

/// 文件目录项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatEntry {
    name: [u8; 11],
    attr: FatAttr,
    first_cluster: u32,
    size: u32,
}

impl FatEntry {
    /// 从 32 字节的原始目录项解析
    ///
    /// 首簇号的高 16 位只在 FAT32 上有意义，其他类型上该字段可能存有别的数据。
    pub fn from_raw(raw: &[u8; DIR_ENTRY_SIZE], fat_type: FatType) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[0..11]);
        let hi = match fat_type {
            FatType::Fat32 => u16::from_le_bytes([raw[20], raw[21]]) as u32,
            FatType::Fat12 | FatType::Fat16 => 0,
        };
        let lo = u16::from_le_bytes([raw[26], raw[27]]) as u32;
        Self {
            name,
            attr: FatAttr::from_bits_retain(raw[11]),
            first_cluster: (hi << 16) | lo,
            size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// 8.3 格式的名字（空格填充）
    pub fn short_name(&self) -> &[u8; 11] {
        &self.name
    }

    /// 属性
    pub fn attr(&self) -> FatAttr {
        self.attr
    }

    /// 首簇号，空文件为 0
    pub fn first_cluster(&self) -> u32 {
        self.first_cluster
    }

    /// 文件字节数
    pub fn size(&self) -> u32 {
        self.size
    }

    /// 是否为目录
    pub fn is_directory(&self) -> bool {
        self.attr.contains(FatAttr::DIRECTORY)
    }
}

/// 将 "name.ext" 转为 8.3 目录项名
///
/// 主名超过 8 个字符、扩展名超过 3 个字符或为空时返回 `None`。
pub fn to_short_name(name: &str) -> Option<[u8; 11]> {
    let (base, ext) = match name.rsplit_once('.') {
        Some((b, e)) => (b, e),
        None => (name, ""),
    };
    if base.is_empty() || base.len() > 8 || ext.len() > 3 {
        return None;
    }

    let mut out = [b' '; 11];
    for (dst, b) in out.iter_mut().zip(base.bytes()) {
        *dst = b.to_ascii_uppercase();
    }
    for (dst, b) in out[8..].iter_mut().zip(ext.bytes()) {
        *dst = b.to_ascii_uppercase();
    }
    Some(out)
}

/// 在一段连续的目录项中查找 8.3 名字
///
/// 找到或遇到目录结束标记时返回 `Break`，否则返回 `Continue` 表示应继续查找后续簇。
pub(crate) fn find_in(
    entries: &[u8],
    name: &[u8; 11],
    fat_type: FatType,
) -> ControlFlow<Option<FatEntry>> {
    for chunk in entries.chunks_exact(DIR_ENTRY_SIZE) {
        match chunk[0] {
            ENTRY_END => return ControlFlow::Break(None),
            ENTRY_DELETED => continue,
            _ => {}
        }
        // 长文件名项的属性同样包含卷标位
        if FatAttr::from_bits_retain(chunk[11]).contains(FatAttr::VOLUME_ID) {
            continue;
        }
        if &chunk[0..11] == name {
            let mut raw = [0u8; DIR_ENTRY_SIZE];
            raw.copy_from_slice(chunk);
            return ControlFlow::Break(Some(FatEntry::from_raw(&raw, fat_type)));
        }
    }
    ControlFlow::Continue(())
}
