//! FAT 簇链遍历
//!
//! 读取第一份 FAT 表中的表项并分类。

use super::layout::{FatLayout, FatType};

/// 一个 FAT 表项指向的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterLink {
    /// 链中的下一个簇
    Next(u32),
    /// 簇链结束
    EndOfChain,
    /// 坏簇标记
    Bad,
    /// 空闲、保留或越界的簇号，链已损坏
    Corrupt(u32),
}

/// 从 FAT 表 `fat` 中读取簇 `clu` 的原始表项
///
/// 表项超出 `fat` 范围时返回 `None`。
pub fn read_fat_entry(fat: &[u8], fat_type: FatType, clu: u32) -> Option<u32> {
    let clu = clu as usize;
    match fat_type {
        FatType::Fat12 => {
            let off = clu + clu / 2;
            let raw = u16::from_le_bytes([*fat.get(off)?, *fat.get(off + 1)?]);
            Some(if clu & 1 == 1 {
                (raw >> 4) as u32
            } else {
                (raw & 0x0FFF) as u32
            })
        }
        FatType::Fat16 => {
            let off = clu * 2;
            Some(u16::from_le_bytes([*fat.get(off)?, *fat.get(off + 1)?]) as u32)
        }
        FatType::Fat32 => {
            let off = clu * 4;
            let bytes = fat.get(off..off + 4)?;
            Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & 0x0FFF_FFFF)
        }
    }
}

/// 将原始表项分类
pub fn classify(fat_type: FatType, raw: u32, max_cluster: u32) -> ClusterLink {
    if raw >= fat_type.end_of_chain() {
        ClusterLink::EndOfChain
    } else if raw == fat_type.bad_cluster() {
        ClusterLink::Bad
    } else if raw < 2 || raw > max_cluster {
        ClusterLink::Corrupt(raw)
    } else {
        ClusterLink::Next(raw)
    }
}

/// 在镜像 `image` 中查找簇 `clu` 的下一个簇
pub fn next_cluster(layout: &FatLayout, image: &[u8], clu: u32) -> ClusterLink {
    let fat = &image[layout.fat_offset()..layout.fat_offset() + layout.fat_bytes()];
    match read_fat_entry(fat, layout.fat_type, clu) {
        Some(raw) => classify(layout.fat_type, raw, layout.max_cluster()),
        None => ClusterLink::Corrupt(clu),
    }
}

/// 计算镜像实际使用的字节数
///
/// 即编号最大的已分配簇的结束偏移；没有已分配簇时为首个数据扇区的偏移。
pub fn used_bytes(layout: &FatLayout, image: &[u8]) -> usize {
    let fat = &image[layout.fat_offset()..layout.fat_offset() + layout.fat_bytes()];
    let mut clu = layout.max_cluster();

    while clu >= 2 {
        if read_fat_entry(fat, layout.fat_type, clu).is_some_and(|raw| raw != 0) {
            return layout.first_data_offset() + (clu as usize - 1) * layout.cluster_size();
        }
        clu -= 1;
    }

    layout.first_data_offset()
}
