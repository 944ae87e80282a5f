//! 数据区页对齐
//!
//! fat mmap 直接把簇所在的物理页映射给用户，因此每个簇都必须从页边界开始。
//! 当簇大小是页大小的倍数时，只要首个数据扇区页对齐即可。
//!
//! 对齐通过增加保留扇区、把 FAT 表及其后的所有数据整体后移来实现。同一能力有两个实现：
//!
//! - [`OfflineImage`]: 构建时在镜像嵌入内核之前运行，镜像可增长
//! - [`ResidentRamdisk`]: 启动时的兜底实现，在常驻内存中原地修复，需要至少一页空闲余量
//!
//! 运行时只依赖后者。

use alloc::vec::Vec;

use mm::{PageMapper, Vaddr};

use super::error::{IntegrityKind, IntegrityViolation, MmapError, MmapResult};
use super::layout::{FatLayout, bpb};
use super::walker;

/// 对齐结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOutcome {
    /// 已经对齐，镜像未被修改
    AlreadyAligned,
    /// 数据区被后移
    Shifted {
        /// 新增的保留扇区数
        added_sectors: usize,
    },
}

/// “首个数据扇区位于 `align` 边界”这一能力
pub trait AlignFirstDataSector {
    /// 确保首个数据扇区按 `align` 字节对齐
    fn align_first_data_sector(&mut self, align: usize) -> MmapResult<AlignOutcome>;
}

/// 使首个数据扇区对齐需要后移的字节数
pub fn alignment_delta(layout: &FatLayout, align: usize) -> usize {
    let rem = layout.first_data_offset() % align;
    if rem == 0 { 0 } else { align - rem }
}

/// 把 `[保留区末尾, used)` 后移，使首个数据扇区按 `align` 对齐
///
/// `image` 必须至少有 `used + delta` 字节。返回新增的保留扇区数。
fn shift_data_region(
    image: &mut [u8],
    layout: &FatLayout,
    used: usize,
    align: usize,
) -> MmapResult<usize> {
    let bps = layout.bytes_per_sector;
    let delta = alignment_delta(layout, align);
    if delta == 0 {
        return Ok(0);
    }
    if delta % bps != 0 {
        log::warn!("fat: cannot align data region: {} bytes is not a whole number of sectors", delta);
        return Err(MmapError::Misconfiguration);
    }

    let added = delta / bps;
    let new_reserved = layout.reserved_sectors + added;
    if new_reserved > u16::MAX as usize || used + delta > image.len() {
        return Err(MmapError::Misconfiguration);
    }

    let rsvd_end = layout.fat_offset();
    image.copy_within(rsvd_end..used, rsvd_end + delta);
    image[rsvd_end..rsvd_end + delta].fill(0);

    image[bpb::RSVD_SEC_CNT..bpb::RSVD_SEC_CNT + 2]
        .copy_from_slice(&(new_reserved as u16).to_le_bytes());

    // 数据扇区数不变，簇数与 FAT 类型也就不变
    let total = layout.total_sectors + added;
    let tot16 = u16::from_le_bytes([image[bpb::TOT_SEC16], image[bpb::TOT_SEC16 + 1]]);
    if tot16 != 0 && total <= u16::MAX as usize {
        image[bpb::TOT_SEC16..bpb::TOT_SEC16 + 2].copy_from_slice(&(total as u16).to_le_bytes());
    } else {
        image[bpb::TOT_SEC16..bpb::TOT_SEC16 + 2].fill(0);
        image[bpb::TOT_SEC32..bpb::TOT_SEC32 + 4].copy_from_slice(&(total as u32).to_le_bytes());
    }

    Ok(added)
}

fn parse(image: &[u8]) -> MmapResult<FatLayout> {
    FatLayout::parse(image).map_err(|_| MmapError::Misconfiguration)
}

/// 构建时的对齐：作用于可增长的镜像文件内容
pub struct OfflineImage<'a> {
    image: &'a mut Vec<u8>,
}

impl<'a> OfflineImage<'a> {
    /// 包装一个镜像
    pub fn new(image: &'a mut Vec<u8>) -> Self {
        Self { image }
    }
}

impl AlignFirstDataSector for OfflineImage<'_> {
    fn align_first_data_sector(&mut self, align: usize) -> MmapResult<AlignOutcome> {
        let layout = parse(self.image.as_slice())?;
        let delta = alignment_delta(&layout, align);
        if delta == 0 {
            return Ok(AlignOutcome::AlreadyAligned);
        }

        let used = walker::used_bytes(&layout, self.image.as_slice());
        if self.image.len() < used + delta {
            self.image.resize(used + delta, 0);
        }

        let added_sectors = shift_data_region(self.image.as_mut_slice(), &layout, used, align)?;
        Ok(AlignOutcome::Shifted { added_sectors })
    }
}

/// 启动时的对齐：在常驻内存的 ramdisk 中原地修复
///
/// 修复期间 ramdisk 的所有页临时设为可写，完成后恢复只读。
pub struct ResidentRamdisk<'a, M: PageMapper + ?Sized> {
    region: &'a mut [u8],
    kspace: &'a mut M,
    base: Vaddr,
}

impl<'a, M: PageMapper + ?Sized> ResidentRamdisk<'a, M> {
    /// `region` 是整个 ramdisk 区域，`base` 是它在 `kspace` 中的虚拟地址
    pub fn new(region: &'a mut [u8], kspace: &'a mut M, base: Vaddr) -> Self {
        Self {
            region,
            kspace,
            base,
        }
    }
}

impl<M: PageMapper + ?Sized> AlignFirstDataSector for ResidentRamdisk<'_, M> {
    fn align_first_data_sector(&mut self, align: usize) -> MmapResult<AlignOutcome> {
        let layout = parse(&*self.region)?;
        if layout.is_first_data_sector_aligned(align) {
            return Ok(AlignOutcome::AlreadyAligned);
        }

        let size = self.region.len();
        let used = walker::used_bytes(&layout, &*self.region);
        if size < used {
            IntegrityViolation::new(0, IntegrityKind::ImageOverflow { used, size }).halt();
        }

        if size - used < self.kspace.page_size() {
            log::warn!("fat ramdisk: cannot align first data sector");
            return Err(MmapError::Misconfiguration);
        }

        self.kspace
            .set_range_writable(self.base, size, true)
            .map_err(|_| MmapError::Misconfiguration)?;

        let shifted = shift_data_region(&mut *self.region, &layout, used, align);

        if self.kspace.set_range_writable(self.base, size, false).is_err() {
            log::error!("fat ramdisk: failed to restore read-only mapping at {:#x}", self.base);
        }

        Ok(AlignOutcome::Shifted {
            added_sectors: shifted?,
        })
    }
}
