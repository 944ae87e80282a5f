//! 挂载时的 mmap 准备

use mm::PageMapper;

use super::align::{AlignFirstDataSector, AlignOutcome, ResidentRamdisk};
use super::device::FatFsDevice;
use super::error::{MmapError, MmapResult};
use super::layout::FatLayout;
use crate::ops::fs_ops;

impl FatFsDevice {
    /// 为 ramdisk 挂载开启 mmap 能力
    ///
    /// 每个 FAT ramdisk 挂载只调用一次，且必须在任何文件被映射之前。`kspace` 是
    /// ramdisk 所在的内核地址空间，`rd_size` 是为 ramdisk 预留的内存大小。
    ///
    /// 平台报告 ramdisk 之后紧跟一页可用内存时，`rd_size` 与镜像视图都扩展一页。
    ///
    /// 簇大小必须是页大小的整数倍；首个数据扇区未页对齐时在内存中原地修复，
    /// 这需要 ramdisk 末尾至少有一页未使用的余量。任一条件不满足时，mmap 能力在此挂载的
    /// 生命周期内保持关闭。
    pub fn prepare_for_mmap(
        &mut self,
        kspace: &mut dyn PageMapper,
        rd_size: usize,
    ) -> MmapResult<()> {
        let page_size = kspace.page_size();
        let base = self.image().base();
        let mut rd_size = rd_size;

        // ramdisk 之后紧跟的一页可用内存也可作为修复对齐的余量
        if fs_ops().ramdisk_has_extra_page(base.0, rd_size) {
            rd_size += page_size;
            if rd_size > self.image().len() {
                let extra = rd_size - self.image().len();
                // SAFETY: 平台确认 [base + rd_size - page_size, base + rd_size) 可用且不属于其他区域
                unsafe { self.image_mut().extend(extra) };
            }
        }

        let cluster_size = self.cluster_size();
        if cluster_size < page_size || cluster_size % page_size != 0 {
            log::warn!(
                "fat ramdisk: cluster size {} is not a multiple of page size {}, mmap disabled",
                cluster_size,
                page_size
            );
            self.mmap_support = false;
            return Err(MmapError::Misconfiguration);
        }

        if rd_size > self.image().len() {
            log::warn!(
                "fat ramdisk: size {:#x} exceeds the backing region {:#x}",
                rd_size,
                self.image().len()
            );
            return Err(MmapError::Misconfiguration);
        }

        kspace.retain_pages(base, rd_size);

        if self.layout().is_first_data_sector_aligned(page_size) {
            log::debug!("fat ramdisk: first data sector already page aligned");
            self.mmap_support = true;
            return Ok(());
        }

        let region = &mut self.image_mut().as_bytes_mut()[..rd_size];
        let outcome = ResidentRamdisk::new(region, kspace, base).align_first_data_sector(page_size)?;

        let layout = FatLayout::parse(self.image().as_bytes()).map_err(|_| MmapError::Misconfiguration)?;
        self.set_layout(layout);

        if let AlignOutcome::Shifted { added_sectors } = outcome {
            log::info!(
                "fat ramdisk: align of ramdisk was necessary ({} reserved sectors added)",
                added_sectors
            );
        }
        self.mmap_support = true;
        Ok(())
    }
}
