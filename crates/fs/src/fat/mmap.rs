//! FAT 文件的零拷贝 mmap
//!
//! 沿簇链逐簇推进文件偏移，把与请求区域重叠的部分直接映射到用户地址空间。
//! 映射要么全部成功，要么回滚本次调用建立的所有映射。

use core::cmp::min;

use mm::{PageMapper, Paddr, UniversalPTEFlag, Vaddr, align_down};
use vfs::{FileMmap, FsError, UserMapping, VfsMmFlags, generic_fs_munmap};

use super::device::FatHandle;
use super::error::{IntegrityKind, IntegrityViolation, MmapError, MmapResult};
use super::walker::ClusterLink;
use crate::ops::fs_ops;

impl FatHandle {
    /// 在 `aspace` 中建立 `um` 描述的映射，返回映射的页数
    ///
    /// 区域按页向外取整。超出文件末尾的部分不映射。文件偏移或虚拟地址的末端越过地址上界时
    /// 返回 [`MmapError::InvalidArgument`]。
    pub fn map_region(
        &self,
        um: &UserMapping,
        aspace: &mut dyn PageMapper,
        flags: VfsMmFlags,
    ) -> MmapResult<usize> {
        let fs = &*self.fs;

        if !fs.mmap_supported() {
            return Err(MmapError::Unsupported);
        }
        if self.entry.is_directory() {
            return Err(MmapError::PermissionDenied);
        }
        if flags.contains(VfsMmFlags::DONT_MMAP) {
            return Ok(0);
        }

        let page_size = aspace.page_size();
        let cluster_size = fs.cluster_size();
        let off_begin = align_down(um.offset, page_size);
        let off_end = um
            .offset
            .checked_add(um.len)
            .and_then(|end| end.checked_add(page_size - 1))
            .map(|end| align_down(end, page_size))
            .ok_or(MmapError::InvalidArgument)?;
        if um.vaddr.0.checked_add(off_end - off_begin).is_none() {
            return Err(MmapError::InvalidArgument);
        }

        let mut clu = self.entry.first_cluster();
        if clu < 2 {
            // 空文件没有簇链
            return Ok(0);
        }

        let mut vaddr = um.vaddr;
        let mut off = 0usize;
        let mut tot_mapped = 0usize;

        loop {
            if off >= off_end {
                break;
            }
            let clu_end = off + cluster_size;

            if clu_end > off_begin {
                let data = fs.cluster_data(clu).unwrap_or_else(|v| v.halt());
                let mut paddr = Paddr(fs_ops().kernel_vaddr_to_paddr(data.as_ptr() as usize));

                if off < off_begin {
                    // 区域从簇的中间开始，只可能发生在簇大于页时
                    paddr += off_begin - off;
                    off = off_begin;
                }

                let pg_count = (min(clu_end, off_end) - off) / page_size;
                let mapped = aspace.map_pages(
                    vaddr,
                    paddr,
                    pg_count,
                    UniversalPTEFlag::user_shared_read(),
                );

                if mapped != pg_count {
                    log::debug!(
                        "fat mmap: mapped {} of {} pages at {:#x}, rolling back",
                        mapped,
                        pg_count,
                        vaddr
                    );
                    if let Err(e) = aspace.unmap_pages(um.vaddr, tot_mapped + mapped, true) {
                        log::warn!("fat mmap: rollback at {:#x} failed: {:?}", um.vaddr, e);
                    }
                    return Err(MmapError::ResourceExhausted);
                }

                vaddr += pg_count * page_size;
                off += pg_count * page_size;
                tot_mapped += mapped;

                debug_assert!(off >= off_end || off % cluster_size == 0);
            } else {
                off = clu_end;
            }

            match fs.next_cluster(clu) {
                ClusterLink::Next(next) => clu = next,
                ClusterLink::EndOfChain => break,
                ClusterLink::Bad => IntegrityViolation::new(clu, IntegrityKind::BadCluster).halt(),
                ClusterLink::Corrupt(raw) => {
                    IntegrityViolation::new(clu, IntegrityKind::CorruptChain { raw }).halt()
                }
            }
        }

        Ok(tot_mapped)
    }

    /// 解除 `[vaddr, vaddr + len)` 的映射
    pub fn unmap_region(
        &self,
        aspace: &mut dyn PageMapper,
        vaddr: Vaddr,
        len: usize,
    ) -> Result<(), FsError> {
        if !self.fs.mmap_supported() {
            return Err(MmapError::Unsupported.into());
        }
        generic_fs_munmap(aspace, vaddr, len)
    }
}

impl FileMmap for FatHandle {
    fn mmap(
        &self,
        um: &UserMapping,
        aspace: &mut dyn PageMapper,
        flags: VfsMmFlags,
    ) -> Result<(), FsError> {
        self.map_region(um, aspace, flags)?;
        Ok(())
    }

    fn munmap(
        &self,
        _um: &UserMapping,
        aspace: &mut dyn PageMapper,
        vaddr: Vaddr,
        len: usize,
    ) -> Result<(), FsError> {
        self.unmap_region(aspace, vaddr, len)
    }
}
