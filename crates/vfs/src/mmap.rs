//! 文件内存映射契约
//!
//! 通用分发层负责记录 [`UserMapping`] 并选择驱动，驱动通过 [`FileMmap`]
//! 在调用方给出的地址空间中建立映射。

use alloc::sync::Arc;

use bitflags::bitflags;
use mm::{PageMapper, Vaddr};

use crate::FsError;

bitflags! {
    /// 分发层传给驱动的映射标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VfsMmFlags: u32 {
        /// 只保留虚拟地址范围，不建立任何页映射
        const DONT_MMAP = 1 << 0;
    }
}

/// 支持内存映射的文件句柄
///
/// 由具体文件系统驱动实现。
pub trait FileMmap: Send + Sync {
    /// 按 `um` 描述的区域在 `aspace` 中建立映射
    fn mmap(
        &self,
        um: &UserMapping,
        aspace: &mut dyn PageMapper,
        flags: VfsMmFlags,
    ) -> Result<(), FsError>;

    /// 解除 `um` 中 `[vaddr, vaddr + len)` 部分的映射
    fn munmap(
        &self,
        um: &UserMapping,
        aspace: &mut dyn PageMapper,
        vaddr: Vaddr,
        len: usize,
    ) -> Result<(), FsError>;
}

/// 用户映射描述符
///
/// 每个映射请求一个，归发起进程的映射表所有，在 munmap 或进程退出时销毁。
pub struct UserMapping {
    /// 被映射的文件句柄
    pub file: Arc<dyn FileMmap>,
    /// 映射的起始虚拟地址
    pub vaddr: Vaddr,
    /// 映射长度（字节）
    pub len: usize,
    /// 文件偏移量（字节）
    pub offset: usize,
}

impl UserMapping {
    /// 创建映射描述符
    pub fn new(file: Arc<dyn FileMmap>, vaddr: Vaddr, len: usize, offset: usize) -> Self {
        Self {
            file,
            vaddr,
            len,
            offset,
        }
    }
}

// 手动实现 Debug，因为 dyn FileMmap 没有实现 Debug
impl core::fmt::Debug for UserMapping {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserMapping")
            .field("file", &"<dyn FileMmap>")
            .field("vaddr", &self.vaddr)
            .field("len", &self.len)
            .field("offset", &self.offset)
            .finish()
    }
}

/// 分发一次映射请求到文件所属的驱动
///
/// 起始虚拟地址必须页对齐，长度必须非零，且区域不能越过地址上界。
pub fn vfs_mmap(
    um: &UserMapping,
    aspace: &mut dyn PageMapper,
    flags: VfsMmFlags,
) -> Result<(), FsError> {
    if um.len == 0
        || !aspace.is_page_aligned(um.vaddr.0)
        || um.vaddr.0.checked_add(um.len).is_none()
    {
        return Err(FsError::InvalidArgument);
    }
    um.file.mmap(um, aspace, flags)
}

/// 分发一次解除映射请求到文件所属的驱动
pub fn vfs_munmap(
    um: &UserMapping,
    aspace: &mut dyn PageMapper,
    vaddr: Vaddr,
    len: usize,
) -> Result<(), FsError> {
    if !aspace.is_page_aligned(vaddr.0) {
        return Err(FsError::InvalidArgument);
    }
    um.file.munmap(um, aspace, vaddr, len)
}

/// 通用的映射撤销路径
///
/// 宽松地解除 `[vaddr, vaddr + len)` 覆盖的所有页：范围内未映射的页被忽略。
pub fn generic_fs_munmap(
    aspace: &mut dyn PageMapper,
    vaddr: Vaddr,
    len: usize,
) -> Result<(), FsError> {
    let count = aspace.pages_for(len);
    aspace.unmap_pages(vaddr, count, true).map_err(|e| {
        log::warn!("generic_fs_munmap: {:#x}+{:#x}: {:?}", vaddr, len, e);
        FsError::from(e)
    })
}
