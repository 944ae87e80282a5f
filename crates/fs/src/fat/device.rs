//! 挂载的 FAT ramdisk
//!
//! [`FatFsDevice`] 是每个挂载实例的设备数据，[`FatHandle`] 是打开的文件。

use alloc::sync::Arc;
use core::ops::ControlFlow;
use core::ptr::NonNull;

use mm::Vaddr;
use vfs::FsError;

use super::dir::{self, FatEntry};
use super::error::{IntegrityKind, IntegrityViolation};
use super::layout::{FatLayout, FatType};
use super::walker::{self, ClusterLink};

/// 常驻内核内存的 ramdisk 镜像
///
/// 覆盖为 ramdisk 预留的整个内存区域，可能比镜像实际使用的字节多。
pub struct RamdiskImage {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: 镜像内存在挂载期间一直有效；唯一的写入发生在持有 `&mut FatFsDevice` 的挂载准备阶段。
unsafe impl Send for RamdiskImage {}
unsafe impl Sync for RamdiskImage {}

impl RamdiskImage {
    /// 从内核虚拟地址和区域大小构造
    ///
    /// # Safety
    /// `[base, base + len)` 必须是有效的、在挂载期间不会被释放或被其他代码访问的内核内存。
    pub unsafe fn from_raw_parts(base: *mut u8, len: usize) -> Option<Self> {
        NonNull::new(base).map(|base| Self { base, len })
    }

    /// 从一段常驻内存构造
    pub fn from_static(mem: &'static mut [u8]) -> Self {
        Self {
            base: NonNull::from(&mut *mem).cast(),
            len: mem.len(),
        }
    }

    /// 区域起始的内核虚拟地址
    pub fn base(&self) -> Vaddr {
        Vaddr::from_ptr(self.base.as_ptr())
    }

    /// 区域大小（字节）
    pub fn len(&self) -> usize {
        self.len
    }

    /// 区域是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 只读访问整个区域
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: 构造时保证 [base, base + len) 有效
        unsafe { core::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    /// 把区域向后扩展 `extra` 字节
    ///
    /// # Safety
    /// `[base + len, base + len + extra)` 必须是有效的、在挂载期间归 ramdisk 独占的内核内存。
    pub(crate) unsafe fn extend(&mut self, extra: usize) {
        self.len += extra;
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: 同上；`&mut self` 保证没有其他借用
        unsafe { core::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

/// 一个挂载的 FAT 实例的设备数据
pub struct FatFsDevice {
    image: RamdiskImage,
    layout: FatLayout,
    /// 只有在 [`prepare_for_mmap`](Self::prepare_for_mmap) 成功后才为真
    pub(crate) mmap_support: bool,
}

impl FatFsDevice {
    /// 挂载一个 ramdisk 镜像
    ///
    /// 挂载后 mmap 能力关闭，需调用 [`prepare_for_mmap`](Self::prepare_for_mmap) 开启。
    pub fn mount(image: RamdiskImage) -> Result<Self, FsError> {
        let layout = FatLayout::parse(image.as_bytes())?;
        log::debug!(
            "fat: mounted {:?}, {} clusters of {} bytes, data at {:#x}",
            layout.fat_type,
            layout.cluster_count,
            layout.cluster_size(),
            layout.first_data_offset()
        );
        Ok(Self {
            image,
            layout,
            mmap_support: false,
        })
    }

    /// 镜像布局
    pub fn layout(&self) -> &FatLayout {
        &self.layout
    }

    pub(crate) fn set_layout(&mut self, layout: FatLayout) {
        self.layout = layout;
    }

    /// ramdisk 镜像
    pub fn image(&self) -> &RamdiskImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RamdiskImage {
        &mut self.image
    }

    /// FAT 类型
    pub fn fat_type(&self) -> FatType {
        self.layout.fat_type
    }

    /// 每簇字节数
    pub fn cluster_size(&self) -> usize {
        self.layout.cluster_size()
    }

    /// 是否支持 mmap
    pub fn mmap_supported(&self) -> bool {
        self.mmap_support
    }

    /// 镜像实际使用的字节数
    pub fn used_bytes(&self) -> usize {
        walker::used_bytes(&self.layout, self.image.as_bytes())
    }

    /// 簇 `clu` 的下一个簇
    pub fn next_cluster(&self, clu: u32) -> ClusterLink {
        walker::next_cluster(&self.layout, self.image.as_bytes(), clu)
    }

    /// 簇 `clu` 的原始数据
    pub fn cluster_data(&self, clu: u32) -> Result<&[u8], IntegrityViolation> {
        let bytes = self.image.as_bytes();
        self.layout
            .cluster_range(clu, bytes.len())
            .map(|range| &bytes[range])
            .ok_or(IntegrityViolation::new(clu, IntegrityKind::ClusterOutOfImage))
    }

    /// 在根目录中按 8.3 名字查找文件
    pub fn lookup_root(&self, name: &str) -> Option<FatEntry> {
        let short = dir::to_short_name(name)?;

        if self.layout.fat_type != FatType::Fat32 {
            let region = &self.image.as_bytes()[self.layout.root_dir_range()];
            return match dir::find_in(region, &short, self.layout.fat_type) {
                ControlFlow::Break(found) => found,
                ControlFlow::Continue(()) => None,
            };
        }

        let mut clu = self.layout.root_cluster;
        loop {
            let data = self.cluster_data(clu).unwrap_or_else(|v| v.halt());
            if let ControlFlow::Break(found) = dir::find_in(data, &short, self.layout.fat_type) {
                return found;
            }
            match self.next_cluster(clu) {
                ClusterLink::Next(next) => clu = next,
                ClusterLink::EndOfChain => return None,
                ClusterLink::Bad => IntegrityViolation::new(clu, IntegrityKind::BadCluster).halt(),
                ClusterLink::Corrupt(raw) => {
                    IntegrityViolation::new(clu, IntegrityKind::CorruptChain { raw }).halt()
                }
            }
        }
    }

    /// 打开一个目录项
    pub fn open(self: &Arc<Self>, entry: FatEntry) -> Arc<FatHandle> {
        Arc::new(FatHandle {
            fs: self.clone(),
            entry,
        })
    }
}

/// 打开的 FAT 文件
pub struct FatHandle {
    pub(crate) fs: Arc<FatFsDevice>,
    pub(crate) entry: FatEntry,
}

impl FatHandle {
    /// 所属的挂载实例
    pub fn fs(&self) -> &Arc<FatFsDevice> {
        &self.fs
    }

    /// 目录项
    pub fn entry(&self) -> &FatEntry {
        &self.entry
    }
}
