//! FS 相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `fs` crate（避免循环依赖）。
//! `fs` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `FsOps`）。

use core::sync::atomic::{AtomicUsize, Ordering};

/// 可同时登记“之后有空闲页”的 ramdisk 数量
const SPARE_PAGE_SLOTS: usize = 32;

/// Mock 的 FS 运行时操作
///
/// 默认采用“恒等映射”（vaddr == paddr）。ramdisk 之后是否有额外可用页按 ramdisk
/// 基址登记，并行运行的测试各用各的镜像，互不影响。
pub struct MockFsOps {
    spare_page_after: [AtomicUsize; SPARE_PAGE_SLOTS],
}

impl MockFsOps {
    pub const fn new() -> Self {
        Self {
            spare_page_after: [const { AtomicUsize::new(0) }; SPARE_PAGE_SLOTS],
        }
    }

    /// 内核虚拟地址转物理地址（测试默认：恒等映射）
    pub fn kernel_vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }

    /// 登记基址为 `base` 的 ramdisk 之后紧跟一页可用内存
    ///
    /// # Panics
    /// 登记数超过上限时 panic
    pub fn grant_spare_page(&self, base: usize) {
        let granted = self.spare_page_after.iter().any(|slot| {
            slot.compare_exchange(0, base, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        });
        assert!(granted, "MockFsOps: too many spare-page grants");
    }

    /// ramdisk 之后是否还有一页可用内存（默认：否）
    pub fn ramdisk_has_extra_page(&self, base: usize, _size: usize) -> bool {
        self.spare_page_after
            .iter()
            .any(|slot| slot.load(Ordering::Acquire) == base)
    }
}

/// 全局 Mock 实例
pub static MOCK_FS_OPS: MockFsOps = MockFsOps::new();
