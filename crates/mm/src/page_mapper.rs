//! 页映射接口
//!
//! 文件系统驱动通过 [`PageMapper`] 在某个地址空间中建立、撤销映射。
//! 实现者本身就是地址空间句柄：调用方显式传入要操作的地址空间，
//! 而不是隐式地作用于“当前活动页表”。
//!
//! ## 部分成功
//!
//! [`PageMapper::map_pages`] 只在资源耗尽时少映射，且返回实际映射的页数；
//! 已映射的页保持映射，由调用方决定是否回滚。

use crate::address::{Paddr, Vaddr};
use crate::page_table::{PagingResult, UniversalPTEFlag};

/// 地址空间的页映射操作
pub trait PageMapper {
    /// 此地址空间使用的页大小（字节）
    fn page_size(&self) -> usize;

    /// 将 `[paddr, paddr + count * page_size)` 映射到 `vaddr` 起始的连续虚拟页
    ///
    /// 返回实际映射成功的页数。少于 `count` 时，前面已映射的页保持映射。
    fn map_pages(
        &mut self,
        vaddr: Vaddr,
        paddr: Paddr,
        count: usize,
        flags: UniversalPTEFlag,
    ) -> usize;

    /// 解除 `vaddr` 起始的 `count` 个页的映射
    ///
    /// `permissive` 为真时，范围内未映射的页被忽略；否则遇到未映射页返回错误。
    fn unmap_pages(&mut self, vaddr: Vaddr, count: usize, permissive: bool) -> PagingResult<()>;

    /// 设置单个页的可写位
    fn set_page_writable(&mut self, vaddr: Vaddr, writable: bool) -> PagingResult<()>;

    /// 增加 `[vaddr, vaddr + len)` 范围内已映射物理页帧的引用计数
    ///
    /// 被固定的页帧不会因为用户映射的解除而被释放。
    fn retain_pages(&mut self, vaddr: Vaddr, len: usize);

    /// 设置 `[vaddr, vaddr + len)` 范围内所有页的可写位
    ///
    /// 中途失败时，已修改的页恢复原状态后返回错误。
    fn set_range_writable(&mut self, vaddr: Vaddr, len: usize, writable: bool) -> PagingResult<()> {
        let page_size = self.page_size();
        let mut va = vaddr;
        let end = vaddr + len;

        while va < end {
            if let Err(e) = self.set_page_writable(va, writable) {
                log::warn!(
                    "set_range_writable: failed at {:#x} (writable={}): {:?}",
                    va,
                    writable,
                    e
                );
                let mut undo = vaddr;
                while undo < va {
                    let _ = self.set_page_writable(undo, !writable);
                    undo += page_size;
                }
                return Err(e);
            }
            va += page_size;
        }

        Ok(())
    }

    /// 按字节长度计算覆盖的页数（向上取整）
    fn pages_for(&self, len: usize) -> usize {
        len.div_ceil(self.page_size())
    }

    /// 检查地址是否按本地址空间的页大小对齐
    fn is_page_aligned(&self, addr: usize) -> bool {
        addr % self.page_size() == 0
    }
}
