//! 内存管理相关操作的 Mock 实现
//!
//! [`MockAddressSpace`] 用 `BTreeMap` 记录页映射，实现 `mm::PageMapper`，
//! 并支持通过页预算模拟映射中途的资源耗尽。

use alloc::collections::btree_map::BTreeMap;
use alloc::vec::Vec;

use mm::{Paddr, PageMapper, PagingError, PagingResult, UniversalPTEFlag, Vaddr};

/// 一个已映射的页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPage {
    /// 物理地址
    pub paddr: Paddr,
    /// 映射标志
    pub flags: UniversalPTEFlag,
}

/// 一次 map_pages 调用的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapCall {
    /// 起始虚拟地址
    pub vaddr: Vaddr,
    /// 起始物理地址
    pub paddr: Paddr,
    /// 请求的页数
    pub count: usize,
    /// 实际映射的页数
    pub mapped: usize,
    /// 映射标志
    pub flags: UniversalPTEFlag,
}

/// Mock 地址空间
pub struct MockAddressSpace {
    page_size: usize,
    pages: BTreeMap<usize, MockPage>,
    /// 剩余可映射页数，`None` 表示不限
    budget: Option<usize>,
    /// map_pages 调用记录
    pub map_calls: Vec<MapCall>,
    /// unmap_pages 调用记录：(vaddr, count, permissive)
    pub unmap_calls: Vec<(Vaddr, usize, bool)>,
    /// retain_pages 调用记录：(vaddr, len)
    pub retained: Vec<(Vaddr, usize)>,
    /// set_page_writable 调用记录：(vaddr, writable)
    pub writable_log: Vec<(Vaddr, bool)>,
    /// 当前被标记为可写的页
    writable: BTreeMap<usize, bool>,
    /// 为真时 unmap_pages 记录调用后直接失败
    fail_unmap: bool,
}

impl MockAddressSpace {
    /// 创建不限页预算的地址空间
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: BTreeMap::new(),
            budget: None,
            map_calls: Vec::new(),
            unmap_calls: Vec::new(),
            retained: Vec::new(),
            writable_log: Vec::new(),
            writable: BTreeMap::new(),
            fail_unmap: false,
        }
    }

    /// 创建最多只能再映射 `pages` 个页的地址空间
    pub fn with_page_budget(page_size: usize, pages: usize) -> Self {
        let mut space = Self::new(page_size);
        space.budget = Some(pages);
        space
    }

    /// 当前已映射的页数
    pub fn mapped_count(&self) -> usize {
        self.pages.len()
    }

    /// 查询某个虚拟页的映射
    pub fn translate(&self, vaddr: Vaddr) -> Option<MockPage> {
        self.pages.get(&(vaddr.0 & !(self.page_size - 1))).copied()
    }

    /// 按虚拟地址升序返回所有映射
    pub fn mappings(&self) -> Vec<(Vaddr, MockPage)> {
        self.pages.iter().map(|(va, p)| (Vaddr(*va), *p)).collect()
    }

    /// 某页当前是否被标记为可写
    pub fn is_writable(&self, vaddr: Vaddr) -> bool {
        self.writable.get(&vaddr.0).copied().unwrap_or(false)
    }

    /// 让之后的 unmap_pages 调用全部失败
    pub fn fail_unmaps(&mut self) {
        self.fail_unmap = true;
    }

    /// 预先占用一个虚拟页，使后续对该页的映射失败
    pub fn occupy(&mut self, vaddr: Vaddr) {
        self.pages.insert(
            vaddr.0,
            MockPage {
                paddr: Paddr(0),
                flags: UniversalPTEFlag::kernel_read(),
            },
        );
    }
}

impl PageMapper for MockAddressSpace {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn map_pages(
        &mut self,
        vaddr: Vaddr,
        paddr: Paddr,
        count: usize,
        flags: UniversalPTEFlag,
    ) -> usize {
        let mut mapped = 0;
        while mapped < count {
            if self.budget == Some(0) {
                break;
            }
            let va = vaddr.0 + mapped * self.page_size;
            if self.pages.contains_key(&va) {
                break;
            }
            self.pages.insert(
                va,
                MockPage {
                    paddr: Paddr(paddr.0 + mapped * self.page_size),
                    flags,
                },
            );
            if let Some(budget) = self.budget.as_mut() {
                *budget -= 1;
            }
            mapped += 1;
        }

        self.map_calls.push(MapCall {
            vaddr,
            paddr,
            count,
            mapped,
            flags,
        });
        mapped
    }

    fn unmap_pages(&mut self, vaddr: Vaddr, count: usize, permissive: bool) -> PagingResult<()> {
        self.unmap_calls.push((vaddr, count, permissive));
        if self.fail_unmap {
            return Err(PagingError::InvalidAddress);
        }
        for i in 0..count {
            let va = vaddr.0 + i * self.page_size;
            if self.pages.remove(&va).is_none() && !permissive {
                return Err(PagingError::NotMapped);
            }
        }
        Ok(())
    }

    fn set_page_writable(&mut self, vaddr: Vaddr, writable: bool) -> PagingResult<()> {
        self.writable_log.push((vaddr, writable));
        self.writable.insert(vaddr.0, writable);
        Ok(())
    }

    fn retain_pages(&mut self, vaddr: Vaddr, len: usize) {
        self.retained.push((vaddr, len));
    }
}
