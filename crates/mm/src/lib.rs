//! 内存管理接口
//!
//! 提供地址抽象、页表标志与页映射接口，供文件系统驱动建立零拷贝的用户映射。
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与具体页表实现解耦：
//! - [`PageMapper`]: 在显式给出的地址空间中映射、解除映射、修改权限、固定页帧
//!
//! 本 crate 不持有任何全局“当前地址空间”状态。

#![no_std]

mod page_mapper;

pub mod address;
pub mod page_table;

pub use page_mapper::PageMapper;

// Re-export 常用类型
pub use address::{AlignOps, Paddr, UsizeConvert, Vaddr, align_down, align_up};
pub use page_table::{PagingError, PagingResult, UniversalPTEFlag};
