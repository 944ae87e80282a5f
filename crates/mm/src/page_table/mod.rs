//! 页表模块
//!
//! 定义映射标志与分页错误类型。具体的页表操作由 [`crate::PageMapper`] 抽象。

use bitflags::bitflags;

bitflags! {
    /// 架构无关的页表项标志
    ///
    /// 由各架构的页表实现翻译为硬件位。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UniversalPTEFlag: usize {
        /// 有效位
        const VALID = 1 << 0;
        /// 可读
        const READABLE = 1 << 1;
        /// 可写
        const WRITEABLE = 1 << 2;
        /// 可执行
        const EXECUTABLE = 1 << 3;
        /// 用户态可访问
        const USER_ACCESSIBLE = 1 << 4;
        /// 全局映射
        const GLOBAL = 1 << 5;
        /// 已访问
        const ACCESSED = 1 << 6;
        /// 已修改
        const DIRTY = 1 << 7;
        /// 共享映射（软件位）：物理页不归该映射所有，解除映射时不释放
        const SHARED = 1 << 8;
    }
}

impl UniversalPTEFlag {
    /// 用户态只读共享映射，文件 mmap 使用
    pub const fn user_shared_read() -> Self {
        Self::VALID
            .union(Self::READABLE)
            .union(Self::USER_ACCESSIBLE)
            .union(Self::SHARED)
    }

    /// 内核只读映射
    pub const fn kernel_read() -> Self {
        Self::VALID.union(Self::READABLE).union(Self::GLOBAL)
    }
}

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址未被映射
    NotMapped,
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址
    InvalidAddress,
    /// 提供了无效的标志（Flags）
    InvalidFlags,
    /// 帧（Frame）分配失败
    FrameAllocFailed,
    /// 内存耗尽
    OutOfMemory,
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_shared_read_is_not_writeable() {
        let flags = UniversalPTEFlag::user_shared_read();
        assert!(flags.contains(UniversalPTEFlag::USER_ACCESSIBLE));
        assert!(flags.contains(UniversalPTEFlag::SHARED));
        assert!(!flags.contains(UniversalPTEFlag::WRITEABLE));
        assert!(!flags.contains(UniversalPTEFlag::EXECUTABLE));
    }
}
