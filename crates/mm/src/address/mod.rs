//! 地址模块
//!
//! 提供物理地址与虚拟地址的新类型抽象，以及页对齐相关操作。
//!
//! 与全局页大小解耦：页大小属于具体的地址空间（见
//! [`PageMapper::page_size`](crate::PageMapper::page_size)），
//! 因此所有对齐操作都显式接收对齐粒度。
//!
//! # 地址类型
//!
//! - [`Paddr`] - 物理地址
//! - [`Vaddr`] - 虚拟地址
//!
//! # 操作
//!
//! - [`UsizeConvert`] - 在类型和 usize 之间进行转换
//! - [`AlignOps`] - 地址对齐操作

mod operations;

pub use operations::{AlignOps, UsizeConvert, align_down, align_up};

/// `impl_address!` 宏
/// ---------------------
/// 为地址新类型实现 [`UsizeConvert`]、[`AlignOps`] 以及按字节偏移的加法。
///
/// # 使用示例
/// ```ignore
/// #[repr(transparent)]
/// #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
/// pub struct MyAddr(pub usize);
/// impl_address!(MyAddr);
/// ```
#[macro_export]
macro_rules! impl_address {
    ($type:ty) => {
        impl $crate::address::UsizeConvert for $type {
            fn as_usize(&self) -> usize {
                self.0
            }

            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        impl $crate::address::AlignOps for $type {}

        impl core::ops::Add<usize> for $type {
            type Output = Self;

            fn add(self, rhs: usize) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl core::ops::AddAssign<usize> for $type {
            fn add_assign(&mut self, rhs: usize) {
                self.0 += rhs;
            }
        }

        impl core::fmt::LowerHex for $type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

/// [Paddr] (Physical Address)
/// ---------------------
/// 物理地址。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Paddr(pub usize);
impl_address!(Paddr);

/// [Vaddr] (Virtual Address)
/// ---------------------
/// 虚拟地址。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Vaddr(pub usize);
impl_address!(Vaddr);

impl Vaddr {
    /// 从指针构造虚拟地址
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// 转换为裸指针
    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }
}
