//! 内核虚拟文件系统层（内存映射部分）
//!
//! 此 crate 定义通用分发层与具体文件系统驱动之间的内存映射契约：
//!
//! - [`FileMmap`] trait - 驱动实现的 `mmap` / `munmap` 接口
//! - [`UserMapping`] - 一次用户映射请求的描述符
//! - [`VfsMmFlags`] - 分发层传给驱动的映射标志
//! - [`generic_fs_munmap`] - 通用的映射撤销路径
//! - [`FsError`] - POSIX 兼容错误码

#![no_std]

extern crate alloc;

pub mod error;
mod mmap;

// Re-export error
pub use error::FsError;

// Re-export mmap
pub use mmap::{FileMmap, UserMapping, VfsMmFlags, generic_fs_munmap, vfs_mmap, vfs_munmap};
