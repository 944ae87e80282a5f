//! 测试支持 crate
//!
//! 提供 Mock 实现和测试工具

#![no_std]

extern crate alloc;

pub mod fat_image;
pub mod mock;

/// 泄漏一块内存作为驻留内存的 ramdisk
///
/// 测试中的 ramdisk 需要 `'static` 生命周期，与内核中常驻的镜像一致。
pub fn leak_image(bytes: alloc::vec::Vec<u8>) -> &'static mut [u8] {
    alloc::boxed::Box::leak(bytes.into_boxed_slice())
}
