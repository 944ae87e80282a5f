//! # 文件系统模块 (FS)
//!
//! 本模块提供只读 FAT ramdisk 驱动，支持把文件零拷贝地映射进进程地址空间。
//!
//! ## 组成
//!
//! - **[fat]**: FAT12/16/32 布局解析、簇链遍历、数据区对齐修复、mmap 实现
//! - **[ops]**: 驱动依赖的运行时操作（地址转换、平台内存布局）

#![no_std]
#![doc = "文件系统实现"]

extern crate alloc;

pub mod fat;
pub mod ops;

pub use fat::{
    AlignFirstDataSector, AlignOutcome, ClusterLink, FatAttr, FatEntry, FatFsDevice, FatHandle,
    FatLayout, FatType, IntegrityKind, IntegrityViolation, MmapError, MmapResult, OfflineImage,
    RamdiskImage, ResidentRamdisk,
};
pub use ops::{FsOps, fs_ops, register_fs_ops};
