//! FAT ramdisk 驱动
//!
//! 只读、常驻内存的 FAT12/16/32 镜像，支持零拷贝 mmap：
//!
//! - [`layout`]: BPB 解析与簇号到字节范围的换算
//! - [`walker`]: FAT 表项读取与簇链分类
//! - [`align`]: 首个数据扇区的页对齐（构建时与启动时两种实现）
//! - [`FatFsDevice::prepare_for_mmap`]: 挂载时开启 mmap 能力
//! - [`FatHandle::map_region`]: 沿簇链建立用户映射
//!
//! # 前提
//!
//! 簇大小必须是页大小的整数倍，且首个数据扇区页对齐。此时每个簇都从页边界开始，
//! 文件的每一页都能直接映射到镜像中对应的物理页。

pub mod align;
mod device;
mod dir;
mod error;
pub mod layout;
mod mmap;
mod prepare;
pub mod walker;

#[cfg(test)]
mod tests;

pub use align::{AlignFirstDataSector, AlignOutcome, OfflineImage, ResidentRamdisk};
pub use device::{FatFsDevice, FatHandle, RamdiskImage};
pub use dir::{FatAttr, FatEntry, to_short_name};
pub use error::{IntegrityKind, IntegrityViolation, MmapError, MmapResult};
pub use layout::{FatLayout, FatType};
pub use walker::ClusterLink;
