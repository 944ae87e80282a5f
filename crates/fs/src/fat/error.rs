//! FAT mmap 错误类型
//!
//! 可恢复错误通过 [`MmapError`] 返回，经分发层转换为 errno；
//! 镜像损坏则是 [`IntegrityViolation`]，它不能转换为任何 `Result` 错误，只能 [`halt`](IntegrityViolation::halt)。

use vfs::FsError;

/// 可恢复的 mmap 错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmapError {
    /// 此挂载点不支持 mmap（对齐或簇大小前提不满足）
    Unsupported,
    /// 不能映射目录
    PermissionDenied,
    /// 页映射中途资源耗尽
    ResourceExhausted,
    /// 簇大小不是页大小的倍数，或没有足够空间修复对齐
    Misconfiguration,
    /// 请求的区域越过地址上界
    InvalidArgument,
}

/// mmap 操作的结果类型
pub type MmapResult<T> = Result<T, MmapError>;

impl From<MmapError> for FsError {
    fn from(e: MmapError) -> Self {
        match e {
            MmapError::Unsupported => FsError::NoDevice,
            MmapError::PermissionDenied => FsError::PermissionDenied,
            MmapError::ResourceExhausted => FsError::OutOfMemory,
            MmapError::Misconfiguration => FsError::NotSupported,
            MmapError::InvalidArgument => FsError::InvalidArgument,
        }
    }
}

/// 镜像完整性破坏的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    /// 簇链中出现坏簇标记
    BadCluster,
    /// 簇链指向空闲、保留或越界的簇号
    CorruptChain {
        /// FAT 表项原始值
        raw: u32,
    },
    /// 簇的数据范围超出镜像
    ClusterOutOfImage,
    /// ramdisk 比镜像已使用的字节数还小
    ImageOverflow {
        /// 镜像已使用的字节数
        used: usize,
        /// ramdisk 大小
        size: usize,
    },
}

/// 只读且受信任的镜像被破坏
///
/// 不可恢复：调用方只能 [`halt`](Self::halt)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct IntegrityViolation {
    /// 出问题的簇号（与簇无关时为 0）
    pub cluster: u32,
    /// 破坏种类
    pub kind: IntegrityKind,
}

impl IntegrityViolation {
    /// 创建与某个簇相关的完整性破坏
    pub const fn new(cluster: u32, kind: IntegrityKind) -> Self {
        Self { cluster, kind }
    }

    /// 停机
    pub fn halt(self) -> ! {
        log::error!(
            "fat: integrity violation at cluster {}: {:?}",
            self.cluster,
            self.kind
        );
        panic!("fat: corrupted ramdisk image ({:?})", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmap_error_errno() {
        assert_eq!(FsError::from(MmapError::Unsupported).to_errno(), -19);
        assert_eq!(FsError::from(MmapError::PermissionDenied).to_errno(), -13);
        assert_eq!(FsError::from(MmapError::ResourceExhausted).to_errno(), -12);
        assert_eq!(FsError::from(MmapError::Misconfiguration).to_errno(), -95);
        assert_eq!(FsError::from(MmapError::InvalidArgument).to_errno(), -22);
    }

    #[test]
    #[should_panic(expected = "corrupted ramdisk image")]
    fn test_integrity_violation_halts() {
        IntegrityViolation::new(7, IntegrityKind::BadCluster).halt();
    }
}
