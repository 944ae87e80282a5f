//! VFS 错误类型
//!
//! 分发层返回给系统调用的错误，通过 [`FsError::to_errno()`] 转换为负的 errno。

use mm::PagingError;

/// 映射请求的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 无效的地址、长度或偏移 (-EINVAL)
    InvalidArgument,
    /// 不能映射此类文件 (-EACCES)
    PermissionDenied,
    /// 挂载点不提供 mmap (-ENODEV)
    NoDevice,
    /// 建立页映射时内存耗尽 (-ENOMEM)
    OutOfMemory,
    /// 镜像配置不满足映射前提 (-ENOTSUP)
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            FsError::OutOfMemory => -12,
            FsError::PermissionDenied => -13,
            FsError::NoDevice => -19,
            FsError::InvalidArgument => -22,
            FsError::NotSupported => -95,
        }
    }
}

impl From<PagingError> for FsError {
    fn from(e: PagingError) -> Self {
        match e {
            PagingError::FrameAllocFailed | PagingError::OutOfMemory => FsError::OutOfMemory,
            PagingError::NotMapped
            | PagingError::AlreadyMapped
            | PagingError::InvalidAddress
            | PagingError::InvalidFlags => FsError::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_error_conversion() {
        assert_eq!(FsError::from(PagingError::OutOfMemory), FsError::OutOfMemory);
        assert_eq!(FsError::from(PagingError::NotMapped).to_errno(), -22);
    }
}
