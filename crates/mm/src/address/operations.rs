//! 地址通用操作 trait

/// 在类型和 usize 之间进行转换
pub trait UsizeConvert: Copy {
    /// 转换为 usize
    fn as_usize(&self) -> usize;

    /// 从 usize 构造
    fn from_usize(value: usize) -> Self;
}

/// 地址对齐操作
///
/// `align` 必须是 2 的幂。
pub trait AlignOps: UsizeConvert {
    /// 检查是否按 `align` 对齐
    fn is_aligned(self, align: usize) -> bool {
        self.as_usize() & (align - 1) == 0
    }

    /// 向下对齐到 `align`
    fn align_down(self, align: usize) -> Self {
        Self::from_usize(align_down(self.as_usize(), align))
    }

    /// 向上对齐到 `align`
    fn align_up(self, align: usize) -> Self {
        Self::from_usize(align_up(self.as_usize(), align))
    }
}

/// 将 `value` 向下对齐到 `align`（2 的幂）
#[inline]
pub const fn align_down(value: usize, align: usize) -> usize {
    value & !(align - 1)
}

/// 将 `value` 向上对齐到 `align`（2 的幂）
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
