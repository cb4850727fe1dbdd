//! 添字の変換とテーブルサイズの丸め

/// タグ番号やレベルなどの `u32` 値を添字に変換するトレイト
pub trait FromU32 {
    /// `u32` 値から変換します。
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // usize is at least 32 bits wide here.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// `n` 以上の最小の2のべき乗を返します。
///
/// `n` が0の場合は1を返します。オーバーフローする場合は`None`を返します。
#[inline]
pub fn ceil_power_of_two(n: usize) -> Option<usize> {
    n.max(1).checked_next_power_of_two()
}

/// `n` 以下の最大の2のべき乗を返します。
///
/// `n` が0の場合は`None`を返します。
#[inline]
pub fn floor_power_of_two(n: usize) -> Option<usize> {
    if n == 0 {
        None
    } else {
        Some(1 << (usize::BITS - 1 - n.leading_zeros()))
    }
}
