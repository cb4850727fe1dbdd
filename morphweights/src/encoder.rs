//! ビット詰めエンコーダ
//!
//! 小さな整数フィールドを1つの素性キーに順に詰め込みます。
//! インスタンスは抽出呼び出しの間で再利用され、`reset` しても領域は解放されません。

use crate::feature::FeatureKey;
use crate::symbol_table::{FeatureTable, Growth};

/// エンコーダが保持できる64ビット語の数
pub const ENCODER_CAPACITY: usize = 10;

const WORD_BITS: u32 = u64::BITS;

/// `n` を表現するのに必要なビット数を返します。
///
/// `n` が0の場合も1を返します。
///
/// # 例
///
/// ```
/// # use morphweights::encoder::bits_needed;
/// assert_eq!(1, bits_needed(0));
/// assert_eq!(1, bits_needed(1));
/// assert_eq!(3, bits_needed(4));
/// assert_eq!(6, bits_needed(33));
/// ```
#[inline(always)]
pub const fn bits_needed(n: u64) -> u32 {
    let bits = WORD_BITS - n.leading_zeros();
    if bits == 0 { 1 } else { bits }
}

/// 素性キーを組み立てるエンコーダ
#[derive(Debug)]
pub struct Encoder {
    key: FeatureKey,
    capacity_bits: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(ENCODER_CAPACITY)
    }
}

impl Encoder {
    /// `capacity` 語分の容量を持つエンコーダを作成します。
    ///
    /// # パニック
    ///
    /// 容量のビット数が `u32` に収まらない場合、パニックします。
    pub fn new(capacity: usize) -> Self {
        let capacity_bits = u32::try_from(capacity)
            .ok()
            .and_then(|c| c.checked_mul(WORD_BITS))
            .expect("encoder capacity is too large");
        Self {
            key: FeatureKey {
                words: Vec::with_capacity(capacity),
                len: 0,
            },
            capacity_bits,
        }
    }

    /// `value` の下位 `n_bits` ビットを現在のキーの末尾に追加します。
    ///
    /// # パニック
    ///
    /// `n_bits` が64を超える場合、または容量を超えて追加しようとした場合にパニックします。
    pub fn append(&mut self, value: u64, n_bits: u32) {
        assert!(n_bits <= WORD_BITS);
        if n_bits == 0 {
            return;
        }
        let end = self.key.len + n_bits;
        assert!(
            end <= self.capacity_bits,
            "encoder overflow: {} bits requested, capacity is {} bits",
            end,
            self.capacity_bits
        );

        let value = if n_bits == WORD_BITS {
            value
        } else {
            value & ((1 << n_bits) - 1)
        };
        let offset = self.key.len % WORD_BITS;
        if offset == 0 {
            self.key.words.push(value);
        } else {
            let last = self.key.words.len() - 1;
            self.key.words[last] |= value << offset;
            if offset + n_bits > WORD_BITS {
                self.key.words.push(value >> (WORD_BITS - offset));
            }
        }
        self.key.len = end;
    }

    /// 真偽値を1ビットとして追加します。
    #[inline(always)]
    pub fn append_bool(&mut self, flag: bool) {
        self.append(u64::from(flag), 1);
    }

    /// ここまでに追加されたビット列を素性テーブルで解決します。
    ///
    /// キーはクリアされないため、続けて追加すれば前置キーを延長した素性を作れます。
    #[inline]
    pub fn resolve<T>(&self, table: &mut T, growth: Growth) -> Option<u32>
    where
        T: FeatureTable + ?Sized,
    {
        table.to_index(&self.key, growth)
    }

    /// 現在のキーを返します。
    #[inline(always)]
    pub fn key(&self) -> &FeatureKey {
        &self.key
    }

    /// 現在のビット長を返します。
    #[inline(always)]
    pub fn len_bits(&self) -> u32 {
        self.key.len
    }

    /// キーをクリアします。
    #[inline]
    pub fn reset(&mut self) {
        self.key.words.clear();
        self.key.len = 0;
    }
}
