//! 素性キーと素性ベクトルの定義
//!
//! 素性キーは [`Encoder`](crate::encoder::Encoder) が組み立てるビット列で、
//! 素性テーブルによって密な素性IDに変換されます。
//! 素性ベクトルは1つの文脈(トークンの出力、または1つの遷移)を表す素性IDの列です。

use std::ops::Deref;

use rkyv::{Archive, Deserialize, Serialize};

/// ビット詰めされた素性キー
///
/// 64ビット語の列とビット長の組です。ビット長と内容が一致する場合のみ等しくなります。
#[derive(Clone, Default, Eq, PartialEq, Hash, Debug, Archive, Serialize, Deserialize)]
#[rkyv(derive(Hash, PartialEq, Eq, Debug))]
pub struct FeatureKey {
    pub(crate) words: Vec<u64>,
    pub(crate) len: u32,
}

impl FeatureKey {
    /// キーのビット長を返します。
    #[inline(always)]
    pub fn len_bits(&self) -> u32 {
        self.len
    }

    /// キーが空かどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// キーを構成する64ビット語の列を返します。
    #[inline(always)]
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

/// 出力素性の種類
///
/// キーの先頭に序数として埋め込まれ、種類の異なる素性が
/// 同じビット列にならないようにします。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum FeatureClass {
    /// 単語形
    Form = 0,
    /// 低頻度語かどうか
    Rare = 1,
    /// 直前の単語形(現在の単語形との連言を含む)
    PrevForm = 2,
    /// 直前の語形状
    PrevShape = 3,
    /// 直後の単語形(現在の単語形との連言を含む)
    NextForm = 4,
    /// 直後の語形状
    NextShape = 5,
    /// 語形状
    Shape = 6,
    /// 単語シグネチャ
    Signature = 7,
    /// 接頭辞
    Prefix = 8,
    /// 接尾辞
    Suffix = 9,
    /// 外部から与えられるトークン素性
    Token = 10,
    /// 形態素辞書の候補
    Dictionary = 11,
}

impl FeatureClass {
    /// キーに埋め込む序数を返します。
    #[inline(always)]
    pub const fn ordinal(self) -> u64 {
        self as u64
    }
}

/// 素性IDの列
///
/// 出力素性ベクトル(`is_state`)は、観測済みバイアス項のために単語形IDを保持します。
#[derive(Clone, Default, PartialEq, Debug)]
pub struct FeatureVector {
    ids: Vec<u32>,
    is_state: bool,
    word_index: Option<u32>,
}

impl FeatureVector {
    /// 空の遷移素性ベクトルを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定容量で空の素性ベクトルを作成します。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// 出力素性ベクトルを作成します。
    ///
    /// # 引数
    ///
    /// * `word_index` - トークンの単語形ID。未知語の場合は`None`。
    pub fn state(word_index: Option<u32>) -> Self {
        Self {
            ids: vec![],
            is_state: true,
            word_index,
        }
    }

    /// 素性IDを追加します。`None` (未知の素性) は無視されます。
    #[inline]
    pub fn push(&mut self, id: Option<u32>) {
        if let Some(id) = id {
            self.ids.push(id);
        }
    }

    /// 出力素性ベクトルかどうかを返します。
    #[inline(always)]
    pub fn is_state(&self) -> bool {
        self.is_state
    }

    pub(crate) fn set_state(&mut self, word_index: Option<u32>) {
        self.is_state = true;
        self.word_index = word_index;
    }

    /// 単語形IDを返します。
    #[inline(always)]
    pub fn word_index(&self) -> Option<u32> {
        self.word_index
    }
}

impl Deref for FeatureVector {
    type Target = [u32];

    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl Extend<u32> for FeatureVector {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

impl FromIterator<u32> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_unknown() {
        let mut v = FeatureVector::state(Some(3));
        v.push(Some(1));
        v.push(None);
        v.push(Some(7));
        assert_eq!(&[1, 7], &v[..]);
        assert!(v.is_state());
        assert_eq!(Some(3), v.word_index());
    }

    #[test]
    fn test_transition_vector() {
        let v: FeatureVector = [4, 5].into_iter().collect();
        assert!(!v.is_state());
        assert_eq!(None, v.word_index());
        assert_eq!(2, v.len());
    }
}
