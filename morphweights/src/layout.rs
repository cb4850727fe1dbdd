//! タグ階層の大きさと素性キーのビット幅
//!
//! 初期化時にモデルの語彙から一度だけ計算され、以後は変更されません。

use rkyv::{Archive, Deserialize, Serialize};

use crate::encoder::bits_needed;
use crate::errors::{MorphError, Result};
use crate::model::{MorphDictionary, MorphModel};
use crate::options::MorphOptions;
use crate::utils::FromU32;

/// 接頭辞・接尾辞素性に使う最大文字数
pub const MAX_AFFIX_LENGTH: usize = 10;

/// 出力素性の種類数の上限。素性種別フィールドのビット幅を決めます。
pub const NUM_STATE_FEATURES: u64 = 3 + 2 + 3 + 1 + MAX_AFFIX_LENGTH as u64 * 2 + 1 + 3;

/// 単語シグネチャのビット幅
pub const SIGNATURE_BITS: u32 = 4;

/// タグ階層の大きさと各フィールドのビット幅
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct TagLayout {
    pub(crate) num_tags: Vec<u32>,
    pub(crate) tag_bits: Vec<u32>,
    pub(crate) sub_tag_start: u32,
    pub(crate) total_num_tags: u32,
    pub(crate) word_bits: u32,
    pub(crate) state_feature_bits: u32,
    pub(crate) char_bits: u32,
    pub(crate) shape_bits: u32,
    pub(crate) order_bits: u32,
    pub(crate) level_bits: u32,
    pub(crate) token_feature_bits: u32,
    pub(crate) dict_bits: u32,
}

impl TagLayout {
    /// モデルの語彙から大きさとビット幅を計算します。
    ///
    /// # エラー
    ///
    /// タグ階層が空の場合、語彙が空のレベルがある場合、
    /// タグの総数が32ビットに収まらない場合に [`MorphError`] が返されます。
    pub fn new<M>(
        model: &M,
        options: &MorphOptions,
        dict: Option<&dyn MorphDictionary>,
    ) -> Result<Self>
    where
        M: MorphModel + ?Sized,
    {
        let max_level = model.num_levels();
        if max_level == 0 {
            return Err(MorphError::invalid_state(
                "cannot lay out the weight table",
                "the model has no tag levels",
            ));
        }

        let mut num_tags = Vec::with_capacity(max_level);
        let mut tag_bits = Vec::with_capacity(max_level);
        let mut total_num_tags = 0u32;
        for level in 0..max_level {
            let n = model.num_tags(level);
            if n == 0 {
                return Err(MorphError::invalid_state(
                    "cannot lay out the weight table",
                    format!("tag level {level} is empty"),
                ));
            }
            let n = u32::try_from(n)?;
            num_tags.push(n);
            tag_bits.push(bits_needed(u64::from(n)));
            total_num_tags = total_num_tags.checked_add(n).ok_or_else(|| {
                MorphError::invalid_argument("num_tags", "total number of tags exceeds u32")
            })?;
        }

        let sub_tag_start = total_num_tags;
        total_num_tags = total_num_tags
            .checked_add(u32::try_from(model.num_sub_tags())?)
            .ok_or_else(|| {
                MorphError::invalid_argument("num_sub_tags", "total number of tags exceeds u32")
            })?;

        let shape_bits = if options.shape {
            bits_needed(model.num_shapes() as u64)
        } else {
            0
        };

        Ok(Self {
            num_tags,
            tag_bits,
            sub_tag_start,
            total_num_tags,
            word_bits: bits_needed(model.num_words() as u64),
            state_feature_bits: bits_needed(NUM_STATE_FEATURES),
            char_bits: bits_needed(model.num_chars() as u64),
            shape_bits,
            order_bits: bits_needed(u64::from(model.order())),
            level_bits: bits_needed(max_level as u64),
            token_feature_bits: bits_needed(model.num_token_features() as u64),
            dict_bits: dict.map_or(0, |d| bits_needed(d.num_tags() as u64)),
        })
    }

    /// タグ階層のレベル数を返します。
    #[inline(always)]
    pub fn max_level(&self) -> usize {
        self.num_tags.len()
    }

    /// 指定レベルのタグ語彙数を返します。
    #[inline(always)]
    pub fn num_tags(&self, level: u32) -> u32 {
        self.num_tags[usize::from_u32(level)]
    }

    /// 指定レベルのタグ番号のビット幅を返します。
    #[inline(always)]
    pub fn tag_bits(&self, level: u32) -> u32 {
        self.tag_bits[usize::from_u32(level)]
    }

    /// サブタグを含むタグの総数を返します。
    #[inline(always)]
    pub fn total_num_tags(&self) -> u32 {
        self.total_num_tags
    }

    /// (レベル, レベル内タグ番号) を全レベル共通のタグ番号に変換します。
    ///
    /// 浅いレベルの語彙数の累積だけずらした値です。
    #[inline]
    pub fn universal_index(&self, level: u32, tag: u32) -> u32 {
        let offset: u32 = self.num_tags[..usize::from_u32(level)].iter().sum();
        offset + tag
    }

    /// サブタグの全レベル共通タグ番号を返します。
    ///
    /// サブタグは全レベルの語彙の直後に配置されます。
    #[inline(always)]
    pub fn sub_tag_index(&self, sub_tag: u32) -> u32 {
        self.sub_tag_start + sub_tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{TestDictionary, TestModel};

    #[test]
    fn test_layout() {
        let model = TestModel::new(&[4, 10]).sub_tags(3).vocab(100, 30, 5, 2);
        let layout = TagLayout::new(&model, &MorphOptions::new(), None).unwrap();

        assert_eq!(2, layout.max_level());
        assert_eq!(vec![3, 4], layout.tag_bits);
        assert_eq!(14, layout.sub_tag_start);
        assert_eq!(17, layout.total_num_tags());
        assert_eq!(7, layout.word_bits);
        assert_eq!(6, layout.state_feature_bits);
        assert_eq!(5, layout.char_bits);
        assert_eq!(0, layout.shape_bits);
        assert_eq!(2, layout.level_bits);
        assert_eq!(2, layout.token_feature_bits);
        assert_eq!(0, layout.dict_bits);
    }

    #[test]
    fn test_shape_and_dictionary_bits() {
        let model = TestModel::new(&[4]).vocab(10, 10, 5, 0);
        let dict = TestDictionary::new(&[("a", &[0, 1])], 9);
        let layout =
            TagLayout::new(&model, &MorphOptions::new().shape(true), Some(&dict)).unwrap();
        assert_eq!(3, layout.shape_bits);
        assert_eq!(4, layout.dict_bits);
    }

    #[test]
    fn test_universal_index() {
        let model = TestModel::new(&[4, 10, 2]).sub_tags(5);
        let layout = TagLayout::new(&model, &MorphOptions::new(), None).unwrap();
        assert_eq!(3, layout.universal_index(0, 3));
        assert_eq!(4, layout.universal_index(1, 0));
        assert_eq!(15, layout.universal_index(2, 1));
        assert_eq!(16, layout.sub_tag_index(0));
        assert_eq!(20, layout.sub_tag_index(4));
        assert_eq!(21, layout.total_num_tags());
    }

    #[test]
    fn test_no_levels() {
        let model = TestModel::new(&[]);
        assert!(matches!(
            TagLayout::new(&model, &MorphOptions::new(), None),
            Err(MorphError::InvalidState(_))
        ));
    }

    #[test]
    fn test_empty_level() {
        let model = TestModel::new(&[3, 0]);
        assert!(matches!(
            TagLayout::new(&model, &MorphOptions::new(), None),
            Err(MorphError::InvalidState(_))
        ));
    }
}
