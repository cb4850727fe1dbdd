//! テスト用ユーティリティ
//!
//! テストコードで使用するマクロと、メモリ上のモデル・辞書を提供します。

use hashbrown::{HashMap, HashSet};

use crate::model::{MorphDictionary, MorphModel, Word};

macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

pub(crate) use hashmap;

/// メモリ上のモデル
///
/// 未知語(`None`)は常に低頻度語として扱います。
pub(crate) struct TestModel {
    order: u32,
    num_tags: Vec<usize>,
    num_sub_tags: usize,
    sub_tags: HashMap<(usize, u32), Vec<u32>>,
    rare: HashSet<u32>,
    observed: HashSet<(Option<u32>, u32, u64)>,
    num_words: usize,
    num_chars: usize,
    num_shapes: usize,
    num_token_features: usize,
}

impl TestModel {
    pub fn new(num_tags: &[usize]) -> Self {
        Self {
            order: 1,
            num_tags: num_tags.to_vec(),
            num_sub_tags: 0,
            sub_tags: HashMap::new(),
            rare: HashSet::new(),
            observed: HashSet::new(),
            num_words: 16,
            num_chars: 16,
            num_shapes: 4,
            num_token_features: 1,
        }
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn sub_tags(mut self, n: usize) -> Self {
        self.num_sub_tags = n;
        self
    }

    pub fn map_sub_tags(mut self, map: HashMap<(usize, u32), Vec<u32>>) -> Self {
        self.sub_tags = map;
        self
    }

    pub fn vocab(mut self, words: usize, chars: usize, shapes: usize, token_features: usize) -> Self {
        self.num_words = words;
        self.num_chars = chars;
        self.num_shapes = shapes;
        self.num_token_features = token_features;
        self
    }

    pub fn rare(mut self, words: &[u32]) -> Self {
        self.rare.extend(words.iter().copied());
        self
    }

    pub fn observe(mut self, word: Option<u32>, level: u32, product_index: u64) -> Self {
        self.observed.insert((word, level, product_index));
        self
    }
}

impl MorphModel for TestModel {
    fn order(&self) -> u32 {
        self.order
    }

    fn num_levels(&self) -> usize {
        self.num_tags.len()
    }

    fn num_tags(&self, level: usize) -> usize {
        self.num_tags[level]
    }

    fn num_sub_tags(&self) -> usize {
        self.num_sub_tags
    }

    fn sub_tags(&self, level: usize, tag: u32) -> Option<&[u32]> {
        self.sub_tags.get(&(level, tag)).map(Vec::as_slice)
    }

    fn is_rare(&self, word: Option<u32>) -> bool {
        word.is_none_or(|w| self.rare.contains(&w))
    }

    fn has_been_observed(&self, word: Option<u32>, level: u32, product_index: u64) -> bool {
        self.observed.contains(&(word, level, product_index))
    }

    fn num_words(&self) -> usize {
        self.num_words
    }

    fn num_chars(&self) -> usize {
        self.num_chars
    }

    fn num_shapes(&self) -> usize {
        self.num_shapes
    }

    fn num_token_features(&self) -> usize {
        self.num_token_features
    }
}

/// メモリ上の形態素辞書
pub(crate) struct TestDictionary {
    entries: HashMap<String, Vec<u32>>,
    num_tags: usize,
}

impl TestDictionary {
    pub fn new(entries: &[(&str, &[u32])], num_tags: usize) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(form, tags)| (form.to_string(), tags.to_vec()))
                .collect(),
            num_tags,
        }
    }
}

impl MorphDictionary for TestDictionary {
    fn candidates(&self, form: &str) -> Option<&[u32]> {
        self.entries.get(form).map(Vec::as_slice)
    }

    fn num_tags(&self) -> usize {
        self.num_tags
    }
}

/// 文字列の各文字を `a` からの距離で文字IDに変換したトークンを作成します。
///
/// `a`-`p` 以外の文字は未知の文字になります。
pub(crate) fn word(form: &str, form_index: Option<u32>) -> Word {
    let chars = form
        .chars()
        .map(|c| {
            let d = u32::from(c).wrapping_sub(u32::from('a'));
            (d < 16).then_some(d)
        })
        .collect();
    Word::new(form, form_index, chars)
}
