//! 重みベクトルが利用する外部コンポーネントのインターフェース
//!
//! タグ語彙、低頻度語の判定、観測済み組合せの検索などはモデルが持ち、
//! 重みベクトルは本モジュールのトレイトを通してのみそれらを参照します。

/// 重みベクトルが参照するモデル
pub trait MorphModel {
    /// マルコフ次数を返します。
    fn order(&self) -> u32;

    /// タグ階層のレベル数を返します。
    fn num_levels(&self) -> usize;

    /// 指定レベルのタグ語彙数を返します。
    fn num_tags(&self, level: usize) -> usize;

    /// サブタグ空間の大きさを返します。
    fn num_sub_tags(&self) -> usize;

    /// 指定レベルのタグに対応付けられたサブタグを返します。
    ///
    /// 対応表を持たないレベルや、対応するサブタグのないタグでは`None`を返します。
    fn sub_tags(&self, level: usize, tag: u32) -> Option<&[u32]>;

    /// 単語形が低頻度語かどうかを返します。
    ///
    /// `word` は単語形ID。未知語の場合は`None`。
    fn is_rare(&self, word: Option<u32>) -> bool;

    /// 単語形・レベル・全レベルのタグ割り当ての組合せが学習時に観測されたかを返します。
    ///
    /// `product_index` は各レベルのタグを混合基数で1つの整数にまとめた値です。
    fn has_been_observed(&self, word: Option<u32>, level: u32, product_index: u64) -> bool;

    /// 単語形の語彙数を返します。
    fn num_words(&self) -> usize;

    /// 文字の語彙数を返します。
    fn num_chars(&self) -> usize;

    /// 語形状の種類数を返します。
    fn num_shapes(&self) -> usize;

    /// トークン素性の語彙数を返します。
    fn num_token_features(&self) -> usize;
}

/// 形態素辞書
///
/// 単語形から辞書候補の番号を引きます。
pub trait MorphDictionary: Send + Sync {
    /// 単語形に対応する辞書候補を返します。
    fn candidates(&self, form: &str) -> Option<&[u32]>;

    /// 候補番号の種類数を返します。
    fn num_tags(&self) -> usize;
}

/// 文中の1トークン
///
/// 各IDは外部のシンボルテーブルで割り当てられたものです。未知の値は`None`で表します。
#[derive(Clone, Debug, Default)]
pub struct Word {
    form: String,
    form_index: Option<u32>,
    shape_index: Option<u32>,
    signature: u32,
    chars: Vec<Option<u32>>,
    token_features: Vec<Option<u32>>,
}

impl Word {
    /// 新しいトークンを作成します。
    ///
    /// # 引数
    ///
    /// * `form` - 単語形
    /// * `form_index` - 単語形ID
    /// * `chars` - 各文字のID
    pub fn new<S>(form: S, form_index: Option<u32>, chars: Vec<Option<u32>>) -> Self
    where
        S: Into<String>,
    {
        Self {
            form: form.into(),
            form_index,
            chars,
            ..Self::default()
        }
    }

    /// 語形状IDを設定します。
    pub fn with_shape(mut self, shape_index: Option<u32>) -> Self {
        self.shape_index = shape_index;
        self
    }

    /// 単語シグネチャを設定します。下位4ビットのみが素性に使われます。
    pub fn with_signature(mut self, signature: u32) -> Self {
        self.signature = signature;
        self
    }

    /// トークン素性を設定します。
    pub fn with_token_features(mut self, token_features: Vec<Option<u32>>) -> Self {
        self.token_features = token_features;
        self
    }

    /// 単語形を返します。
    #[inline(always)]
    pub fn form(&self) -> &str {
        &self.form
    }

    /// 単語形IDを返します。
    #[inline(always)]
    pub fn form_index(&self) -> Option<u32> {
        self.form_index
    }

    /// 語形状IDを返します。
    #[inline(always)]
    pub fn shape_index(&self) -> Option<u32> {
        self.shape_index
    }

    /// 単語シグネチャを返します。
    #[inline(always)]
    pub fn signature(&self) -> u32 {
        self.signature
    }

    /// 各文字のIDを返します。
    #[inline(always)]
    pub fn chars(&self) -> &[Option<u32>] {
        &self.chars
    }

    /// トークン素性を返します。
    #[inline(always)]
    pub fn token_features(&self) -> &[Option<u32>] {
        &self.token_features
    }
}
