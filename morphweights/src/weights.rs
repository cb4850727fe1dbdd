//! 階層タグ用のハッシュ化重みベクトル
//!
//! 素性ID × 全レベル共通タグ番号の組は、固定のハッシュ関数とマスクによって
//! 固定長の重みテーブルの1スロットに写像されます。衝突は解決されず、
//! 衝突した組は同じ重みを共有します。
//!
//! テーブル末尾の `2 * max_level` 個のスロットは観測済みバイアス用に予約されており、
//! レベルごとに「観測済み」「未観測」の2スロットを持ちます。
//!
//! L1正則化は累積ペナルティ方式で遅延適用されます。

use crate::encoder::Encoder;
use crate::errors::{MorphError, Result};
use crate::feature::{FeatureClass, FeatureVector};
use crate::lattice::{StateId, StateLattice};
use crate::layout::{MAX_AFFIX_LENGTH, NUM_STATE_FEATURES, SIGNATURE_BITS, TagLayout};
use crate::model::{MorphDictionary, MorphModel, Word};
use crate::options::MorphOptions;
use crate::symbol_table::{FeatureTable, Growth, SymbolTable};
use crate::utils::{self, FromU32};

/// この値より絶対値の小さい重みは0とみなし、ペナルティを適用しません。
const PENALTY_EPSILON: f64 = 1e-10;

/// (素性ID, 全レベル共通タグ番号) を重みテーブルのスロットに写像します。
///
/// `capacity` は2のべき乗でなければなりません。
/// シフト量は学習済みテーブルとの互換性のため固定です。
#[inline]
pub(crate) fn hash_slot(feature: u32, total_num_tags: u32, tag: u32, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    let mut h = feature.wrapping_mul(total_num_tags).wrapping_add(tag);
    h ^= (h >> 20) ^ (h >> 12);
    h ^= (h >> 7) ^ (h >> 4);
    usize::from_u32(h) & (capacity - 1)
}

/// 累積L1ペナルティの状態
#[derive(Debug)]
struct Penalty {
    linear: f64,
    // Total shrinkage already applied to each slot.
    accumulated: Vec<f64>,
}

impl Penalty {
    fn new(linear: f64, len: usize) -> Self {
        Self {
            linear,
            accumulated: vec![0.0; len],
        }
    }

    #[inline]
    fn apply(&mut self, slot: usize, z: f64) -> f64 {
        let mut weight = z;
        if z - PENALTY_EPSILON > 0.0 {
            weight = f64::max(0.0, z - (self.linear + self.accumulated[slot]));
        } else if z + PENALTY_EPSILON < 0.0 {
            weight = f64::min(0.0, z + (self.linear - self.accumulated[slot]));
        }
        self.accumulated[slot] += weight - z;
        weight
    }
}

/// 出力素性キーを組み立てるための借用の束
struct KeyWriter<'a, T: ?Sized> {
    encoder: &'a mut Encoder,
    table: &'a mut T,
    layout: &'a TagLayout,
    growth: Growth,
}

impl<T> KeyWriter<'_, T>
where
    T: FeatureTable + ?Sized,
{
    #[inline]
    fn start_state(&mut self, class: FeatureClass) {
        self.encoder.append(0, self.layout.order_bits);
        self.encoder.append(0, self.layout.level_bits);
        self.encoder.append(class.ordinal(), self.layout.state_feature_bits);
    }

    #[inline(always)]
    fn append(&mut self, value: u32, n_bits: u32) {
        self.encoder.append(u64::from(value), n_bits);
    }

    #[inline(always)]
    fn resolve(&mut self) -> Option<u32> {
        self.encoder.resolve(&mut *self.table, self.growth)
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.encoder.reset();
    }
}

/// 階層タグ用のハッシュ化重みベクトル
///
/// 素性抽出、スコア計算、重み更新を提供します。
/// 内部状態(エンコーダ、重み、累積ペナルティ)はロックなしで変更されるため、
/// 1つのインスタンスを同時に更新できるのは1つのスレッドだけです。
pub struct MorphWeightVector<T = SymbolTable> {
    options: MorphOptions,
    layout: TagLayout,
    table: T,
    growth: Growth,
    dict: Option<Box<dyn MorphDictionary>>,
    encoder: Encoder,
    weights: Vec<f64>,
    // Largest power of two not exceeding the unreserved part of `weights`.
    capacity: usize,
    penalty: Option<Penalty>,
    scale_factor: f64,
}

impl MorphWeightVector<SymbolTable> {
    /// モデルの語彙から重みベクトルを初期化します。
    ///
    /// タグ階層の大きさとビット幅を計算し、初期サイズ以上の最小の2のべき乗に
    /// 予約スロット `2 * max_level` 個を加えた長さの重みテーブルを確保します。
    /// 素性テーブルは新しいキーを受け付ける状態で始まります。
    ///
    /// # 引数
    ///
    /// * `options` - 設定
    /// * `model` - タグ語彙などを提供するモデル
    /// * `dict` - 形態素辞書。辞書候補素性を使わない場合は`None`。
    ///
    /// # エラー
    ///
    /// モデルのタグ階層が不正な場合、テーブルの大きさがオーバーフローする場合に
    /// [`MorphError`] が返されます。
    pub fn init<M>(
        options: MorphOptions,
        model: &M,
        dict: Option<Box<dyn MorphDictionary>>,
    ) -> Result<Self>
    where
        M: MorphModel + ?Sized,
    {
        Self::with_table(options, model, dict, SymbolTable::new())
    }
}

impl<T> MorphWeightVector<T>
where
    T: FeatureTable,
{
    /// 指定した素性テーブルを使って重みベクトルを初期化します。
    ///
    /// 詳細は [`MorphWeightVector::init`] を参照してください。
    pub fn with_table<M>(
        options: MorphOptions,
        model: &M,
        dict: Option<Box<dyn MorphDictionary>>,
        table: T,
    ) -> Result<Self>
    where
        M: MorphModel + ?Sized,
    {
        let layout = TagLayout::new(model, &options, dict.as_deref())?;
        let capacity = utils::ceil_power_of_two(options.initial_vector_size).ok_or_else(|| {
            MorphError::invalid_argument("initial_vector_size", "too large")
        })?;
        let len = capacity
            .checked_add(2 * layout.max_level())
            .ok_or_else(|| MorphError::invalid_argument("initial_vector_size", "too large"))?;

        log::debug!(
            "weight layout: levels={:?} sub_tag_start={} total_tags={} bits(word={}, char={}, shape={}, order={}, level={}, token={}, dict={})",
            layout.num_tags,
            layout.sub_tag_start,
            layout.total_num_tags,
            layout.word_bits,
            layout.char_bits,
            layout.shape_bits,
            layout.order_bits,
            layout.level_bits,
            layout.token_feature_bits,
            layout.dict_bits,
        );
        log::info!("allocating {} weights (capacity {})", len, capacity);

        Ok(Self {
            options,
            layout,
            table,
            growth: Growth::Insert,
            dict,
            encoder: Encoder::default(),
            weights: vec![0.0; len],
            capacity,
            penalty: None,
            scale_factor: 1.0,
        })
    }

    /// 未知の素性キーに対する振る舞いを変更します。
    ///
    /// 学習から評価に移るときに [`Growth::LookupOnly`] に切り替えます。
    pub fn set_growth(&mut self, growth: Growth) {
        if self.growth != growth {
            log::debug!("feature growth policy: {:?} -> {:?}", self.growth, growth);
        }
        self.growth = growth;
    }

    /// 未知の素性キーに対する現在の振る舞いを返します。
    #[inline(always)]
    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// 設定を返します。
    #[inline(always)]
    pub fn options(&self) -> &MorphOptions {
        &self.options
    }

    /// タグ階層の大きさとビット幅を返します。
    #[inline(always)]
    pub fn layout(&self) -> &TagLayout {
        &self.layout
    }

    /// 素性テーブルを返します。
    #[inline(always)]
    pub fn feature_table(&self) -> &T {
        &self.table
    }

    /// 登録済みの素性数を返します。
    #[inline(always)]
    pub fn num_features(&self) -> usize {
        self.table.len()
    }

    /// 形態素辞書を返します。
    #[inline(always)]
    pub fn dictionary(&self) -> Option<&dyn MorphDictionary> {
        self.dict.as_deref()
    }

    /// 現在のスケール係数を返します。
    #[inline(always)]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// 重みテーブルを返します。
    #[inline(always)]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// 累積ペナルティのテーブルを返します。ペナルティが無効の場合は`None`。
    #[inline(always)]
    pub fn accumulated_penalty(&self) -> Option<&[f64]> {
        self.penalty.as_ref().map(|p| p.accumulated.as_slice())
    }

    /// 重みテーブルを置き換えます。
    ///
    /// ハッシュの範囲は、予約スロットを除いた長さ以下の最大の2のべき乗になります。
    /// ペナルティが有効でテーブル長が変わる場合、累積ペナルティは0から再確保されます。
    ///
    /// # エラー
    ///
    /// テーブルが予約スロットを含めるのに足りない場合、[`MorphError`] が返されます。
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        let reserved = 2 * self.layout.max_level();
        let capacity = weights
            .len()
            .checked_sub(reserved)
            .and_then(utils::floor_power_of_two)
            .ok_or_else(|| {
                MorphError::invalid_argument(
                    "weights",
                    format!(
                        "the table needs more than {} slots, got {}",
                        reserved,
                        weights.len()
                    ),
                )
            })?;

        if let Some(penalty) = self.penalty.as_mut()
            && penalty.accumulated.len() != weights.len()
        {
            log::warn!(
                "weight table resized from {} to {} while penalized; accumulated penalty is reset",
                penalty.accumulated.len(),
                weights.len()
            );
            penalty.accumulated = vec![0.0; weights.len()];
        }

        self.weights = weights;
        self.capacity = capacity;
        Ok(())
    }

    /// L1ペナルティを設定します。
    ///
    /// `Some(rate)` で有効化し、`None` で無効化します。
    /// 有効化のたびに線形ペナルティは現在のスケール係数で割った値に更新されますが、
    /// 累積ペナルティは無効化されるまで保持されます。
    ///
    /// # パニック
    ///
    /// `rate` が負の場合、パニックします。
    pub fn set_penalty(&mut self, rate: Option<f64>) {
        let Some(rate) = rate else {
            if self.penalty.take().is_some() {
                log::debug!("L1 penalty disabled");
            }
            return;
        };
        assert!(rate >= 0.0);

        let linear = rate / self.scale_factor;
        match self.penalty.as_mut() {
            Some(penalty) => penalty.linear = linear,
            None => {
                log::debug!("L1 penalty enabled: rate={}", rate);
                self.penalty = Some(Penalty::new(linear, self.weights.len()));
            }
        }
    }

    /// スケール係数に `factor` を掛けます。
    ///
    /// 学習率の減衰を重みテーブルに触れずにスコア計算に畳み込むために使います。
    pub fn scale_by(&mut self, factor: f64) {
        if let Some(penalty) = self.penalty.as_mut() {
            penalty.linear /= factor;
        }
        self.scale_factor *= factor;
    }

    /// 文中のトークンの出力素性を抽出します。
    ///
    /// 素性テーブルで解決できなかった素性は結果に含まれません。
    ///
    /// # 引数
    ///
    /// * `model` - 低頻度語の判定に使うモデル
    /// * `sentence` - 文
    /// * `token_index` - トークンの位置
    ///
    /// # パニック
    ///
    /// `token_index` が文の範囲外の場合にパニックします。
    pub fn extract_state_features<M>(
        &mut self,
        model: &M,
        sentence: &[Word],
        token_index: usize,
    ) -> FeatureVector
    where
        M: MorphModel + ?Sized,
    {
        let word = &sentence[token_index];
        let form = word.form_index();
        let is_rare = model.is_rare(form);
        let shape = self.options.shape;
        let candidates = self
            .dict
            .as_deref()
            .and_then(|dict| dict.candidates(word.form()))
            .unwrap_or_default();

        let mut features = FeatureVector::with_capacity(
            NUM_STATE_FEATURES as usize + 2 + word.token_features().len() + candidates.len(),
        );
        let layout = &self.layout;
        let mut kw = KeyWriter {
            encoder: &mut self.encoder,
            table: &mut self.table,
            layout,
            growth: self.growth,
        };
        kw.reset();

        if let Some(form) = form {
            kw.start_state(FeatureClass::Form);
            kw.append(form, layout.word_bits);
            features.push(kw.resolve());
            kw.reset();
        }

        kw.start_state(FeatureClass::Rare);
        kw.encoder.append_bool(is_rare);
        features.push(kw.resolve());
        kw.reset();

        let neighbors = [
            (
                token_index.checked_sub(1),
                FeatureClass::PrevForm,
                FeatureClass::PrevShape,
            ),
            (
                Some(token_index + 1).filter(|&i| i < sentence.len()),
                FeatureClass::NextForm,
                FeatureClass::NextShape,
            ),
        ];
        for (neighbor, form_class, shape_class) in neighbors {
            let Some(neighbor) = neighbor.map(|i| &sentence[i]) else {
                continue;
            };

            if let Some(nform) = neighbor.form_index() {
                kw.start_state(form_class);
                kw.append(nform, layout.word_bits);
                features.push(kw.resolve());
                if let Some(form) = form {
                    kw.append(form, layout.word_bits);
                    features.push(kw.resolve());
                }
                kw.reset();
            }

            if shape
                && let Some(nshape) = neighbor.shape_index()
                && model.is_rare(neighbor.form_index())
            {
                kw.start_state(shape_class);
                kw.append(nshape, layout.shape_bits);
                features.push(kw.resolve());
                kw.reset();
            }
        }

        if is_rare
            && shape
            && let Some(shape_index) = word.shape_index()
        {
            kw.start_state(FeatureClass::Shape);
            kw.append(shape_index, layout.shape_bits);
            features.push(kw.resolve());
            kw.reset();
        }

        if is_rare {
            kw.start_state(FeatureClass::Signature);
            kw.append(word.signature(), SIGNATURE_BITS);
            features.push(kw.resolve());
            kw.reset();

            // Every prefix length gets its own feature.
            kw.start_state(FeatureClass::Prefix);
            for &c in word.chars().iter().take(MAX_AFFIX_LENGTH) {
                let Some(c) = c else {
                    break;
                };
                kw.append(c, layout.char_bits);
                features.push(kw.resolve());
            }
            kw.reset();

            kw.start_state(FeatureClass::Suffix);
            for &c in word.chars().iter().rev().take(MAX_AFFIX_LENGTH) {
                let Some(c) = c else {
                    break;
                };
                kw.append(c, layout.char_bits);
                features.push(kw.resolve());
            }
            kw.reset();
        }

        for &token_feature in word.token_features().iter().flatten() {
            kw.start_state(FeatureClass::Token);
            kw.append(token_feature, layout.token_feature_bits);
            features.push(kw.resolve());
            kw.reset();
        }

        for &candidate in candidates {
            kw.start_state(FeatureClass::Dictionary);
            kw.append(candidate, layout.dict_bits);
            features.push(kw.resolve());
            kw.reset();
        }

        features.set_state(form);
        features
    }

    /// ラティス上の状態のタグ付き出力素性を抽出します。
    ///
    /// 0次縮約から下位レベルへ順に (レベル, タグ番号) を追加し、追加のたびに素性を作ります。
    /// 結果は出力素性ベクトルで、状態にキャッシュされた素性ベクトルの単語形IDを引き継ぎます。
    pub fn extract_lattice_state_features(
        &mut self,
        lattice: &StateLattice,
        state: StateId,
    ) -> FeatureVector {
        let level = lattice.level(state);
        let mut features = FeatureVector::with_capacity(usize::from_u32(level) + 1);
        let layout = &self.layout;
        let mut kw = KeyWriter {
            encoder: &mut self.encoder,
            table: &mut self.table,
            layout,
            growth: self.growth,
        };
        kw.reset();

        kw.append(0, layout.order_bits);
        kw.append(level + 1, layout.level_bits);
        kw.append(0, 2);

        let mut run = Some(lattice.zero_order(state));
        while let Some(id) = run {
            let run_level = lattice.level(id);
            kw.append(run_level, layout.level_bits);
            kw.append(lattice.index(id), layout.tag_bits(run_level));
            features.push(kw.resolve());
            run = lattice.sub_level(id);
        }
        kw.reset();

        features.set_state(lattice.vector(state).and_then(FeatureVector::word_index));
        features
    }

    /// ラティス上の状態の遷移素性を抽出します。
    ///
    /// 最も細かいレベルから順に、各深さについて n-gram 連鎖上の全状態の
    /// その深さのタグ番号をまとめた素性を1つ作ります。
    /// 遷移素性レベルの上限を超えるレベルは飛ばされます。
    pub fn extract_transition_features(
        &mut self,
        lattice: &StateLattice,
        state: StateId,
    ) -> FeatureVector {
        let max_level = lattice.level(state);
        let order = lattice.order(state);
        let max_transition_level = self.options.max_transition_feature_level;
        let mut features = FeatureVector::with_capacity(usize::from_u32(max_level) + 1);
        let layout = &self.layout;
        let mut kw = KeyWriter {
            encoder: &mut self.encoder,
            table: &mut self.table,
            layout,
            growth: self.growth,
        };
        kw.reset();

        for depth in 0..=max_level {
            let level = max_level - depth;
            if max_transition_level.is_some_and(|max| level > max) {
                continue;
            }

            kw.append(order, layout.order_bits);
            kw.append(level, layout.level_bits);
            kw.append(0, 1);
            let mut run = Some(state);
            while let Some(id) = run {
                let sub_state = lattice.sub_level_at(id, depth);
                kw.append(lattice.index(sub_state), layout.tag_bits(level));
                run = lattice.previous_sub_order(id);
            }
            features.push(kw.resolve());
            kw.reset();
        }
        features
    }

    #[inline(always)]
    fn slot(&self, feature: u32, tag: u32) -> usize {
        let slot = hash_slot(feature, self.layout.total_num_tags, tag, self.capacity);
        debug_assert!(slot < self.capacity);
        slot
    }

    #[inline]
    fn universal_index(&self, lattice: &StateLattice, state: StateId) -> u32 {
        self.layout
            .universal_index(lattice.level(state), lattice.index(state))
    }

    /// 全レベルのタグ割り当てを混合基数で1つの整数にまとめます。
    ///
    /// 深い階層では桁あふれしますが、観測済み組合せの検索キーとしてのみ使うため
    /// 2^64 を法として折り返します。
    fn product_index(&self, lattice: &StateLattice, state: StateId) -> u64 {
        let level = lattice.level(state);
        let index = u64::from(lattice.index(state));
        if level == 0 {
            return index;
        }
        let sub_state = lattice.sub_level_at(state, 1);
        self.product_index(lattice, sub_state)
            .wrapping_mul(u64::from(self.layout.num_tags(level)))
            .wrapping_add(index)
    }

    fn observed_slot<M>(
        &self,
        model: &M,
        lattice: &StateLattice,
        word_index: Option<u32>,
        state: StateId,
    ) -> usize
    where
        M: MorphModel + ?Sized,
    {
        let level = lattice.level(state);
        let product_index = self.product_index(lattice, state);
        let feature = usize::from(!model.has_been_observed(word_index, level, product_index));
        let start = self.weights.len() - 2 * self.layout.max_level();
        let slot = start + usize::from_u32(level) * 2 + feature;
        debug_assert!(slot < self.weights.len());
        slot
    }

    /// 状態のサブタグに対応する全レベル共通タグ番号を返します。
    fn sub_tag_indices<'m, M>(
        &self,
        model: &'m M,
        lattice: &StateLattice,
        state: StateId,
    ) -> impl Iterator<Item = u32>
    where
        M: MorphModel + ?Sized,
    {
        let level = usize::from_u32(lattice.level(state));
        model
            .sub_tags(level, lattice.index(state))
            .unwrap_or_default()
            .iter()
            .map(move |&sub_tag| self.layout.sub_tag_index(sub_tag))
    }

    /// 状態と素性ベクトルのスコアを計算します。
    ///
    /// 0次縮約のタグに対する素性の重みの和に、サブタグの重みと
    /// (出力素性ベクトルの場合は) 観測済みバイアスを加え、スケール係数を掛けた値です。
    pub fn score<M>(
        &self,
        model: &M,
        lattice: &StateLattice,
        state: StateId,
        vector: &FeatureVector,
    ) -> f64
    where
        M: MorphModel + ?Sized,
    {
        let zero_order = lattice.zero_order(state);
        let tag = self.universal_index(lattice, zero_order);

        let mut score = 0.0;
        for &feature in vector.iter() {
            score += self.weights[self.slot(feature, tag)];
        }

        let mut sub_score = 0.0;
        for sub_tag in self.sub_tag_indices(model, lattice, zero_order) {
            for &feature in vector.iter() {
                sub_score += self.weights[self.slot(feature, sub_tag)];
            }
        }
        score += sub_score;

        if vector.is_state() {
            score += self.weights[self.observed_slot(model, lattice, vector.word_index(), state)];
        }

        score * self.scale_factor
    }

    /// 状態に勾配を加算します。
    ///
    /// `value` はスケール係数で割ってから適用されます。
    /// 1次の状態では下位レベルの状態にも再帰的に適用されるため、
    /// トークンの最も細かいレベルで1回呼べば全レベルが更新されます。
    /// `is_transition` が`false`の場合、次数を下げた状態すべてにも同じ更新を適用します。
    pub fn update_weights<M>(
        &mut self,
        model: &M,
        lattice: &StateLattice,
        state: StateId,
        value: f64,
        is_transition: bool,
    ) where
        M: MorphModel + ?Sized,
    {
        let value = value / self.scale_factor;

        self.update(model, lattice, state, value);
        if !is_transition {
            let mut run = lattice.sub_order(state);
            while let Some(id) = run {
                self.update(model, lattice, id, value);
                run = lattice.sub_order(id);
            }
        }
    }

    fn update<M>(&mut self, model: &M, lattice: &StateLattice, state: StateId, value: f64)
    where
        M: MorphModel + ?Sized,
    {
        let Some(vector) = lattice.vector(state) else {
            return;
        };
        let order = lattice.order(state);

        let mut run = Some(lattice.zero_order(state));
        while let Some(id) = run {
            let tag = self.universal_index(lattice, id);
            for &feature in vector.iter() {
                let slot = self.slot(feature, tag);
                self.update_weight(slot, value);
            }
            self.update_sub_tags(model, lattice, id, vector, value);

            if order == 1 {
                run = None;
                if let Some(sub_state) = lattice.sub_level(state) {
                    self.update(model, lattice, sub_state, value);
                }
                if vector.is_state() {
                    let slot = self.observed_slot(model, lattice, vector.word_index(), state);
                    self.update_weight(slot, value);
                }
            } else {
                run = lattice.sub_level(id);
            }
        }
    }

    fn update_sub_tags<M>(
        &mut self,
        model: &M,
        lattice: &StateLattice,
        state: StateId,
        vector: &FeatureVector,
        value: f64,
    ) where
        M: MorphModel + ?Sized,
    {
        let level = usize::from_u32(lattice.level(state));
        let Some(sub_tags) = model.sub_tags(level, lattice.index(state)) else {
            return;
        };
        for &sub_tag in sub_tags {
            let tag = self.layout.sub_tag_index(sub_tag);
            for &feature in vector.iter() {
                let slot = self.slot(feature, tag);
                self.update_weight(slot, value);
            }
        }
    }

    #[inline]
    fn update_weight(&mut self, slot: usize, value: f64) {
        self.weights[slot] += value;
        if let Some(penalty) = self.penalty.as_mut() {
            self.weights[slot] = penalty.apply(slot, self.weights[slot]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::lattice::State;
    use crate::test_utils::TestModel;

    fn single_level(size: usize) -> (TestModel, MorphWeightVector) {
        let model = TestModel::new(&[size]);
        let weights =
            MorphWeightVector::init(MorphOptions::new().initial_vector_size(1000), &model, None)
                .unwrap();
        (model, weights)
    }

    #[test]
    fn test_hash_slot_in_range() {
        for capacity in [1, 2, 1024, 1 << 20] {
            for feature in [0, 1, 7, 12345, u32::MAX] {
                for tag in [0, 3, 1000] {
                    assert!(hash_slot(feature, 17, tag, capacity) < capacity);
                }
            }
        }
    }

    #[test]
    fn test_hash_slot_values() {
        assert_eq!(0, hash_slot(0, 10, 0, 1024));
        // raw = 1 * 10 + 3 = 13; 13 ^ (13 >> 7) ^ (13 >> 4) = 13
        assert_eq!(13, hash_slot(1, 10, 3, 1024));
        // raw = 4096; h ^= (h >> 12) -> 4097; h ^= (h >> 7) ^ (h >> 4) -> 4097 ^ 32 ^ 256 = 4385
        assert_eq!(4385 & 1023, hash_slot(0, 10, 4096, 1024));
    }

    #[test]
    fn test_init_sizes_table() {
        let (_, weights) = single_level(4);
        assert_eq!(1024 + 2, weights.weights().len());
        assert_eq!(1024, weights.capacity);
        assert_eq!(1.0, weights.scale_factor());
        assert_eq!(Growth::Insert, weights.growth());
        assert!(weights.accumulated_penalty().is_none());
    }

    #[test]
    fn test_set_weights() {
        let (_, mut weights) = single_level(4);
        weights.set_weights(vec![0.0; 100 + 2]).unwrap();
        assert_eq!(64, weights.capacity);
        assert!(matches!(
            weights.set_weights(vec![0.0; 2]),
            Err(MorphError::InvalidArgument(_))
        ));
        assert_eq!(102, weights.weights().len());
    }

    #[test]
    fn test_set_weights_reallocates_penalty() {
        let (_, mut weights) = single_level(4);
        weights.set_penalty(Some(0.1));
        weights.set_weights(vec![0.0; 66]).unwrap();
        assert_eq!(66, weights.accumulated_penalty().unwrap().len());
    }

    #[test]
    fn test_penalty_shrinks_towards_zero() {
        let mut penalty = Penalty::new(0.1, 1);
        let w = penalty.apply(0, 1.0);
        assert!((w - 0.9).abs() < 1e-12);
        assert!((penalty.accumulated[0] + 0.1).abs() < 1e-12);

        let w = penalty.apply(0, -0.05);
        // -0.05 + (0.1 - (-0.1)) clipped at 0
        assert_eq!(0.0, w);
        assert!((penalty.accumulated[0] + 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_penalty_dead_zone() {
        let mut penalty = Penalty::new(0.5, 1);
        assert_eq!(5e-11, penalty.apply(0, 5e-11));
        assert_eq!(-5e-11, penalty.apply(0, -5e-11));
        assert_eq!(0.0, penalty.accumulated[0]);
    }

    #[test]
    fn test_penalty_never_crosses_zero() {
        let mut penalty = Penalty::new(0.3, 1);
        let mut w = 0.0;
        for step in 1..=10 {
            w = penalty.apply(0, w + 0.2);
            assert!(w >= 0.0);
            assert!(-penalty.accumulated[0] <= f64::from(step) * 0.3 + 1e-12);
        }
    }

    #[test]
    fn test_set_penalty_keeps_accumulated() {
        let (_, mut weights) = single_level(2);
        weights.set_penalty(Some(0.1));
        weights.penalty.as_mut().unwrap().accumulated[3] = -0.25;
        weights.set_penalty(Some(0.2));
        assert_eq!(-0.25, weights.accumulated_penalty().unwrap()[3]);
        weights.set_penalty(None);
        assert!(weights.accumulated_penalty().is_none());
        weights.set_penalty(Some(0.2));
        assert_eq!(0.0, weights.accumulated_penalty().unwrap()[3]);
    }

    #[test]
    fn test_scale_by() {
        let (_, mut weights) = single_level(2);
        weights.set_penalty(Some(0.1));
        weights.scale_by(0.5);
        assert_eq!(0.5, weights.scale_factor());
        assert!((weights.penalty.as_ref().unwrap().linear - 0.2).abs() < 1e-12);
        weights.set_penalty(Some(0.1));
        assert!((weights.penalty.as_ref().unwrap().linear - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_product_index() {
        let model = TestModel::new(&[3, 5, 7]);
        let weights =
            MorphWeightVector::init(MorphOptions::new().initial_vector_size(64), &model, None)
                .unwrap();
        let mut lattice = StateLattice::new();
        let l0 = lattice.push(State::new(0, 2, 1));
        let l1 = lattice.push(State::new(1, 4, 1).with_sub_level(l0));
        let l2 = lattice.push(State::new(2, 6, 1).with_sub_level(l1));
        assert_eq!(2, weights.product_index(&lattice, l0));
        assert_eq!(2 * 5 + 4, weights.product_index(&lattice, l1));
        assert_eq!((2 * 5 + 4) * 7 + 6, weights.product_index(&lattice, l2));
    }

    #[test]
    fn test_product_index_wraps_on_wide_hierarchy() {
        const N: usize = 1 << 22;
        let model = TestModel::new(&[N, N, N, N]);
        let weights =
            MorphWeightVector::init(MorphOptions::new().initial_vector_size(64), &model, None)
                .unwrap();
        let top = (N - 1) as u32;
        let mut lattice = StateLattice::new();
        let l0 = lattice.push(State::new(0, top, 1));
        let l1 = lattice.push(State::new(1, top, 1).with_sub_level(l0));
        let l2 = lattice.push(State::new(2, top, 1).with_sub_level(l1));
        let l3 = lattice.push(
            State::new(3, top, 1)
                .with_sub_level(l2)
                .with_vector(FeatureVector::state(Some(0))),
        );

        // (N^4 - 1) mod 2^64, as N^4 = 2^88.
        assert_eq!(u64::MAX, weights.product_index(&lattice, l3));
        let vector = FeatureVector::state(Some(0));
        assert_eq!(0.0, weights.score(&model, &lattice, l3, &vector));
    }

    #[test]
    fn test_observed_slot() {
        let model = TestModel::new(&[3, 5]).observe(Some(1), 1, 2 * 5 + 4);
        let weights =
            MorphWeightVector::init(MorphOptions::new().initial_vector_size(64), &model, None)
                .unwrap();
        let mut lattice = StateLattice::new();
        let l0 = lattice.push(State::new(0, 2, 1));
        let l1 = lattice.push(State::new(1, 4, 1).with_sub_level(l0));
        assert_eq!(64 + 2, weights.observed_slot(&model, &lattice, Some(1), l1));
        assert_eq!(64 + 3, weights.observed_slot(&model, &lattice, Some(2), l1));
        assert_eq!(64 + 1, weights.observed_slot(&model, &lattice, Some(1), l0));
    }
}
