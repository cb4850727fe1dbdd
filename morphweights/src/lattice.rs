//! タグ状態のアリーナ
//!
//! 探索器が生成する候補タグ割り当てを、整数ハンドルで参照される状態の列として保持します。
//! 状態間のリンク(下位レベル、0次縮約、次数縮約、n-gram連鎖の前の状態)はすべて
//! ハンドルで表され、ナビゲーションはアリーナとハンドルに対する純粋な関数です。

use crate::feature::FeatureVector;
use crate::utils::FromU32;

/// アリーナ内の状態を指すハンドル
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    /// ハンドルの番号を返します。
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// 1つのタグ状態
#[derive(Clone, Debug)]
pub struct State {
    level: u32,
    index: u32,
    order: u32,
    sub_level: Option<StateId>,
    zero_order: Option<StateId>,
    sub_order: Option<StateId>,
    previous_sub_order: Option<StateId>,
    vector: Option<FeatureVector>,
}

impl State {
    /// 新しい状態を作成します。
    ///
    /// # 引数
    ///
    /// * `level` - タグ階層のレベル
    /// * `index` - レベル内のタグ番号
    /// * `order` - マルコフ次数
    pub fn new(level: u32, index: u32, order: u32) -> Self {
        Self {
            level,
            index,
            order,
            sub_level: None,
            zero_order: None,
            sub_order: None,
            previous_sub_order: None,
            vector: None,
        }
    }

    /// 同じトークンの1つ下のレベル(`level - 1`)の状態を設定します。
    pub fn with_sub_level(mut self, id: StateId) -> Self {
        self.sub_level = Some(id);
        self
    }

    /// 0次縮約を設定します。設定しない場合は自分自身が0次縮約になります。
    pub fn with_zero_order(mut self, id: StateId) -> Self {
        self.zero_order = Some(id);
        self
    }

    /// 次数を1つ下げた状態を設定します。
    pub fn with_sub_order(mut self, id: StateId) -> Self {
        self.sub_order = Some(id);
        self
    }

    /// n-gram連鎖の前の状態を設定します。
    pub fn with_previous_sub_order(mut self, id: StateId) -> Self {
        self.previous_sub_order = Some(id);
        self
    }

    /// 素性ベクトルを設定します。
    pub fn with_vector(mut self, vector: FeatureVector) -> Self {
        self.vector = Some(vector);
        self
    }
}

/// タグ状態のアリーナ
#[derive(Default, Debug)]
pub struct StateLattice {
    states: Vec<State>,
}

impl StateLattice {
    /// 空のアリーナを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 状態を追加し、そのハンドルを返します。
    ///
    /// # パニック
    ///
    /// リンク先がまだ追加されていない場合、または下位レベルの状態が
    /// ちょうど1つ下のレベルでない場合にパニックします。
    pub fn push(&mut self, state: State) -> StateId {
        let id = StateId(u32::try_from(self.states.len()).unwrap());
        for link in [
            state.sub_level,
            state.zero_order,
            state.sub_order,
            state.previous_sub_order,
        ]
        .into_iter()
        .flatten()
        {
            assert!(link < id, "link to a state that is not pushed yet");
        }
        match state.sub_level {
            Some(sub) => assert_eq!(
                self.level(sub) + 1,
                state.level,
                "sub-level state must be one level below"
            ),
            None => assert_eq!(0, state.level, "state above level 0 needs a sub-level"),
        }
        self.states.push(state);
        id
    }

    /// 状態数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// アリーナが空かどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// すべての状態を削除します。
    pub fn clear(&mut self) {
        self.states.clear();
    }

    #[inline(always)]
    fn get(&self, id: StateId) -> &State {
        &self.states[usize::from_u32(id.0)]
    }

    /// 状態のレベルを返します。
    #[inline(always)]
    pub fn level(&self, id: StateId) -> u32 {
        self.get(id).level
    }

    /// 状態のレベル内タグ番号を返します。
    #[inline(always)]
    pub fn index(&self, id: StateId) -> u32 {
        self.get(id).index
    }

    /// 状態のマルコフ次数を返します。
    #[inline(always)]
    pub fn order(&self, id: StateId) -> u32 {
        self.get(id).order
    }

    /// 同じトークンの1つ下のレベルの状態を返します。
    #[inline(always)]
    pub fn sub_level(&self, id: StateId) -> Option<StateId> {
        self.get(id).sub_level
    }

    /// 履歴を取り除いた0次縮約を返します。
    #[inline(always)]
    pub fn zero_order(&self, id: StateId) -> StateId {
        self.get(id).zero_order.unwrap_or(id)
    }

    /// 次数を1つ下げた状態を返します。
    #[inline(always)]
    pub fn sub_order(&self, id: StateId) -> Option<StateId> {
        self.get(id).sub_order
    }

    /// n-gram連鎖の前の状態を返します。
    #[inline(always)]
    pub fn previous_sub_order(&self, id: StateId) -> Option<StateId> {
        self.get(id).previous_sub_order
    }

    /// `depth` レベル下の状態を返します。
    ///
    /// # パニック
    ///
    /// `depth` が状態のレベルを超える場合にパニックします。
    pub fn sub_level_at(&self, id: StateId, depth: u32) -> StateId {
        assert!(depth <= self.level(id));
        let mut run = id;
        for _ in 0..depth {
            // `push` guarantees a sub-level for every state above level 0.
            run = self.get(run).sub_level.unwrap();
        }
        run
    }

    /// キャッシュされた素性ベクトルを返します。
    #[inline(always)]
    pub fn vector(&self, id: StateId) -> Option<&FeatureVector> {
        self.get(id).vector.as_ref()
    }

    /// 素性ベクトルをキャッシュします。
    pub fn set_vector(&mut self, id: StateId, vector: FeatureVector) {
        self.states[usize::from_u32(id.0)].vector = Some(vector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation() {
        let mut lattice = StateLattice::new();
        let pos = lattice.push(State::new(0, 2, 1));
        let morph = lattice.push(State::new(1, 5, 1).with_sub_level(pos));
        let prev = lattice.push(State::new(0, 1, 1));
        let bigram = lattice.push(
            State::new(0, 2, 2)
                .with_zero_order(pos)
                .with_sub_order(pos)
                .with_previous_sub_order(prev),
        );

        assert_eq!(pos, lattice.zero_order(pos));
        assert_eq!(pos, lattice.zero_order(bigram));
        assert_eq!(Some(pos), lattice.sub_level(morph));
        assert_eq!(None, lattice.sub_level(pos));
        assert_eq!(morph, lattice.sub_level_at(morph, 0));
        assert_eq!(pos, lattice.sub_level_at(morph, 1));
        assert_eq!(Some(prev), lattice.previous_sub_order(bigram));
        assert_eq!(Some(pos), lattice.sub_order(bigram));
        assert_eq!(2, lattice.order(bigram));
        assert_eq!(5, lattice.index(morph));
        assert_eq!(4, lattice.len());
    }

    #[test]
    fn test_set_vector() {
        let mut lattice = StateLattice::new();
        let s = lattice.push(State::new(0, 0, 1));
        assert!(lattice.vector(s).is_none());
        lattice.set_vector(s, FeatureVector::state(Some(1)));
        assert_eq!(Some(1), lattice.vector(s).unwrap().word_index());
    }

    #[test]
    #[should_panic(expected = "needs a sub-level")]
    fn test_missing_sub_level() {
        let mut lattice = StateLattice::new();
        lattice.push(State::new(1, 0, 1));
    }

    #[test]
    #[should_panic(expected = "not pushed yet")]
    fn test_forward_link() {
        let mut lattice = StateLattice::new();
        lattice.push(State::new(0, 0, 1).with_sub_order(StateId(3)));
    }
}
