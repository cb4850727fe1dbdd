//! 素性テーブル
//!
//! 素性キーを密な素性IDに正規化します。
//! 学習時は新しいキーに新しいIDを割り当て、評価時は既存のIDを検索するだけにします。

use hashbrown::HashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::feature::FeatureKey;

/// 未知のキーに対する振る舞い
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Hash)]
pub enum Growth {
    /// 未知のキーに新しいIDを割り当てます(学習時)。
    #[default]
    Insert,
    /// 既存のIDを検索するだけで、未知のキーは`None`になります(評価時)。
    LookupOnly,
}

/// 素性キーを素性IDに解決するテーブル
///
/// 同じモデルの生存期間中、等しいキーは常に等しいIDに解決されなければなりません。
pub trait FeatureTable {
    /// キーを解決します。
    ///
    /// # 引数
    ///
    /// * `key` - 素性キー
    /// * `growth` - 未知のキーに対する振る舞い
    ///
    /// # 戻り値
    ///
    /// 素性ID。未知のキーで`growth`が[`Growth::LookupOnly`]の場合は`None`。
    fn to_index(&mut self, key: &FeatureKey, growth: Growth) -> Option<u32>;

    /// 登録済みのキー数を返します。
    fn len(&self) -> usize;

    /// テーブルが空かどうかを返します。
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// ハッシュマップによる素性テーブルの実装
///
/// IDは初めて見たキーから順に0, 1, 2, ... と割り当てられます。
#[derive(Default, Debug, Archive, Serialize, Deserialize)]
pub struct SymbolTable {
    ids: HashMap<FeatureKey, u32>,
}

impl SymbolTable {
    /// 空のテーブルを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録済みのキーのIDを返します。
    pub fn get(&self, key: &FeatureKey) -> Option<u32> {
        self.ids.get(key).copied()
    }
}

impl FeatureTable for SymbolTable {
    fn to_index(&mut self, key: &FeatureKey, growth: Growth) -> Option<u32> {
        if let Some(&id) = self.ids.get(key) {
            return Some(id);
        }
        match growth {
            Growth::LookupOnly => None,
            Growth::Insert => {
                let id = u32::try_from(self.ids.len()).ok()?;
                self.ids.insert(key.clone(), id);
                Some(id)
            }
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
