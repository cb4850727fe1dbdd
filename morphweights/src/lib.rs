//! # morphweights
//!
//! 階層的な形態素タグ付けのための、素性ハッシュによる重みベクトルの実装です。
//!
//! ## 概要
//!
//! 品詞などの粗いタグと、それを細分化する形態素タグからなるタグ階層に対して、
//! 素性抽出・スコア計算・オンライン学習のための重み更新を提供します。
//! 探索(ビタビ/ビームサーチ)や学習ループは本クレートの外側にあり、
//! ここで提供する基本操作を呼び出します。
//!
//! ## 主な機能
//!
//! - **ビット詰め素性キー**: 小さな整数フィールドを1つのキーに詰め込むエンコーダ
//! - **素性ハッシュ**: (素性, タグ) の組を固定長テーブルに写像し、メモリ量を一定に保つ
//! - **サブタグによるバックオフ**: 細かいタグと共有サブタグの重みを同時に使う
//! - **累積L1正則化**: 触れたスロットだけに遅延適用されるL1ペナルティ
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use morphweights::lattice::{State, StateLattice};
//! use morphweights::model::{MorphModel, Word};
//! use morphweights::{MorphOptions, MorphWeightVector};
//!
//! struct PosModel;
//!
//! impl MorphModel for PosModel {
//!     fn order(&self) -> u32 { 1 }
//!     fn num_levels(&self) -> usize { 1 }
//!     fn num_tags(&self, _level: usize) -> usize { 3 }
//!     fn num_sub_tags(&self) -> usize { 0 }
//!     fn sub_tags(&self, _level: usize, _tag: u32) -> Option<&[u32]> { None }
//!     fn is_rare(&self, word: Option<u32>) -> bool { word.is_none() }
//!     fn has_been_observed(&self, _: Option<u32>, _: u32, _: u64) -> bool { false }
//!     fn num_words(&self) -> usize { 2 }
//!     fn num_chars(&self) -> usize { 26 }
//!     fn num_shapes(&self) -> usize { 0 }
//!     fn num_token_features(&self) -> usize { 0 }
//! }
//!
//! let model = PosModel;
//! let options = MorphOptions::new().initial_vector_size(1 << 12);
//! let mut weights = MorphWeightVector::init(options, &model, None)?;
//!
//! let sentence = [
//!     Word::new("the", Some(0), vec![Some(19), Some(7), Some(4)]),
//!     Word::new("cat", Some(1), vec![Some(2), Some(0), Some(19)]),
//! ];
//! let vector = weights.extract_state_features(&model, &sentence, 1);
//!
//! let mut lattice = StateLattice::new();
//! let noun = lattice.push(State::new(0, 1, 1).with_vector(vector.clone()));
//!
//! assert_eq!(0.0, weights.score(&model, &lattice, noun, &vector));
//! weights.update_weights(&model, &lattice, noun, 1.0, false);
//! assert!(weights.score(&model, &lattice, noun, &vector) > 0.0);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// ビット詰めエンコーダ
pub mod encoder;

/// エラー型の定義
pub mod errors;

/// 素性キーと素性ベクトル
pub mod feature;

/// タグ状態のアリーナ
pub mod lattice;

/// タグ階層の大きさとビット幅
pub mod layout;

/// 外部コンポーネントのインターフェース
pub mod model;

/// 設定
pub mod options;

/// 素性テーブル
pub mod symbol_table;

/// 内部ユーティリティ関数
pub mod utils;

/// ハッシュ化重みベクトル
pub mod weights;

#[cfg(test)]
mod test_utils;

// Re-exports
pub use feature::FeatureVector;
pub use options::MorphOptions;
pub use symbol_table::{FeatureTable, Growth, SymbolTable};
pub use weights::MorphWeightVector;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
