//! 重みベクトルの設定モジュール。

use std::io::{BufRead, BufReader, Read};

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{MorphError, Result};

/// 重みテーブルの既定の初期サイズ
pub const DEFAULT_INITIAL_VECTOR_SIZE: usize = 10_000_000;

/// 重みベクトルの設定。
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct MorphOptions {
    pub(crate) shape: bool,
    pub(crate) max_transition_feature_level: Option<u32>,
    pub(crate) initial_vector_size: usize,
}

impl Default for MorphOptions {
    fn default() -> Self {
        Self {
            shape: false,
            max_transition_feature_level: None,
            initial_vector_size: DEFAULT_INITIAL_VECTOR_SIZE,
        }
    }
}

impl MorphOptions {
    /// 既定の設定を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 語形状素性を有効にするかを変更します。
    ///
    /// デフォルト値は `false` です。
    pub const fn shape(mut self, shape: bool) -> Self {
        self.shape = shape;
        self
    }

    /// 遷移素性を作るレベルの上限を変更します。
    ///
    /// `None` の場合は全レベルで遷移素性を作ります。デフォルト値は `None` です。
    pub const fn max_transition_feature_level(mut self, level: Option<u32>) -> Self {
        self.max_transition_feature_level = level;
        self
    }

    /// 重みテーブルの初期サイズを変更します。
    ///
    /// 実際のサイズはこの値以上の最小の2のべき乗に丸められます。
    ///
    /// # パニック
    ///
    /// 値が1未満の場合、パニックします。
    pub fn initial_vector_size(mut self, size: usize) -> Self {
        assert!(size >= 1);
        self.initial_vector_size = size;
        self
    }

    /// 語形状素性が有効かどうかを返します。
    pub fn is_shape_enabled(&self) -> bool {
        self.shape
    }

    fn parse_option_line(line: &str) -> Result<(&str, &str)> {
        let mut spl = line.splitn(2, '=');
        let key = spl.next().map(str::trim);
        let value = spl.next().map(str::trim);
        match (key, value) {
            (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => Ok((key, value)),
            _ => Err(MorphError::invalid_format(
                "options",
                format!("expected `key = value`: {line}"),
            )),
        }
    }

    /// リーダーから設定を読み込みます。
    ///
    /// 各行は `key = value` の形式です。空行と `#` で始まる行は無視されます。
    /// 指定されなかった項目は既定値のままです。
    ///
    /// | キー | 値 |
    /// |---|---|
    /// | `shape` | `true` / `false` |
    /// | `max-transition-feature-level` | 整数。負の値は上限なし |
    /// | `initial-vector-size` | 1以上の整数 |
    ///
    /// # エラー
    ///
    /// 行の形式や値が不正な場合、未知のキーがある場合に [`MorphError`] が返されます。
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let reader = BufReader::new(rdr);
        let mut options = Self::default();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = Self::parse_option_line(line)?;
            match key {
                "shape" => options.shape = value.parse()?,
                "max-transition-feature-level" => {
                    let level: i64 = value.parse()?;
                    options.max_transition_feature_level = if level < 0 {
                        None
                    } else {
                        Some(u32::try_from(level)?)
                    };
                }
                "initial-vector-size" => {
                    let size: usize = value.parse()?;
                    if size == 0 {
                        return Err(MorphError::invalid_argument(
                            "initial-vector-size",
                            "must be at least 1",
                        ));
                    }
                    options.initial_vector_size = size;
                }
                _ => {
                    return Err(MorphError::invalid_format(
                        "options",
                        format!("unknown option: {key}"),
                    ));
                }
            }
        }

        Ok(options)
    }
}
