//! # Error モジュール
//!
//! シミュレーション全体で使用するエラー型を定義します。
//!
//! 距離ゼロなどの退化した幾何は経路損失モデル内でクランプされるため、
//! ここには現れません。ここに並ぶのは呼び出し側の契約違反と入出力エラーのみです。

use crate::scenario::ScenarioError;
use thiserror::Error;

/// シミュレーションエラー
#[derive(Debug, Error)]
pub enum SimError {
    /// 送信点・受信点・素子配列の組み合わせが不正
    #[error("不正なチャネル要求: {0}")]
    InvalidChannelRequest(String),

    /// チャネルベクトル長の不一致
    #[error("ベクトル長が一致しません: 期待値 {expected}, 実際 {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// 幾何設定の不正（素子数が平方数でない、グリッドが空など）
    #[error("不正な幾何設定: {0}")]
    InvalidGeometry(String),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("入出力エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("レポート出力エラー: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// 2つのベクトル長が一致することを確認
pub(crate) fn ensure_same_len(expected: usize, actual: usize) -> SimResult<()> {
    if expected != actual {
        return Err(SimError::ShapeMismatch { expected, actual });
    }
    Ok(())
}
